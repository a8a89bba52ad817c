//! Identifier allocation.

use entidoc_session::DocumentSession;
use tracing::debug;

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};

/// Returns the next free id for the entities whose id attribute is
/// selected by `id_selector`.
///
/// Every existing id is read and the largest one wins; an empty collection
/// yields 1, otherwise `floor(max) + 1`. The maximum is taken over integers
/// so ids beyond the exact range of `f64` are still compared exactly. Ids
/// freed by removals are not reused while a larger id exists, and gaps are
/// never filled.
///
/// The query and the append that consumes the id are separate round trips
/// with no lock held in between. Two concurrent allocations on the same
/// document can return the same id; callers needing strict uniqueness
/// must serialize creation per document.
///
/// # Errors
///
/// Returns `InvalidIdentifier` if an existing id is not a non-negative
/// number or if the largest id leaves no successor, and any backend error
/// from the query.
pub fn next_id(session: &dyn DocumentSession, id_selector: &str) -> CoreResult<EntityId> {
    let mut max: Option<u64> = None;
    for raw in session.query(id_selector)? {
        let value = parse_existing(&raw)?;
        max = Some(max.map_or(value, |m| m.max(value)));
    }

    let Some(max) = max else {
        debug!(document = session.document(), "empty collection, allocating id 1");
        return Ok(EntityId::new(1));
    };

    let next = max
        .checked_add(1)
        .ok_or_else(|| CoreError::invalid_identifier(max.to_string()))?;
    debug!(document = session.document(), next, "allocated id");
    Ok(EntityId::new(next))
}

// Integers parse exactly; anything else goes through f64 and is floored.
fn parse_existing(raw: &str) -> CoreResult<u64> {
    if let Ok(id) = raw.parse::<EntityId>() {
        return Ok(id.as_u64());
    }
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_identifier(raw))?;
    // 2^64 as f64; anything at or above it does not fit.
    if !value.is_finite() || value < 0.0 || value >= 18_446_744_073_709_551_616.0 {
        return Err(CoreError::invalid_identifier(raw));
    }
    Ok(value.floor() as u64)
}
