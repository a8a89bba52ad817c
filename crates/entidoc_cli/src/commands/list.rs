//! List command implementation.

use entidoc_core::Catalog;
use serde::Serialize;

use super::{store_for, CommandResult};

/// One listed entity.
#[derive(Debug, Serialize)]
pub struct ListEntry {
    /// Entity id.
    pub id: u64,
    /// Names of the entity's direct fields.
    pub fields: Vec<String>,
}

/// Collects the entities of a kind in document order.
pub fn entries(catalog: &Catalog, kind: &str) -> CommandResult<Vec<ListEntry>> {
    let store = store_for(catalog, kind)?;
    let mut out = Vec::new();
    for id in store.list_ids()? {
        out.push(ListEntry {
            id: id.as_u64(),
            fields: store.field_names(id)?,
        });
    }
    Ok(out)
}

/// Runs the list command.
pub fn run(catalog: &Catalog, kind: &str, format: &str) -> CommandResult<()> {
    let entries = entries(catalog, kind)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            for entry in &entries {
                println!("{}", entry.id);
            }
        }
    }
    Ok(())
}
