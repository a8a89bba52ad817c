//! Remove command implementation.

use entidoc_core::{Catalog, EntityId};

use super::{store_for, CommandResult};

/// Runs the remove command.
pub fn run(catalog: &Catalog, kind: &str, id: u64) -> CommandResult<()> {
    let store = store_for(catalog, kind)?;
    store.remove(EntityId::new(id))?;
    println!("Removed {id}");
    Ok(())
}
