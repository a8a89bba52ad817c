//! Get and set command implementations.
//!
//! A target starting with `@` addresses an attribute of the entity;
//! anything else is a field path.

use entidoc_core::{Catalog, EntityId, EntityStore};

use super::{store_for, CommandResult};

fn read(store: &EntityStore, id: EntityId, target: &str) -> CommandResult<Option<String>> {
    Ok(match target.strip_prefix('@') {
        Some(name) => store.get_attribute(id, name)?,
        None => store.get_field(id, target)?,
    })
}

fn write(store: &EntityStore, id: EntityId, target: &str, value: &str) -> CommandResult<()> {
    match target.strip_prefix('@') {
        Some(name) => store.set_attribute(id, name, value)?,
        None => store.set_field(id, target, value)?,
    }
    Ok(())
}

/// Runs the get command.
pub fn get(catalog: &Catalog, kind: &str, id: u64, target: &str) -> CommandResult<()> {
    let store = store_for(catalog, kind)?;
    let id = EntityId::new(id);
    match read(&store, id, target)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(format!("No `{target}` on entity {id} in {}", store.document()).into()),
    }
}

/// Runs the set command.
pub fn set(catalog: &Catalog, kind: &str, id: u64, target: &str, value: &str) -> CommandResult<()> {
    let store = store_for(catalog, kind)?;
    write(&store, EntityId::new(id), target, value)
}
