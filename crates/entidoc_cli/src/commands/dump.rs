//! Dump command implementation.

use entidoc_core::Catalog;

use super::{store_for, CommandResult};

/// Runs the dump command.
pub fn run(catalog: &Catalog, kind: &str) -> CommandResult<()> {
    let store = store_for(catalog, kind)?;
    let content = store.with_session(|session| Ok(session.content()?))?;
    println!("{content}");
    Ok(())
}
