//! Init command implementation.

use entidoc_core::Catalog;

use super::CommandResult;

/// Runs the init command.
pub fn run(catalog: &Catalog) -> CommandResult<()> {
    let created = catalog.bootstrap_standard()?;
    if created.is_empty() {
        println!("All documents already present");
    }
    for name in created {
        println!("Created {name}");
    }
    Ok(())
}
