//! CLI command implementations.

pub mod create;
pub mod dump;
pub mod field;
pub mod init;
pub mod list;
pub mod remove;

use entidoc_core::{Catalog, Config, EntitySchema, EntityStore};
use std::path::Path;
use tracing::debug;

/// Result type shared by the commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Opens the catalog directory, creating it if needed.
pub fn open_catalog(path: &Path) -> CommandResult<Catalog> {
    debug!(path = %path.display(), "opening catalog");
    Ok(Catalog::open_dir(path, Config::default())?)
}

/// Resolves a kind name to its schema preset.
pub fn schema_for(kind: &str) -> CommandResult<EntitySchema> {
    EntitySchema::preset(kind).ok_or_else(|| {
        let known: Vec<String> = EntitySchema::standard()
            .into_iter()
            .map(|s| s.entities_root)
            .collect();
        format!("Unknown kind `{kind}` (expected one of: {})", known.join(", ")).into()
    })
}

/// Opens the entity store for a kind.
pub fn store_for(catalog: &Catalog, kind: &str) -> CommandResult<EntityStore> {
    Ok(catalog.entities(schema_for(kind)?)?)
}

/// Splits a `name=value` argument.
pub fn parse_pair(arg: &str) -> CommandResult<(&str, &str)> {
    arg.split_once('=')
        .ok_or_else(|| format!("Expected name=value, got `{arg}`").into())
}
