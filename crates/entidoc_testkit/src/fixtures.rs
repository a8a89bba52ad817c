//! Test fixtures and catalog helpers.
//!
//! Provides convenience functions for setting up test catalogs
//! and common test scenarios.

use std::path::Path;

use entidoc_core::{Catalog, Config, EntitySchema, EntityStore};
use tempfile::TempDir;

/// A test catalog with automatic cleanup.
pub struct TestCatalog {
    /// The catalog instance.
    pub catalog: Catalog,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestCatalog {
    /// Creates an in-memory catalog with every preset document bootstrapped.
    pub fn memory() -> Self {
        let catalog = Catalog::in_memory();
        catalog
            .bootstrap_standard()
            .expect("Failed to bootstrap in-memory catalog");
        Self {
            catalog,
            temp_dir: None,
        }
    }

    /// Creates a file-backed catalog in a temporary directory with every
    /// preset document bootstrapped.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let catalog = Catalog::open_dir(temp_dir.path(), Config::default())
            .expect("Failed to open file catalog");
        catalog
            .bootstrap_standard()
            .expect("Failed to bootstrap file catalog");
        Self {
            catalog,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the catalog directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Opens the entity store for a schema.
    pub fn store(&self, schema: EntitySchema) -> EntityStore {
        self.catalog
            .entities(schema)
            .expect("Failed to open entity store")
    }
}

impl std::ops::Deref for TestCatalog {
    type Target = Catalog;

    fn deref(&self) -> &Self::Target {
        &self.catalog
    }
}

/// Runs a test against a freshly bootstrapped in-memory store.
///
/// # Example
///
/// ```rust
/// use entidoc_core::EntitySchema;
/// use entidoc_testkit::with_memory_store;
///
/// with_memory_store(EntitySchema::users(), |users| {
///     assert_eq!(users.count().unwrap(), 0);
/// });
/// ```
pub fn with_memory_store<F, R>(schema: EntitySchema, f: F) -> R
where
    F: FnOnce(&EntityStore) -> R,
{
    let catalog = Catalog::in_memory();
    catalog
        .bootstrap(&schema)
        .expect("Failed to bootstrap document");
    let store = catalog
        .entities(schema)
        .expect("Failed to open entity store");
    f(&store)
}

/// Runs a test against a store backed by a temporary directory.
///
/// The directory path is passed along so the test can reopen it.
pub fn with_file_store<F, R>(schema: EntitySchema, f: F) -> R
where
    F: FnOnce(&EntityStore, &Path) -> R,
{
    let test_catalog = TestCatalog::file();
    let store = test_catalog.store(schema);
    let path = test_catalog
        .path()
        .expect("File catalog should have a path");
    f(&store, path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use entidoc_core::NewEntity;

    /// Creates a catalog whose users document holds `count` users named
    /// `user0`, `user1`, ...
    pub fn populated_users(count: usize) -> TestCatalog {
        let test_catalog = TestCatalog::memory();
        let users = test_catalog.store(EntitySchema::users());
        for i in 0..count {
            users
                .insert(
                    NewEntity::new("user")
                        .attribute("username", format!("user{i}"))
                        .field("info/email", format!("user{i}@example.com")),
                )
                .expect("Failed to insert user");
        }
        test_catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_catalog() {
        let test_catalog = TestCatalog::memory();
        assert_eq!(test_catalog.documents().names().len(), 6);
        assert!(test_catalog.path().is_none());
    }

    #[test]
    fn test_file_catalog() {
        let test_catalog = TestCatalog::file();
        let dir = test_catalog.path().unwrap();
        assert!(dir.join("DMSUsers.xml").is_file());
    }

    #[test]
    fn test_populated_scenario() {
        let test_catalog = scenarios::populated_users(3);
        let users = test_catalog.store(EntitySchema::users());
        assert_eq!(users.count().unwrap(), 3);
        assert!(users.find_by_attribute("username", "user2").unwrap().is_some());
    }

    #[test]
    fn test_with_file_store() {
        with_file_store(EntitySchema::tags(), |tags, dir| {
            tags.create("tag", &[("xpath", "//a")]).unwrap();
            let on_disk = std::fs::read_to_string(dir.join("DMSTags.xml")).unwrap();
            assert!(on_disk.contains("<xpath>//a</xpath>"));
        });
    }
}
