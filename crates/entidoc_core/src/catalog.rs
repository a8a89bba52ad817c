//! Document bootstrap and entity-store access.

use std::path::Path;
use std::sync::Arc;

use entidoc_session::{DocumentStore, FileStore, InMemoryStore};
use tracing::{debug, info};

use crate::config::Config;
use crate::entity::{with_document, EntityStore};
use crate::error::{CoreError, CoreResult};
use crate::path::check_name;
use crate::schema::EntitySchema;

/// A set of entity documents sharing one [`Config`].
///
/// The catalog creates documents with the wrapper/entities-root shape and
/// hands out [`EntityStore`]s after checking that shape.
///
/// ```rust
/// use entidoc_core::{Catalog, EntitySchema};
///
/// let catalog = Catalog::in_memory();
/// catalog.bootstrap(&EntitySchema::tags()).unwrap();
///
/// let tags = catalog.entities(EntitySchema::tags()).unwrap();
/// let id = tags.create("tag", &[("xpath", "//title")]).unwrap();
/// assert_eq!(tags.get_field(id, "xpath").unwrap().as_deref(), Some("//title"));
/// ```
#[derive(Clone)]
pub struct Catalog {
    documents: Arc<dyn DocumentStore>,
    config: Config,
}

impl Catalog {
    /// Creates a catalog over an existing document store.
    pub fn new(documents: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self { documents, config }
    }

    /// Creates an empty in-memory catalog with the default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), Config::default())
    }

    /// Opens a catalog backed by one file per document in `dir`, creating
    /// the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the directory cannot be created or
    /// an existing document cannot be read.
    pub fn open_dir(dir: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let store = FileStore::open_with_create_dirs(dir.as_ref())?;
        Ok(Self::new(Arc::new(store), config))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying document store.
    #[must_use]
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// Creates the empty document for `schema`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentExists` if the document is already present and
    /// `InvalidName` for an invalid entities-root name.
    pub fn bootstrap(&self, schema: &EntitySchema) -> CoreResult<()> {
        check_name(&schema.entities_root)?;
        let markup = schema.bootstrap_markup(&self.config.root_element);
        self.documents.create(&schema.document, &markup)?;
        info!(document = %schema.document, root = %schema.entities_root, "bootstrapped document");
        Ok(())
    }

    /// Creates every preset document that does not exist yet and returns
    /// the names of those created.
    pub fn bootstrap_standard(&self) -> CoreResult<Vec<String>> {
        let mut created = Vec::new();
        for schema in EntitySchema::standard() {
            if self.documents.contains(&schema.document) {
                debug!(document = %schema.document, "document already present");
                continue;
            }
            self.bootstrap(&schema)?;
            created.push(schema.document);
        }
        Ok(created)
    }

    /// Opens the entity store for `schema`.
    ///
    /// A missing document is bootstrapped when `create_missing` is set.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` for a missing document and
    /// `MalformedDocument` if the shape check fails.
    pub fn entities(&self, schema: EntitySchema) -> CoreResult<EntityStore> {
        if !self.documents.contains(&schema.document) {
            if !self.config.create_missing {
                return Err(CoreError::DocumentNotFound {
                    name: schema.document,
                });
            }
            self.bootstrap(&schema)?;
        }
        if self.config.verify_shape {
            self.verify(&schema)?;
        }
        Ok(EntityStore::new(
            Arc::clone(&self.documents),
            schema,
            &self.config,
        ))
    }

    /// Checks that the document element is the configured wrapper and that
    /// it has exactly one child, named after the schema's entities root.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` describing the first mismatch.
    pub fn verify(&self, schema: &EntitySchema) -> CoreResult<()> {
        let wrapper = &self.config.root_element;
        with_document(self.documents.as_ref(), &schema.document, |session| {
            let roots = session.query("/*/name()")?;
            if roots != [wrapper.as_str()] {
                return Err(CoreError::malformed_document(
                    schema.document.as_str(),
                    format!("expected wrapper <{wrapper}>, found {roots:?}"),
                ));
            }

            let children = session.query(&format!("/{wrapper}/*/name()"))?;
            if children != [schema.entities_root.as_str()] {
                return Err(CoreError::malformed_document(
                    schema.document.as_str(),
                    format!(
                        "expected a single <{}> under <{wrapper}>, found {children:?}",
                        schema.entities_root
                    ),
                ));
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("documents", &self.documents.names())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document() {
        let catalog = Catalog::in_memory();
        let err = catalog.entities(EntitySchema::users()).unwrap_err();
        assert!(matches!(err, CoreError::DocumentNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn create_missing_bootstraps() {
        let catalog = Catalog::new(
            Arc::new(InMemoryStore::new()),
            Config::default().create_missing(true),
        );
        let users = catalog.entities(EntitySchema::users()).unwrap();
        assert_eq!(users.count().unwrap(), 0);
        assert!(catalog.documents().contains("DMSUsers.xml"));
    }

    #[test]
    fn bootstrap_twice_fails() {
        let catalog = Catalog::in_memory();
        catalog.bootstrap(&EntitySchema::groups()).unwrap();
        let err = catalog.bootstrap(&EntitySchema::groups()).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn bootstrap_standard_skips_existing() {
        let catalog = Catalog::in_memory();
        catalog.bootstrap(&EntitySchema::tags()).unwrap();
        let created = catalog.bootstrap_standard().unwrap();
        assert_eq!(created.len(), 5);
        assert!(!created.contains(&"DMSTags.xml".to_string()));
        assert!(catalog.bootstrap_standard().unwrap().is_empty());
    }

    #[test]
    fn shape_check_rejects_wrong_entities_root() {
        let catalog = Catalog::in_memory();
        catalog
            .documents()
            .create("DMSUsers.xml", "<DMS><groups/></DMS>")
            .unwrap();
        assert!(matches!(
            catalog.entities(EntitySchema::users()),
            Err(CoreError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn shape_check_rejects_extra_children_and_wrong_wrapper() {
        let catalog = Catalog::in_memory();
        let docs = catalog.documents();
        docs.create("DMSUsers.xml", "<DMS><users/><users/></DMS>")
            .unwrap();
        docs.create("DMSTags.xml", "<Other><tags/></Other>").unwrap();
        assert!(catalog.entities(EntitySchema::users()).is_err());
        assert!(catalog.entities(EntitySchema::tags()).is_err());
    }

    #[test]
    fn shape_check_can_be_disabled() {
        let catalog = Catalog::new(
            Arc::new(InMemoryStore::new()),
            Config::default().verify_shape(false),
        );
        catalog
            .documents()
            .create("DMSTags.xml", "<DMS><tags/><extra/></DMS>")
            .unwrap();
        assert!(catalog.entities(EntitySchema::tags()).is_ok());
    }
}
