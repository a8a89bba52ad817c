//! In-memory document store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SessionError, SessionResult};
use crate::session::{DocumentSession, DocumentStore};
use crate::shared::{DocumentCell, SharedSession};
use crate::xml::Document;

/// A document store that keeps every document in memory.
///
/// Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral catalogs that don't need persistence
///
/// # Thread Safety
///
/// The store can be shared across threads. Sessions opened on the same
/// document see each other's mutations immediately.
///
/// # Example
///
/// ```rust
/// use entidoc_session::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.create("DMSUsers.xml", "<DMS><users/></DMS>").unwrap();
/// let session = store.open("DMSUsers.xml").unwrap();
/// assert!(session.exists("/DMS/users").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Arc<DocumentCell>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl DocumentStore for InMemoryStore {
    fn open(&self, name: &str) -> SessionResult<Box<dyn DocumentSession>> {
        let cell = self
            .docs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::DocumentNotFound {
                name: name.to_string(),
            })?;
        Ok(Box::new(SharedSession::new(cell)))
    }

    fn create(&self, name: &str, xml: &str) -> SessionResult<()> {
        if name.is_empty() {
            return Err(SessionError::InvalidName {
                name: name.to_string(),
            });
        }
        let doc = Document::parse(name, xml)?;
        let mut docs = self.docs.write();
        if docs.contains_key(name) {
            return Err(SessionError::DocumentExists {
                name: name.to_string(),
            });
        }
        docs.insert(
            name.to_string(),
            Arc::new(DocumentCell::new(name, doc, None)),
        );
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.docs.read().contains_key(name)
    }

    fn delete(&self, name: &str) -> SessionResult<()> {
        self.docs
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SessionError::DocumentNotFound {
                name: name.to_string(),
            })
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.docs.read().keys().cloned().collect();
        names.sort();
        names
    }
}
