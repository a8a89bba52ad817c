//! Session and store traits.

use crate::error::SessionResult;

/// An open handle on one named document.
///
/// A session answers path-expression queries and applies update fragments.
/// Every read is evaluated against the current document; nothing is cached
/// on the session side.
///
/// # Invariants
///
/// - `query` returns results in document order; an empty vector means
///   "no match", which differs from a single empty string
/// - `mutate` applies a fragment as a whole or not at all
/// - `mutate` returning 0 means the fragment matched nothing; it is not an error
/// - after `close`, every method except `close` fails with `SessionError::Closed`
///
/// # Implementors
///
/// Sessions are handed out by [`DocumentStore::open`].
pub trait DocumentSession: Send {
    /// Returns the name of the document this session is bound to.
    fn document(&self) -> &str;

    /// Evaluates a path expression and returns the rendered results.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is invalid or the session is closed.
    fn query(&self, expr: &str) -> SessionResult<Vec<String>>;

    /// Applies an update fragment and returns the number of modified nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is rejected, the document cannot be
    /// persisted, or the session is closed.
    fn mutate(&mut self, fragment: &str) -> SessionResult<u64>;

    /// Returns true if `expr` selects at least one result.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentSession::query`].
    fn exists(&self, expr: &str) -> SessionResult<bool> {
        Ok(!self.query(expr)?.is_empty())
    }

    /// Returns the full document serialised as markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed.
    fn content(&self) -> SessionResult<String>;

    /// Releases the session.
    ///
    /// Closing twice is allowed and does nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns an error if pending state cannot be released.
    fn close(&mut self) -> SessionResult<()>;
}

/// A collection of named documents.
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For tests and ephemeral use
/// - [`super::FileStore`] - One file per document in a directory
pub trait DocumentStore: Send + Sync {
    /// Opens a session on an existing document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if no document has this name.
    fn open(&self, name: &str) -> SessionResult<Box<dyn DocumentSession>>;

    /// Creates a document from markup.
    ///
    /// # Errors
    ///
    /// Returns `DocumentExists` if the name is taken, `InvalidName` if the
    /// store cannot hold this name, and `MalformedDocument` if `xml` does
    /// not parse.
    fn create(&self, name: &str, xml: &str) -> SessionResult<()>;

    /// Returns true if a document with this name exists.
    fn contains(&self, name: &str) -> bool;

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if no document has this name.
    fn delete(&self, name: &str) -> SessionResult<()>;

    /// Returns all document names, sorted.
    fn names(&self) -> Vec<String>;
}
