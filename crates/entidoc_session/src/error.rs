//! Error types for document sessions.

use std::io;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while opening, querying or mutating a document.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named document does not exist in the store.
    #[error("document not found: {name}")]
    DocumentNotFound {
        /// The requested document name.
        name: String,
    },

    /// A document with this name already exists.
    #[error("document already exists: {name}")]
    DocumentExists {
        /// The conflicting document name.
        name: String,
    },

    /// The document name cannot be used by this store.
    #[error("invalid document name: {name}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Stored or supplied document content is not well-formed markup.
    #[error("malformed document {name}: {message}")]
    MalformedDocument {
        /// The document name.
        name: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A path expression could not be parsed or evaluated.
    #[error("invalid path expression `{expr}`: {message}")]
    Query {
        /// The offending expression.
        expr: String,
        /// What went wrong.
        message: String,
    },

    /// An update fragment was rejected.
    #[error("update fragment rejected: {message}")]
    Fragment {
        /// What went wrong.
        message: String,
    },

    /// The session was used after `close`.
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// Creates a path expression error.
    pub fn query(expr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            expr: expr.into(),
            message: message.into(),
        }
    }

    /// Creates an update fragment error.
    pub fn fragment(message: impl Into<String>) -> Self {
        Self::Fragment {
            message: message.into(),
        }
    }

    /// Creates a malformed document error.
    pub fn malformed_document(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            name: name.into(),
            message: message.into(),
        }
    }
}
