//! Error types for entidoc core.

use entidoc_session::SessionError;
use thiserror::Error;

use crate::entity::EntityId;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in entity operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No entity with this id exists.
    #[error("entity {id} not found in {document}")]
    EntityNotFound {
        /// The document searched.
        document: String,
        /// The entity id that was not found.
        id: EntityId,
    },

    /// The entity exists but does not have the field.
    #[error("field `{field}` not found on entity {id} in {document}")]
    FieldNotFound {
        /// The document searched.
        document: String,
        /// The owning entity.
        id: EntityId,
        /// The missing field path.
        field: String,
    },

    /// The field is already present on the entity.
    #[error("field `{field}` already exists on entity {id} in {document}")]
    FieldExists {
        /// The document.
        document: String,
        /// The owning entity.
        id: EntityId,
        /// The conflicting field path.
        field: String,
    },

    /// An entity with the same unique key is already present.
    #[error("entity already exists in {document}: {description}")]
    EntityExists {
        /// The document.
        document: String,
        /// Which key values collided.
        description: String,
    },

    /// The named document does not exist.
    #[error("document not found: {name}")]
    DocumentNotFound {
        /// The document name.
        name: String,
    },

    /// The named document already exists.
    #[error("document already exists: {name}")]
    DocumentExists {
        /// The document name.
        name: String,
    },

    /// The backend rejected a selector or fragment.
    #[error("malformed fragment for `{selector}`: {message}")]
    MalformedFragment {
        /// The selector (or fragment summary) that was rejected.
        selector: String,
        /// Backend diagnostic.
        message: String,
    },

    /// The document does not have the expected wrapper/entities-root shape.
    #[error("malformed document {document}: {message}")]
    MalformedDocument {
        /// The document name.
        document: String,
        /// What is wrong with it.
        message: String,
    },

    /// A lookup that must be unique matched several entities.
    #[error("{count} entities in {document} match `{selector}`")]
    AmbiguousMatch {
        /// The document searched.
        document: String,
        /// The lookup selector.
        selector: String,
        /// How many entities matched.
        count: usize,
    },

    /// A tag, field or attribute name is not a valid element name.
    #[error("invalid name: `{name}`")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A stored or supplied identifier is not a non-negative integer.
    #[error("invalid entity identifier: `{value}`")]
    InvalidIdentifier {
        /// The offending value.
        value: String,
    },

    /// The document session failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] SessionError),
}

impl From<SessionError> for CoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Query { expr, message } => Self::MalformedFragment {
                selector: expr,
                message,
            },
            SessionError::Fragment { message } => Self::MalformedFragment {
                selector: String::from("<fragment>"),
                message,
            },
            SessionError::DocumentNotFound { name } => Self::DocumentNotFound { name },
            SessionError::DocumentExists { name } => Self::DocumentExists { name },
            SessionError::MalformedDocument { name, message } => Self::MalformedDocument {
                document: name,
                message,
            },
            SessionError::InvalidName { name } => Self::InvalidName { name },
            other => Self::BackendUnavailable(other),
        }
    }
}

impl CoreError {
    /// Converts a session error raised while executing a fragment aimed at
    /// `selector`, so a rejection names the selector instead of the
    /// fragment as a whole.
    pub fn from_mutation(err: SessionError, selector: &str) -> Self {
        match err {
            SessionError::Fragment { message } => Self::MalformedFragment {
                selector: selector.to_string(),
                message,
            },
            other => other.into(),
        }
    }

    /// Creates a malformed document error.
    pub fn malformed_document(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an invalid identifier error.
    pub fn invalid_identifier(value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
        }
    }

    /// Returns true for the NotFound family (entity, field or document).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::FieldNotFound { .. } | Self::DocumentNotFound { .. }
        )
    }

    /// Returns true for the AlreadyExists family (entity, field or document).
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::EntityExists { .. } | Self::FieldExists { .. } | Self::DocumentExists { .. }
        )
    }
}
