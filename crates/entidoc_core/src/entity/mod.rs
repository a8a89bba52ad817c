//! Entity types and storage.

mod id;
mod new;
mod store;

pub use id::EntityId;
pub use new::{FieldValue, NewEntity};
pub use store::EntityStore;

pub(crate) use store::with_document;
