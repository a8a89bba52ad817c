//! # entidoc core
//!
//! Entity layer over XML documents.
//!
//! Every document has the same two-level shape:
//!
//! ```text
//! <DMS>
//!   <users>                      entities root
//!     <user id="1" active="yes"> entity
//!       <info><email/></info>    fields
//!     </user>
//!   </users>
//! </DMS>
//! ```
//!
//! This crate provides:
//! - [`PathBuilder`] - Selectors for the entities root, entities and fields
//! - [`UpdateFragment`] - Update-fragment documents, including the
//!   rewrite of empty updates
//! - [`next_id`] - Identifier allocation from the largest existing id
//! - [`EntityStore`] - Entity, field and attribute operations
//! - [`Catalog`] - Document bootstrap and the shape check
//!
//! ## Example
//!
//! ```rust
//! use entidoc_core::{Catalog, EntitySchema, NewEntity};
//!
//! let catalog = Catalog::in_memory();
//! catalog.bootstrap(&EntitySchema::users()).unwrap();
//! let users = catalog.entities(EntitySchema::users()).unwrap();
//!
//! let id = users
//!     .insert(NewEntity::new("user").attribute("username", "alice"))
//!     .unwrap();
//! users.set_field(id, "info/email", "a@x.com").unwrap();
//!
//! assert_eq!(users.find_by_attribute("username", "alice").unwrap(), Some(id));
//! assert_eq!(users.get_attribute(id, "active").unwrap().as_deref(), Some("yes"));
//! ```
//!
//! ## Concurrency
//!
//! Calls are synchronous. Creating an entity takes two round trips (id query,
//! then append) with no lock in between, so concurrent creators on one
//! document can allocate the same id. Serialize creation per document when
//! that matters.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod catalog;
mod config;
mod entity;
mod error;
mod fragment;
mod path;
mod schema;

pub use allocator::next_id;
pub use catalog::Catalog;
pub use config::Config;
pub use entity::{EntityId, EntityStore, FieldValue, NewEntity};
pub use error::{CoreError, CoreResult};
pub use fragment::{Payload, Placement, UpdateFragment};
pub use path::{check_name, literal, FieldPath, PathBuilder};
pub use schema::{EntitySchema, KeyRef};

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export the session layer for callers that bring their own store.
pub use entidoc_session::{DocumentSession, DocumentStore, FileStore, InMemoryStore};
