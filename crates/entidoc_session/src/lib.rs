//! # entidoc session
//!
//! Document sessions and stores for entidoc.
//!
//! This crate is the boundary the entity layer talks through. A
//! [`DocumentStore`] hands out [`DocumentSession`]s bound to one named
//! document; a session answers path-expression queries and applies
//! update fragments.
//!
//! ## Design Principles
//!
//! - Sessions know nothing about entities, ids or fields
//! - Every read is a fresh evaluation; no result caching
//! - A fragment is applied as a whole or not at all
//! - Stores must be `Send + Sync` so a catalog can be shared
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral catalogs
//! - [`FileStore`] - One file per document, written through on mutation
//!
//! ## Example
//!
//! ```rust
//! use entidoc_session::{DocumentStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.create("DMSTags.xml", "<DMS><tags/></DMS>").unwrap();
//!
//! let mut session = store.open("DMSTags.xml").unwrap();
//! let modified = session
//!     .mutate(
//!         r#"<xupdate:modifications version="1.0" xmlns:xupdate="http://www.xmldb.org/xupdate">
//!              <xupdate:append select="/DMS/*[1]"><tag id="1"><xpath>//title</xpath></tag></xupdate:append>
//!            </xupdate:modifications>"#,
//!     )
//!     .unwrap();
//! assert_eq!(modified, 1);
//! assert_eq!(session.query("max(/DMS/*[1]/*/@id)").unwrap(), vec!["1"]);
//! session.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod session;
mod shared;
pub mod xml;
pub mod xpath;
pub mod xupdate;

pub use error::{SessionError, SessionResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use session::{DocumentSession, DocumentStore};
pub use xupdate::XUPDATE_NAMESPACE;
