//! Document tree and markup helpers.

pub mod escape;
mod tree;

pub(crate) use tree::is_layout;
pub use tree::{Document, NodeId, NodeKind};
