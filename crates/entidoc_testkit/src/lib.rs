//! # entidoc testkit
//!
//! Test utilities for entidoc.
//!
//! This crate provides:
//! - Catalog fixtures backed by memory or a temporary directory
//! - Property-based test generators using proptest
//! - A harness that tracks expected field values and checks a store against them
//!
//! ## Usage
//!
//! ```rust
//! use entidoc_core::EntitySchema;
//! use entidoc_testkit::prelude::*;
//!
//! with_memory_store(EntitySchema::tags(), |tags| {
//!     let id = tags.create("tag", &[("xpath", "//title")]).unwrap();
//!     assert!(tags.contains(id).unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
