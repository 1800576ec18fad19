//! # fillbus-registry
//!
//! In-memory tag registry for fillbus servers.
//!
//! This crate provides:
//! - The tag model: typed values, access modes, payload coding
//! - A concurrent registry with serialized mutation
//! - The `TagStore` trait consumed by the server's command handlers

pub mod error;
pub mod registry;
pub mod tag;

pub use error::RegistryError;
pub use registry::{TagRegistry, TagStore};
pub use tag::{Access, Tag, TagType, TagValue};
