//! # fillbus-server
//!
//! TCP server for the fillbus tag exchange protocol.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - Frame dispatch and per-command handlers over a shared tag registry
//! - Administrative API (tag provisioning, client count, statistics)
//! - YAML configuration with environment overrides
//! - Graceful shutdown and acceptor supervision

pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use config::{Config, ConfigError, NetworkConfig, TagSpec};
pub use error::ServerError;
pub use handler::{CommandHandler, Reply};
pub use server::{Server, ServerConfig, ServerStats};
