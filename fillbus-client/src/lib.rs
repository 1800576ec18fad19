//! # fillbus-client
//!
//! Client library for the fillbus tag exchange protocol.
//!
//! This crate provides:
//! - Async TCP client with connection management and per-operation timeout
//! - One method per protocol command, plus typed numeric views
//! - Optional periodic heartbeat (NoOp) with close-on-failure

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{ClientConfig, Connection, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_TIMEOUT};
pub use error::ClientError;
