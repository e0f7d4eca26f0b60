//! # flowd-client
//!
//! Client library for flowd.
//!
//! This crate provides:
//! - Async TCP client with connection management
//! - High-level API for all WCP operations
//! - Request/response correlation over a single connection

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
