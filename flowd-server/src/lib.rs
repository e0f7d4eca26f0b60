//! # flowd-server
//!
//! TCP server for flowd.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - Protocol framing and message dispatch
//! - Session management
//! - Command handlers for all WCP operations
//! - Token-based authentication

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;

pub use auth::TokenValidator;
pub use config::{AuthConfig, Config, ConfigError, NetworkConfig};
pub use error::ServerError;
pub use handler::{CommandHandler, ServerInfo};
pub use server::{Server, ServerConfig, ServerStats};
pub use session::Session;
