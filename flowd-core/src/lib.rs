//! # flowd-core
//!
//! Workflow engine for flowd.
//!
//! This crate provides:
//! - Workflow definition parsing and validation
//! - The immutable definition registry and the instance store
//! - Transition execution with ordered guard checks
//! - Append-only instance history

pub mod definition;
pub mod engine;
pub mod error;
pub mod instance;

pub use definition::{ActionTransition, State, WorkflowDefinition, WorkflowDefinitionRaw};
pub use engine::{ActionOutcome, WorkflowEngine};
pub use error::{CoreError, ErrorKind};
pub use instance::{HistoryEntry, WorkflowInstance};
