//! bugflow — defect report lifecycle with role-gated workflow operations.
//!
//! - [`state_machine`] — a single [`Report`] and its allowed transitions
//! - [`workflow`] — [`WorkflowEngine`], accounts, and snapshot persistence
//! - [`error`] — [`BugflowError`] and its [`ErrorKind`] taxonomy

pub mod cli;
pub mod config;
pub mod error;
pub mod state_machine;
pub mod ui;
pub mod workflow;

pub use error::{BugflowError, ErrorKind, StorageError};
pub use state_machine::{Report, ReportId, Resolution, State};
pub use workflow::{Accounts, Directory, JsonFileStore, Role, Snapshot, SnapshotStore, WorkflowEngine};
