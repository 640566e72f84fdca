mod engine;
mod identity;
mod persistence;

pub use engine::WorkflowEngine;
pub use identity::{Accounts, Directory, Role};
pub use persistence::{JsonFileStore, SNAPSHOT_VERSION, Snapshot, SnapshotStore};
