use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::state_machine::{ReportId, State};
use crate::workflow::Role;

#[derive(Debug, Error)]
pub enum BugflowError {
    #[error("Invalid report id: {0}")]
    InvalidReport(i64),

    #[error("Report description must not be empty")]
    EmptyDescription,

    #[error("Resolution note must not be empty")]
    EmptyNote,

    #[error("A report cannot be resolved as UNRESOLVED")]
    UnresolvedNotAllowed,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Credential must not be empty")]
    EmptyCredential,

    #[error("User {actor} is not logged in")]
    NotAuthenticated { actor: String },

    #[error("User {actor} ({role}) may not perform an action reserved for {required}")]
    RoleNotPermitted {
        actor: String,
        role: Role,
        required: Role,
    },

    #[error("Authentication failed for {0}")]
    AuthenticationFailed(String),

    #[error("User {0} is not logged in")]
    NotLoggedIn(String),

    #[error("Report not found: {0}")]
    ReportNotFound(ReportId),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: State, to: State },

    #[error("Report {0} is VERIFIED and can no longer change")]
    ReportFinalized(ReportId),

    #[error("Developer {developer} is already working on report {current}")]
    DeveloperAlreadyAssigned {
        developer: String,
        current: ReportId,
    },

    #[error("Developer {developer} is not assigned to report {report}")]
    NotAssigned { developer: String, report: ReportId },

    #[error("User already registered: {0}")]
    DuplicateUser(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures of the snapshot collaborator. Never leaves the in-memory engine
/// in a different state than before the call.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no snapshot at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("snapshot rejected: {0}")]
    Inconsistent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`BugflowError`], stable for callers that
/// only care about the category of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: empty strings, negative ids, UNRESOLVED resolutions.
    Validation,
    /// Wrong role or not authenticated.
    Authorization,
    /// Unknown report or user.
    NotFound,
    /// The lifecycle or assignment table forbids the operation.
    State,
    /// Re-registration of a known user.
    Duplicate,
    /// The persistence collaborator failed.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::Authorization => write!(f, "AuthorizationError"),
            ErrorKind::NotFound => write!(f, "NotFoundError"),
            ErrorKind::State => write!(f, "StateError"),
            ErrorKind::Duplicate => write!(f, "DuplicateError"),
            ErrorKind::Storage => write!(f, "StorageError"),
        }
    }
}

impl BugflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BugflowError::InvalidReport(_)
            | BugflowError::EmptyDescription
            | BugflowError::EmptyNote
            | BugflowError::UnresolvedNotAllowed
            | BugflowError::EmptyUsername
            | BugflowError::EmptyCredential => ErrorKind::Validation,
            BugflowError::NotAuthenticated { .. }
            | BugflowError::RoleNotPermitted { .. }
            | BugflowError::AuthenticationFailed(_)
            | BugflowError::NotLoggedIn(_) => ErrorKind::Authorization,
            BugflowError::ReportNotFound(_) | BugflowError::UnknownUser(_) => ErrorKind::NotFound,
            BugflowError::IllegalTransition { .. }
            | BugflowError::ReportFinalized(_)
            | BugflowError::DeveloperAlreadyAssigned { .. }
            | BugflowError::NotAssigned { .. } => ErrorKind::State,
            BugflowError::DuplicateUser(_) => ErrorKind::Duplicate,
            BugflowError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T, E = BugflowError> = std::result::Result<T, E>;
