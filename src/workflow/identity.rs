//! Accounts and sessions consumed by the workflow engine.
//!
//! The engine only ever asks two questions of its identity collaborator,
//! captured by [`Directory`]. [`Accounts`] is the in-memory implementation
//! with registration and a logged-in set.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BugflowError, Result};

/// Role held by an actor; gates which workflow operations they may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SystemAnalyst,
    QualityAssurance,
    Developer,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::SystemAnalyst => write!(f, "SYSTEM_ANALYST"),
            Role::QualityAssurance => write!(f, "QUALITY_ASSURANCE"),
            Role::Developer => write!(f, "DEVELOPER"),
            Role::User => write!(f, "USER"),
        }
    }
}

/// Read-only identity lookups needed to authorize a workflow operation.
pub trait Directory {
    /// Role of a registered user, `None` if the name is unknown.
    fn role_of(&self, username: &str) -> Option<Role>;

    fn is_authenticated(&self, username: &str) -> bool;
}

#[derive(Debug, Clone)]
struct Member {
    credential: String,
    role: Role,
}

/// Registered members plus the set of currently logged-in usernames.
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    members: HashMap<String, Member>,
    logged_in: HashSet<String>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, username: &str, credential: &str, role: Role) -> Result<()> {
        if username.is_empty() {
            return Err(BugflowError::EmptyUsername);
        }
        if credential.is_empty() {
            return Err(BugflowError::EmptyCredential);
        }
        if self.members.contains_key(username) {
            return Err(BugflowError::DuplicateUser(username.to_string()));
        }

        self.members.insert(
            username.to_string(),
            Member {
                credential: credential.to_string(),
                role,
            },
        );
        tracing::debug!(user = username, %role, "registered user");
        Ok(())
    }

    /// Logging in again while already logged in is a no-op.
    pub fn login(&mut self, username: &str, credential: &str) -> Result<()> {
        match self.members.get(username) {
            Some(member) if member.credential == credential => {
                if self.logged_in.insert(username.to_string()) {
                    tracing::debug!(user = username, "logged in");
                }
                Ok(())
            }
            _ => Err(BugflowError::AuthenticationFailed(username.to_string())),
        }
    }

    pub fn logout(&mut self, username: &str) -> Result<()> {
        if !self.logged_in.remove(username) {
            return Err(BugflowError::NotLoggedIn(username.to_string()));
        }
        tracing::debug!(user = username, "logged out");
        Ok(())
    }
}

impl Directory for Accounts {
    fn role_of(&self, username: &str) -> Option<Role> {
        self.members.get(username).map(|m| m.role)
    }

    fn is_authenticated(&self, username: &str) -> bool {
        self.logged_in.contains(username)
    }
}
