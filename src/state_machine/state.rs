use std::fmt;

use serde::{Deserialize, Serialize};

/// The five lifecycle states of a defect report.
///
/// A report flows: UNCONFIRMED → CONFIRMED → IN_PROGRESS → RESOLVED → VERIFIED,
/// with two edges back to CONFIRMED (developer backs out, QA rejects the fix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Unconfirmed,
    Confirmed,
    InProgress,
    Resolved,
    Verified,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Unconfirmed => write!(f, "UNCONFIRMED"),
            State::Confirmed => write!(f, "CONFIRMED"),
            State::InProgress => write!(f, "IN_PROGRESS"),
            State::Resolved => write!(f, "RESOLVED"),
            State::Verified => write!(f, "VERIFIED"),
        }
    }
}

impl State {
    pub const ALL: [State; 5] = [
        State::Unconfirmed,
        State::Confirmed,
        State::InProgress,
        State::Resolved,
        State::Verified,
    ];

    /// Whether `self → target` is one of the edges reachable through
    /// `Report::transition`. RESOLVED is only entered through `resolve`.
    pub fn allows(self, target: State) -> bool {
        matches!(
            (self, target),
            (State::Unconfirmed, State::Confirmed)
                | (State::Confirmed, State::InProgress)
                | (State::InProgress, State::Confirmed)
                | (State::Resolved, State::Confirmed)
                | (State::Resolved, State::Verified)
        )
    }

    /// States from which a resolution may be attached.
    pub fn can_resolve(self) -> bool {
        matches!(self, State::Confirmed | State::InProgress)
    }

    /// States in which the resolution must be something other than UNRESOLVED.
    pub fn carries_resolution(self) -> bool {
        matches!(self, State::Resolved | State::Verified)
    }

    pub fn is_terminal(self) -> bool {
        self == State::Verified
    }
}

/// Outcome attached to a report when it leaves active development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    #[default]
    Unresolved,
    Fixed,
    Duplicate,
    WontFix,
    WorksForMe,
    Invalid,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Unresolved => write!(f, "UNRESOLVED"),
            Resolution::Fixed => write!(f, "FIXED"),
            Resolution::Duplicate => write!(f, "DUPLICATE"),
            Resolution::WontFix => write!(f, "WONTFIX"),
            Resolution::WorksForMe => write!(f, "WORKSFORME"),
            Resolution::Invalid => write!(f, "INVALID"),
        }
    }
}
