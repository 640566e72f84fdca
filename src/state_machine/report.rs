use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Resolution, State};
use crate::error::{BugflowError, Result};

/// Engine-assigned identifier of a report. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ReportId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl TryFrom<i64> for ReportId {
    type Error = BugflowError;

    fn try_from(id: i64) -> Result<Self> {
        u64::try_from(id)
            .map(Self)
            .map_err(|_| BugflowError::InvalidReport(id))
    }
}

/// A single defect report and its lifecycle state.
///
/// Fields are private: every mutation goes through one of the named edge
/// operations, which validate before touching anything, so a failed call
/// leaves the report exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    id: ReportId,
    description: String,
    state: State,
    resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Report {
    /// Create a report in UNCONFIRMED / UNRESOLVED.
    pub fn new(id: i64, description: impl Into<String>) -> Result<Self> {
        Self::with_id(ReportId::try_from(id)?, description)
    }

    pub fn with_id(id: ReportId, description: impl Into<String>) -> Result<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(BugflowError::EmptyDescription);
        }
        let now = Utc::now();
        Ok(Self {
            id,
            description,
            state: State::Unconfirmed,
            resolution: Resolution::Unresolved,
            resolution_note: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ReportId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn resolution_note(&self) -> Option<&str> {
        self.resolution_note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Move to `target` along one of the allowed edges.
    ///
    /// - UNCONFIRMED → CONFIRMED ([`confirm`](Self::confirm))
    /// - CONFIRMED → IN_PROGRESS ([`start_progress`](Self::start_progress))
    /// - IN_PROGRESS → CONFIRMED ([`stop_progress`](Self::stop_progress))
    /// - RESOLVED → CONFIRMED ([`reopen`](Self::reopen))
    /// - RESOLVED → VERIFIED ([`verify`](Self::verify))
    ///
    /// Anything else fails with `IllegalTransition`, or `ReportFinalized`
    /// when the report is already VERIFIED.
    pub fn transition(&mut self, target: State) -> Result<()> {
        self.ensure_not_finalized()?;
        if !self.state.allows(target) {
            return Err(BugflowError::IllegalTransition {
                from: self.state,
                to: target,
            });
        }
        // The edge is legal; the source state alone picks the named operation.
        match self.state {
            State::Unconfirmed => self.confirm(),
            State::Confirmed => self.start_progress(),
            State::InProgress => self.stop_progress(),
            State::Resolved if target == State::Verified => self.verify(),
            State::Resolved => self.reopen(),
            State::Verified => Err(BugflowError::ReportFinalized(self.id)),
        }
    }

    /// UNCONFIRMED → CONFIRMED.
    pub fn confirm(&mut self) -> Result<()> {
        self.expect_edge(State::Unconfirmed, State::Confirmed)?;
        self.enter(State::Confirmed);
        Ok(())
    }

    /// CONFIRMED → IN_PROGRESS.
    pub fn start_progress(&mut self) -> Result<()> {
        self.expect_edge(State::Confirmed, State::InProgress)?;
        self.enter(State::InProgress);
        Ok(())
    }

    /// IN_PROGRESS → CONFIRMED. An in-progress report never carries a
    /// resolution, so only the state changes.
    pub fn stop_progress(&mut self) -> Result<()> {
        self.expect_edge(State::InProgress, State::Confirmed)?;
        self.enter(State::Confirmed);
        Ok(())
    }

    /// RESOLVED → CONFIRMED. Discards the previous resolution and note.
    pub fn reopen(&mut self) -> Result<()> {
        self.expect_edge(State::Resolved, State::Confirmed)?;
        self.resolution = Resolution::Unresolved;
        self.resolution_note = None;
        self.enter(State::Confirmed);
        Ok(())
    }

    /// RESOLVED → VERIFIED. The report is frozen afterwards.
    pub fn verify(&mut self) -> Result<()> {
        self.expect_edge(State::Resolved, State::Verified)?;
        self.enter(State::Verified);
        Ok(())
    }

    /// Attach a resolution and move to RESOLVED. Permitted from CONFIRMED
    /// (analyst invalidation) and IN_PROGRESS (developer fix).
    pub fn resolve(&mut self, resolution: Resolution, note: impl Into<String>) -> Result<()> {
        self.ensure_not_finalized()?;
        if resolution == Resolution::Unresolved {
            return Err(BugflowError::UnresolvedNotAllowed);
        }
        let note = note.into();
        if note.trim().is_empty() {
            return Err(BugflowError::EmptyNote);
        }
        if !self.state.can_resolve() {
            return Err(BugflowError::IllegalTransition {
                from: self.state,
                to: State::Resolved,
            });
        }

        self.resolution = resolution;
        self.resolution_note = Some(note);
        self.enter(State::Resolved);
        Ok(())
    }

    /// Whether state, resolution and note agree with each other.
    pub fn is_consistent(&self) -> bool {
        let resolved = self.resolution != Resolution::Unresolved;
        let noted = self
            .resolution_note
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        resolved == self.state.carries_resolution()
            && resolved == noted
            && !self.description.trim().is_empty()
    }

    fn ensure_not_finalized(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(BugflowError::ReportFinalized(self.id));
        }
        Ok(())
    }

    fn expect_edge(&self, from: State, to: State) -> Result<()> {
        self.ensure_not_finalized()?;
        if self.state != from {
            return Err(BugflowError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    fn enter(&mut self, state: State) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn confirmed() -> Report {
        let mut report = Report::new(0, "crash on save").unwrap();
        report.confirm().unwrap();
        report
    }

    fn resolved(resolution: Resolution) -> Report {
        let mut report = confirmed();
        report.start_progress().unwrap();
        report.resolve(resolution, "patched").unwrap();
        report
    }

    #[test]
    fn creation_defaults() {
        let report = Report::new(7, "Login button does nothing").unwrap();
        assert_eq!(report.id(), ReportId(7));
        assert_eq!(report.description(), "Login button does nothing");
        assert_eq!(report.state(), State::Unconfirmed);
        assert_eq!(report.resolution(), Resolution::Unresolved);
        assert!(report.resolution_note().is_none());
        assert!(report.is_consistent());
    }

    #[test]
    fn negative_id_is_rejected() {
        let err = Report::new(-1, "desc").unwrap_err();
        assert!(matches!(err, BugflowError::InvalidReport(-1)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn empty_description_is_rejected() {
        assert!(matches!(
            Report::new(0, ""),
            Err(BugflowError::EmptyDescription)
        ));
        assert!(matches!(
            Report::new(0, "   "),
            Err(BugflowError::EmptyDescription)
        ));
    }

    #[test]
    fn happy_path_walks_all_states() {
        let mut report = Report::new(0, "desc").unwrap();
        report.transition(State::Confirmed).unwrap();
        report.transition(State::InProgress).unwrap();
        report.resolve(Resolution::Fixed, "patch").unwrap();
        assert_eq!(report.state(), State::Resolved);
        assert_eq!(report.resolution(), Resolution::Fixed);
        assert_eq!(report.resolution_note(), Some("patch"));
        report.transition(State::Verified).unwrap();
        assert_eq!(report.state(), State::Verified);
        assert_eq!(report.resolution(), Resolution::Fixed);
        assert!(report.is_consistent());
    }

    #[test]
    fn confirmed_to_verified_is_illegal() {
        let mut report = confirmed();
        let err = report.transition(State::Verified).unwrap_err();
        assert!(matches!(
            err,
            BugflowError::IllegalTransition {
                from: State::Confirmed,
                to: State::Verified
            }
        ));
        assert_eq!(report.state(), State::Confirmed);
    }

    #[test]
    fn unconfirmed_cannot_be_reentered() {
        let mut report = confirmed();
        assert!(report.transition(State::Unconfirmed).is_err());
        assert_eq!(report.state(), State::Confirmed);
    }

    fn report_in(state: State) -> Report {
        let mut report = Report::new(0, "crash on save").unwrap();
        if state == State::Unconfirmed {
            return report;
        }
        report.confirm().unwrap();
        match state {
            State::InProgress => report.start_progress().unwrap(),
            State::Resolved => report.resolve(Resolution::Fixed, "patched").unwrap(),
            State::Verified => {
                report.resolve(Resolution::Fixed, "patched").unwrap();
                report.verify().unwrap();
            }
            _ => {}
        }
        report
    }

    #[test]
    fn transition_follows_the_edge_table() {
        for from in State::ALL {
            for to in State::ALL {
                let mut report = report_in(from);
                let result = report.transition(to);
                if from.allows(to) {
                    assert!(result.is_ok(), "{from} -> {to} should succeed");
                    assert_eq!(report.state(), to);
                } else {
                    assert!(result.is_err(), "{from} -> {to} should fail");
                    assert_eq!(report.state(), from);
                }
            }
        }
    }

    #[test]
    fn resolved_is_not_a_transition_target() {
        let mut report = confirmed();
        let err = report.transition(State::Resolved).unwrap_err();
        assert!(matches!(err, BugflowError::IllegalTransition { .. }));
    }

    #[test]
    fn stop_progress_returns_to_confirmed() {
        let mut report = confirmed();
        report.start_progress().unwrap();
        report.transition(State::Confirmed).unwrap();
        assert_eq!(report.state(), State::Confirmed);
        assert_eq!(report.resolution(), Resolution::Unresolved);
    }

    #[test]
    fn reopen_discards_resolution() {
        let mut report = resolved(Resolution::WontFix);
        report.transition(State::Confirmed).unwrap();
        assert_eq!(report.state(), State::Confirmed);
        assert_eq!(report.resolution(), Resolution::Unresolved);
        assert!(report.resolution_note().is_none());
        assert!(report.is_consistent());
    }

    #[test]
    fn named_edges_check_their_source_state() {
        let mut report = confirmed();
        assert!(report.reopen().is_err());
        assert!(report.verify().is_err());
        assert!(report.stop_progress().is_err());
        assert!(report.confirm().is_err());
        assert_eq!(report.state(), State::Confirmed);
    }

    #[test]
    fn verified_is_absorbing() {
        let mut report = resolved(Resolution::Fixed);
        report.verify().unwrap();
        let before = report.clone();

        for target in State::ALL {
            let err = report.transition(target).unwrap_err();
            assert!(matches!(err, BugflowError::ReportFinalized(ReportId(0))));
        }
        let err = report.resolve(Resolution::Invalid, "late").unwrap_err();
        assert!(matches!(err, BugflowError::ReportFinalized(_)));
        assert_eq!(report, before);
    }

    #[test]
    fn resolve_from_confirmed_is_allowed() {
        let mut report = confirmed();
        report.resolve(Resolution::Invalid, "not a bug").unwrap();
        assert_eq!(report.state(), State::Resolved);
        assert_eq!(report.resolution(), Resolution::Invalid);
    }

    #[test]
    fn resolve_from_unconfirmed_is_illegal() {
        let mut report = Report::new(0, "desc").unwrap();
        let err = report.resolve(Resolution::Invalid, "spam").unwrap_err();
        assert!(matches!(
            err,
            BugflowError::IllegalTransition {
                from: State::Unconfirmed,
                to: State::Resolved
            }
        ));
    }

    #[test]
    fn resolve_twice_is_illegal() {
        let mut report = resolved(Resolution::Fixed);
        assert!(report.resolve(Resolution::Duplicate, "again").is_err());
        assert_eq!(report.resolution(), Resolution::Fixed);
    }

    #[test]
    fn resolve_rejects_unresolved() {
        let mut report = confirmed();
        let err = report.resolve(Resolution::Unresolved, "note").unwrap_err();
        assert!(matches!(err, BugflowError::UnresolvedNotAllowed));
        assert_eq!(report.state(), State::Confirmed);
    }

    #[test]
    fn resolve_with_empty_note_changes_nothing() {
        let mut report = confirmed();
        report.start_progress().unwrap();
        let before = report.clone();

        let err = report.resolve(Resolution::Fixed, "").unwrap_err();
        assert!(matches!(err, BugflowError::EmptyNote));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(report, before);
    }

    #[test]
    fn report_serialization_roundtrip() {
        let report = resolved(Resolution::Duplicate);
        let json = serde_json::to_string(&report).unwrap();
        let restored: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn report_id_display() {
        assert_eq!(ReportId(3).to_string(), "#3");
        assert!(ReportId::try_from(-5_i64).is_err());
        assert_eq!(ReportId::try_from(5_i64).unwrap(), ReportId(5));
    }
}
