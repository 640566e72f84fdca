use std::collections::BTreeMap;

use crate::error::{BugflowError, Result};
use crate::state_machine::{Report, ReportId, Resolution};

use super::identity::{Accounts, Directory, Role};
use super::persistence::{Snapshot, SnapshotStore};

/// Drives reports through their lifecycle on behalf of authenticated actors.
///
/// Every operation runs the same three phases: authorize the actor against
/// the [`Directory`], locate the report, then apply the transition and update
/// the assignment table. All checks happen before the first write, so a
/// failed operation leaves the engine untouched.
pub struct WorkflowEngine<D = Accounts> {
    directory: D,
    reports: BTreeMap<ReportId, Report>,
    assignments: BTreeMap<String, ReportId>,
    store: Option<Box<dyn SnapshotStore>>,
}

impl<D: Directory + Default> Default for WorkflowEngine<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

fn locate(reports: &mut BTreeMap<ReportId, Report>, id: ReportId) -> Result<&mut Report> {
    reports.get_mut(&id).ok_or(BugflowError::ReportNotFound(id))
}

impl<D: Directory> WorkflowEngine<D> {
    /// Create an in-memory engine without persistence.
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            reports: BTreeMap::new(),
            assignments: BTreeMap::new(),
            store: None,
        }
    }

    /// Create an engine backed by `store`, restoring its last snapshot.
    ///
    /// A missing, unreadable or inconsistent snapshot is discarded: the engine
    /// starts empty and immediately tries to save that empty state.
    pub fn with_store(directory: D, store: impl SnapshotStore + 'static) -> Self {
        let restored = store
            .load()
            .and_then(|snapshot| snapshot.validate().map(|()| snapshot));

        let mut engine = Self::new(directory);
        engine.store = Some(Box::new(store));

        match restored {
            Ok(snapshot) => {
                tracing::info!(
                    reports = snapshot.reports.len(),
                    assignments = snapshot.assignments.len(),
                    "restored workflow snapshot"
                );
                engine.reports = snapshot
                    .reports
                    .into_iter()
                    .map(|report| (report.id(), report))
                    .collect();
                engine.assignments = snapshot.assignments;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not restore snapshot, starting empty");
                if let Err(e) = engine.save() {
                    tracing::warn!(error = %e, "could not write initial snapshot");
                }
            }
        }
        engine
    }

    // -----------------------------------------------------------------------
    // Workflow operations
    // -----------------------------------------------------------------------

    /// USER files a new report; returns the id it was given.
    pub fn submit_report(&mut self, actor: &str, description: &str) -> Result<ReportId> {
        self.apply("submit_report", actor, Role::User, |engine| {
            let id = ReportId(engine.reports.len() as u64);
            let report = Report::with_id(id, description)?;
            engine.reports.insert(id, report);
            Ok(id)
        })
    }

    /// SYSTEM_ANALYST confirms an UNCONFIRMED report.
    pub fn confirm(&mut self, actor: &str, id: ReportId) -> Result<()> {
        self.apply("confirm", actor, Role::SystemAnalyst, |engine| {
            locate(&mut engine.reports, id)?.confirm()?;
            Ok(id)
        })
        .map(drop)
    }

    /// SYSTEM_ANALYST resolves a report as INVALID. If a developer was
    /// working on it, their assignment is released.
    pub fn invalidate(&mut self, actor: &str, id: ReportId, note: &str) -> Result<()> {
        self.apply("invalidate", actor, Role::SystemAnalyst, |engine| {
            locate(&mut engine.reports, id)?.resolve(Resolution::Invalid, note)?;
            engine.assignments.retain(|developer, assigned| {
                let keep = *assigned != id;
                if !keep {
                    tracing::info!(developer = %developer, report = %id, "released assignment");
                }
                keep
            });
            Ok(id)
        })
        .map(drop)
    }

    /// DEVELOPER takes a CONFIRMED report. A developer holds at most one.
    pub fn start_development(&mut self, actor: &str, id: ReportId) -> Result<()> {
        self.apply("start_development", actor, Role::Developer, |engine| {
            let report = locate(&mut engine.reports, id)?;
            if let Some(&current) = engine.assignments.get(actor) {
                return Err(BugflowError::DeveloperAlreadyAssigned {
                    developer: actor.to_string(),
                    current,
                });
            }
            report.start_progress()?;
            engine.assignments.insert(actor.to_string(), id);
            Ok(id)
        })
        .map(drop)
    }

    /// DEVELOPER backs out of the report they are working on.
    pub fn stop_development(&mut self, actor: &str, id: ReportId) -> Result<()> {
        self.apply("stop_development", actor, Role::Developer, |engine| {
            let report = locate(&mut engine.reports, id)?;
            ensure_assigned(&engine.assignments, actor, id)?;
            report.stop_progress()?;
            engine.assignments.remove(actor);
            Ok(id)
        })
        .map(drop)
    }

    /// DEVELOPER resolves the report they are working on.
    pub fn mark_fixed(
        &mut self,
        actor: &str,
        id: ReportId,
        resolution: Resolution,
        note: &str,
    ) -> Result<()> {
        self.apply("mark_fixed", actor, Role::Developer, |engine| {
            let report = locate(&mut engine.reports, id)?;
            ensure_assigned(&engine.assignments, actor, id)?;
            report.resolve(resolution, note)?;
            engine.assignments.remove(actor);
            Ok(id)
        })
        .map(drop)
    }

    /// QUALITY_ASSURANCE accepts the fix; the report becomes VERIFIED.
    pub fn approve_fix(&mut self, actor: &str, id: ReportId) -> Result<()> {
        self.apply("approve_fix", actor, Role::QualityAssurance, |engine| {
            locate(&mut engine.reports, id)?.verify()?;
            Ok(id)
        })
        .map(drop)
    }

    /// QUALITY_ASSURANCE rejects the fix; the report is reopened as CONFIRMED.
    pub fn reject_fix(&mut self, actor: &str, id: ReportId) -> Result<()> {
        self.apply("reject_fix", actor, Role::QualityAssurance, |engine| {
            locate(&mut engine.reports, id)?.reopen()?;
            Ok(id)
        })
        .map(drop)
    }

    // -----------------------------------------------------------------------
    // Query surface
    // -----------------------------------------------------------------------

    /// Copy of every report, ordered by id.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.values().cloned().collect()
    }

    pub fn report(&self, id: ReportId) -> Result<Report> {
        self.reports
            .get(&id)
            .cloned()
            .ok_or(BugflowError::ReportNotFound(id))
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    pub fn assignment_of(&self, developer: &str) -> Option<ReportId> {
        self.assignments.get(developer).copied()
    }

    pub fn assignments(&self) -> BTreeMap<String, ReportId> {
        self.assignments.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.reports(), self.assignments())
    }

    /// Write the current state to the store. A no-op without one.
    pub fn save(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.save(&self.snapshot())?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn authorize(&self, actor: &str, required: Role) -> Result<()> {
        if actor.is_empty() {
            return Err(BugflowError::EmptyUsername);
        }
        let role = self
            .directory
            .role_of(actor)
            .ok_or_else(|| BugflowError::UnknownUser(actor.to_string()))?;
        if !self.directory.is_authenticated(actor) {
            return Err(BugflowError::NotAuthenticated {
                actor: actor.to_string(),
            });
        }
        if role != required {
            return Err(BugflowError::RoleNotPermitted {
                actor: actor.to_string(),
                role,
                required,
            });
        }
        Ok(())
    }

    /// Authorize, run `op`, then checkpoint. `op` must not write anything
    /// before its last fallible step. A failed checkpoint rolls the
    /// operation back.
    fn apply(
        &mut self,
        name: &'static str,
        actor: &str,
        required: Role,
        op: impl FnOnce(&mut Self) -> Result<ReportId>,
    ) -> Result<ReportId> {
        let rollback = self
            .store
            .is_some()
            .then(|| (self.reports.clone(), self.assignments.clone()));

        let id = self
            .authorize(actor, required)
            .and_then(|()| op(self))
            .inspect_err(|e| {
                tracing::debug!(operation = name, actor, error = %e, "workflow operation rejected");
            })?;

        tracing::info!(operation = name, actor, report = %id, "workflow operation applied");

        if let Err(e) = self.save() {
            tracing::warn!(operation = name, error = %e, "checkpoint failed; operation rolled back");
            if let Some((reports, assignments)) = rollback {
                self.reports = reports;
                self.assignments = assignments;
            }
            return Err(e);
        }
        Ok(id)
    }
}

fn ensure_assigned(
    assignments: &BTreeMap<String, ReportId>,
    developer: &str,
    id: ReportId,
) -> Result<()> {
    if assignments.get(developer) != Some(&id) {
        return Err(BugflowError::NotAssigned {
            developer: developer.to_string(),
            report: id,
        });
    }
    Ok(())
}

impl WorkflowEngine<Accounts> {
    pub fn register(&mut self, username: &str, credential: &str, role: Role) -> Result<()> {
        self.directory.register(username, credential, role)
    }

    pub fn login(&mut self, username: &str, credential: &str) -> Result<()> {
        self.directory.login(username, credential)
    }

    pub fn logout(&mut self, username: &str) -> Result<()> {
        self.directory.logout(username)
    }
}
