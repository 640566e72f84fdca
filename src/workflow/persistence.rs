//! Snapshot persistence for the workflow engine.
//!
//! The engine hands a [`Snapshot`] to its [`SnapshotStore`] after every
//! committed mutation and asks for one back once at startup. The encoding is
//! the store's business; [`JsonFileStore`] writes pretty JSON atomically
//! (`<file>.tmp` sibling, then `rename`).

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::state_machine::{Report, ReportId, State};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the engine needs to come back to life: reports in id order and
/// the developer → report assignment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub assignments: BTreeMap<String, ReportId>,
}

impl Snapshot {
    pub fn new(reports: Vec<Report>, assignments: BTreeMap<String, ReportId>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            reports,
            assignments,
        }
    }

    /// Check the invariants a restored engine relies on.
    ///
    /// Ids must run 0, 1, 2, … in order, every report must be internally
    /// consistent, and assignments must pair one-to-one with IN_PROGRESS reports.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::Inconsistent(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }

        for (expected, report) in (0u64..).zip(&self.reports) {
            if report.id() != ReportId(expected) {
                return Err(StorageError::Inconsistent(format!(
                    "expected report #{expected}, found {}",
                    report.id()
                )));
            }
            if !report.is_consistent() {
                return Err(StorageError::Inconsistent(format!(
                    "report {} has state {} with resolution {}",
                    report.id(),
                    report.state(),
                    report.resolution()
                )));
            }
        }

        let mut claimed = HashSet::new();
        for (developer, id) in &self.assignments {
            let state = usize::try_from(id.0)
                .ok()
                .and_then(|idx| self.reports.get(idx))
                .map(Report::state);
            if state != Some(State::InProgress) {
                return Err(StorageError::Inconsistent(format!(
                    "{developer} is assigned to {id}, which is not in progress"
                )));
            }
            if !claimed.insert(*id) {
                return Err(StorageError::Inconsistent(format!(
                    "report {id} is assigned to more than one developer"
                )));
            }
        }

        if let Some(orphan) = self
            .reports
            .iter()
            .find(|r| r.state() == State::InProgress && !claimed.contains(&r.id()))
        {
            return Err(StorageError::Inconsistent(format!(
                "report {} is in progress without a developer",
                orphan.id()
            )));
        }
        Ok(())
    }
}

/// Persistence collaborator consumed by the engine.
///
/// `load` only decodes; the engine runs [`Snapshot::validate`] on the result.
pub trait SnapshotStore {
    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError>;

    fn load(&self) -> Result<Snapshot, StorageError>;
}

/// Stores the snapshot as a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotFound {
                path: self.path.clone(),
            });
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Resolution;
    use tempfile::TempDir;

    fn in_progress(id: i64) -> Report {
        let mut report = Report::new(id, "slow startup").unwrap();
        report.confirm().unwrap();
        report.start_progress().unwrap();
        report
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("bugs.json"));

        let mut fixed = in_progress(1);
        fixed.resolve(Resolution::Fixed, "cache warmed").unwrap();
        let snapshot = Snapshot::new(
            vec![in_progress(0), fixed],
            BTreeMap::from([("dev".to_string(), ReportId(0))]),
        );
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bugs.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn gap_in_ids_is_rejected() {
        let snapshot = Snapshot::new(vec![in_progress(1)], BTreeMap::new());
        assert!(matches!(
            snapshot.validate(),
            Err(StorageError::Inconsistent(_))
        ));
    }

    #[test]
    fn assignment_to_idle_report_is_rejected() {
        let mut report = in_progress(0);
        report.stop_progress().unwrap();
        let snapshot = Snapshot::new(
            vec![report],
            BTreeMap::from([("dev".to_string(), ReportId(0))]),
        );
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn shared_assignment_is_rejected() {
        let snapshot = Snapshot::new(
            vec![in_progress(0)],
            BTreeMap::from([
                ("alice".to_string(), ReportId(0)),
                ("bob".to_string(), ReportId(0)),
            ]),
        );
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn in_progress_report_without_developer_is_rejected() {
        let snapshot = Snapshot::new(vec![in_progress(0)], BTreeMap::new());
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, StorageError::Inconsistent(ref msg) if msg.contains("#0")));
    }

    #[test]
    fn failed_rename_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bugs.json");
        std::fs::create_dir(&path).unwrap();
        let store = JsonFileStore::new(&path);

        let snapshot = Snapshot::new(vec![], BTreeMap::new());
        assert!(store.save(&snapshot).is_err());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn load_does_not_validate() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("bugs.json"));
        let snapshot = Snapshot::new(vec![in_progress(0)], BTreeMap::new());
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.validate().is_err());
    }

    #[test]
    fn dangling_assignment_is_rejected() {
        let snapshot = Snapshot::new(
            vec![],
            BTreeMap::from([("dev".to_string(), ReportId(4))]),
        );
        assert!(snapshot.validate().is_err());
    }
}
