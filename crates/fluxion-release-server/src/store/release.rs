// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Current release per (project, environment) plus the promotion history

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fluxion_shared::Environment;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{validate_build_number, validate_project};
use crate::error::{Result, StoreError};
use crate::persist::{read_yaml, write_yaml};

const HISTORY_FILE: &str = "releases.yaml";
const RELEASES_DIR: &str = "releases";
const RECORD_FILE: &str = "release.yaml";

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// The build currently live for one project and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub project: String,
    pub environment: Environment,
    pub build_number: u64,
    pub version: String,
    pub released_by: String,
    pub released_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    /// Build that was live before this transition, 0 when there was none.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub previous_build_number: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    #[default]
    Promote,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHistoryEntry {
    pub project: String,
    pub environment: Environment,
    pub build_number: u64,
    pub version: String,
    pub released_by: String,
    pub released_at: DateTime<Utc>,
    #[serde(default)]
    pub kind: ReleaseKind,
}

impl ReleaseHistoryEntry {
    fn new(release: &Release, kind: ReleaseKind) -> Self {
        Self {
            project: release.project.clone(),
            environment: release.environment,
            build_number: release.build_number,
            version: release.version.clone(),
            released_by: release.released_by.clone(),
            released_at: release.released_at,
            kind,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReleaseHistory {
    #[serde(default)]
    releases: Vec<ReleaseHistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromoteRequest {
    pub project: String,
    pub environment: Environment,
    pub build_number: u64,
    pub version: String,
    #[serde(default)]
    pub released_by: String,
    #[serde(default)]
    pub release_notes: Option<String>,
}

#[derive(Debug)]
pub struct ReleaseStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl ReleaseStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .map_err(|e| StoreError::io("creating data directory", &data_dir, e))?;
        Ok(Self {
            data_dir,
            lock: Mutex::new(()),
        })
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    fn release_path(&self, project: &str, environment: Environment) -> PathBuf {
        self.data_dir
            .join(RELEASES_DIR)
            .join(project)
            .join(environment.as_str())
            .join(RECORD_FILE)
    }

    fn load_history(&self) -> Result<ReleaseHistory> {
        Ok(read_yaml(&self.history_path())?.unwrap_or_default())
    }

    fn append_history(&self, entry: ReleaseHistoryEntry) -> Result<()> {
        let mut history = self.load_history()?;
        history.releases.push(entry);
        write_yaml(&self.history_path(), &history)
    }

    /// Make `build_number` the current release of the environment.
    ///
    /// Build existence is not checked here; callers that need it go through
    /// the release service.
    pub fn promote(&self, request: PromoteRequest) -> Result<Release> {
        validate_project(&request.project)?;
        validate_build_number(request.build_number)?;
        let version = request.version.trim();
        if version.is_empty() {
            return Err(StoreError::InvalidArgument("version is required".to_owned()));
        }

        let _guard = self.lock.lock();
        let path = self.release_path(&request.project, request.environment);
        let current: Option<Release> = read_yaml(&path)?;

        let release = Release {
            project: request.project,
            environment: request.environment,
            build_number: request.build_number,
            version: version.to_owned(),
            released_by: request.released_by,
            released_at: Utc::now(),
            release_notes: request.release_notes.filter(|n| !n.is_empty()),
            previous_build_number: current.map_or(0, |r| r.build_number),
        };

        write_yaml(&path, &release)?;
        self.append_history(ReleaseHistoryEntry::new(&release, ReleaseKind::Promote))?;

        info!(
            project = %release.project,
            environment = %release.environment,
            build_number = release.build_number,
            version = %release.version,
            previous_build_number = release.previous_build_number,
            "Release promoted"
        );
        Ok(release)
    }

    /// Swap the current and previous build of the environment.
    ///
    /// Only one level deep: rolling back twice returns to where it started.
    pub fn rollback(
        &self,
        project: &str,
        environment: Environment,
        released_by: &str,
    ) -> Result<Release> {
        validate_project(project)?;

        let _guard = self.lock.lock();
        let path = self.release_path(project, environment);
        let current: Release = read_yaml(&path)?.ok_or_else(|| {
            StoreError::Precondition(format!("no current release for {project}/{environment}"))
        })?;

        if current.previous_build_number == 0 {
            return Err(StoreError::Precondition(format!(
                "no previous build to roll back to for {project}/{environment}"
            )));
        }

        let history = self.load_history()?;
        let version = previous_version(&history, &current).unwrap_or_else(|| {
            warn!(
                project,
                environment = %environment,
                build_number = current.previous_build_number,
                "No history entry for rollback target, reusing current version"
            );
            current.version.clone()
        });

        let release = Release {
            project: project.to_owned(),
            environment,
            build_number: current.previous_build_number,
            version,
            released_by: released_by.to_owned(),
            released_at: Utc::now(),
            release_notes: Some(format!("Rollback from build {}", current.build_number)),
            previous_build_number: current.build_number,
        };

        write_yaml(&path, &release)?;
        self.append_history(ReleaseHistoryEntry::new(&release, ReleaseKind::Rollback))?;

        info!(
            project,
            environment = %environment,
            from_build = current.build_number,
            to_build = release.build_number,
            version = %release.version,
            "Release rolled back"
        );
        Ok(release)
    }

    pub fn get(&self, project: &str, environment: Environment) -> Result<Release> {
        validate_project(project)?;

        let _guard = self.lock.lock();
        read_yaml(&self.release_path(project, environment))?
            .ok_or_else(|| StoreError::NotFound(format!("release {project}/{environment}")))
    }

    /// Promotion history of `project`, oldest first.
    pub fn list(&self, project: &str) -> Result<Vec<ReleaseHistoryEntry>> {
        let _guard = self.lock.lock();
        Ok(self
            .load_history()?
            .releases
            .into_iter()
            .filter(|e| e.project == project)
            .collect())
    }

    /// Every current release on disk, sorted by project then environment.
    ///
    /// Records that cannot be read are skipped with a warning so one bad file
    /// does not keep the server from starting.
    pub fn list_current_releases(&self) -> Result<Vec<Release>> {
        let _guard = self.lock.lock();
        let root = self.data_dir.join(RELEASES_DIR);

        let projects = match fs::read_dir(&root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("scanning", &root, e)),
        };

        let mut releases = Vec::new();
        for project_dir in projects.flatten() {
            for environment in Environment::ALL {
                let path = project_dir.path().join(environment.as_str()).join(RECORD_FILE);
                if let Some(release) = read_release_logged(&path) {
                    releases.push(release);
                }
            }
        }

        releases.sort_by(|a, b| {
            a.project
                .cmp(&b.project)
                .then_with(|| a.environment.cmp(&b.environment))
        });
        Ok(releases)
    }

    /// Number of promotion and rollback events recorded so far.
    pub fn stats(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        Ok(self.load_history()?.releases.len())
    }
}

fn read_release_logged(path: &Path) -> Option<Release> {
    match read_yaml::<Release>(path) {
        Ok(release) => release,
        Err(e) => {
            warn!(error = %e, "Skipping unreadable release record");
            None
        }
    }
}

/// Version last released under the rollback target build, newest entry first.
fn previous_version(history: &ReleaseHistory, current: &Release) -> Option<String> {
    history
        .releases
        .iter()
        .rev()
        .find(|e| {
            e.project == current.project
                && e.environment == current.environment
                && e.build_number == current.previous_build_number
        })
        .map(|e| e.version.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn promote(store: &ReleaseStore, build_number: u64, version: &str) -> Release {
        store
            .promote(PromoteRequest {
                project: "demo".to_owned(),
                environment: Environment::Prod,
                build_number,
                version: version.to_owned(),
                released_by: "alice".to_owned(),
                release_notes: None,
            })
            .unwrap()
    }

    #[test]
    fn test_promote_promote_rollback_scenario() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();

        promote(&store, 1, "1.0.0");
        let current = store.get("demo", Environment::Prod).unwrap();
        assert_eq!(current.build_number, 1);
        assert_eq!(current.version, "1.0.0");
        assert_eq!(current.previous_build_number, 0);

        promote(&store, 2, "1.1.0");
        let current = store.get("demo", Environment::Prod).unwrap();
        assert_eq!(current.build_number, 2);
        assert_eq!(current.previous_build_number, 1);

        let rolled = store.rollback("demo", Environment::Prod, "bob").unwrap();
        assert_eq!(rolled.build_number, 1);
        assert_eq!(rolled.version, "1.0.0");
        assert_eq!(rolled.previous_build_number, 2);
        assert_eq!(rolled.released_by, "bob");
        assert_eq!(rolled.release_notes.as_deref(), Some("Rollback from build 2"));
        assert_eq!(store.get("demo", Environment::Prod).unwrap(), rolled);
    }

    #[test]
    fn test_rollback_is_single_level() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        promote(&store, 1, "1.0.0");
        promote(&store, 2, "1.1.0");
        promote(&store, 3, "1.2.0");

        let first = store.rollback("demo", Environment::Prod, "ops").unwrap();
        assert_eq!((first.build_number, first.version.as_str()), (2, "1.1.0"));

        // Second rollback toggles back instead of walking further into history.
        let second = store.rollback("demo", Environment::Prod, "ops").unwrap();
        assert_eq!((second.build_number, second.version.as_str()), (3, "1.2.0"));
        assert_eq!(second.previous_build_number, 2);
    }

    #[test]
    fn test_rollback_without_previous_build_fails() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.rollback("demo", Environment::Prod, "ops"),
            Err(StoreError::Precondition(_))
        ));

        promote(&store, 1, "1.0.0");
        assert!(matches!(
            store.rollback("demo", Environment::Prod, "ops"),
            Err(StoreError::Precondition(_))
        ));
        assert_eq!(store.stats().unwrap(), 1);
    }

    #[test]
    fn test_rollback_falls_back_to_current_version_without_history() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        promote(&store, 1, "1.0.0");
        promote(&store, 2, "1.1.0");
        std::fs::remove_file(dir.path().join("releases.yaml")).unwrap();

        let rolled = store.rollback("demo", Environment::Prod, "ops").unwrap();
        assert_eq!(rolled.build_number, 1);
        assert_eq!(rolled.version, "1.1.0");
    }

    #[test]
    fn test_history_lists_every_transition_in_order() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        promote(&store, 1, "1.0.0");
        promote(&store, 2, "1.1.0");
        store.rollback("demo", Environment::Prod, "ops").unwrap();

        let history = store.list("demo").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|e| e.build_number).collect::<Vec<_>>(),
            vec![1, 2, 1]
        );
        assert_eq!(history[0].kind, ReleaseKind::Promote);
        assert_eq!(history[2].kind, ReleaseKind::Rollback);
        assert!(history.windows(2).all(|w| w[0].released_at <= w[1].released_at));
        assert!(store.list("other").unwrap().is_empty());
    }

    #[test]
    fn test_environments_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        promote(&store, 1, "1.0.0");
        store
            .promote(PromoteRequest {
                project: "demo".to_owned(),
                environment: Environment::Staging,
                build_number: 5,
                version: "2.0.0-rc1".to_owned(),
                released_by: "ci".to_owned(),
                release_notes: Some("candidate".to_owned()),
            })
            .unwrap();

        let staging = store.get("demo", Environment::Staging).unwrap();
        assert_eq!(staging.previous_build_number, 0);
        assert_eq!(staging.release_notes.as_deref(), Some("candidate"));
        assert_eq!(store.get("demo", Environment::Prod).unwrap().build_number, 1);
        assert!(matches!(
            store.get("demo", Environment::Dev),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_promote_rejects_invalid_requests() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        let base = PromoteRequest {
            project: "demo".to_owned(),
            environment: Environment::Dev,
            build_number: 1,
            version: "1.0.0".to_owned(),
            released_by: String::new(),
            release_notes: None,
        };

        let mut no_version = base.clone();
        no_version.version = "  ".to_owned();
        let mut zero_build = base.clone();
        zero_build.build_number = 0;
        let mut bad_project = base;
        bad_project.project = "a/b".to_owned();

        for request in [no_version, zero_build, bad_project] {
            assert!(matches!(
                store.promote(request),
                Err(StoreError::InvalidArgument(_))
            ));
        }
        assert_eq!(store.stats().unwrap(), 0);
    }

    #[test]
    fn test_list_current_releases_skips_corrupt_records() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        assert!(store.list_current_releases().unwrap().is_empty());

        promote(&store, 1, "1.0.0");
        for project in ["alpha", "broken"] {
            store
                .promote(PromoteRequest {
                    project: project.to_owned(),
                    environment: Environment::Dev,
                    build_number: 1,
                    version: "0.1.0".to_owned(),
                    released_by: String::new(),
                    release_notes: None,
                })
                .unwrap();
        }
        std::fs::write(
            dir.path().join("releases/broken/dev/release.yaml"),
            "build_number: [",
        )
        .unwrap();

        let releases = store.list_current_releases().unwrap();
        let keys: Vec<_> = releases
            .iter()
            .map(|r| (r.project.as_str(), r.environment))
            .collect();
        assert_eq!(keys, vec![("alpha", Environment::Dev), ("demo", Environment::Prod)]);
    }

    #[test]
    fn test_first_release_omits_previous_build_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        promote(&store, 1, "1.0.0");

        let raw = std::fs::read_to_string(dir.path().join("releases/demo/prod/release.yaml"))
            .unwrap();
        assert!(raw.contains("environment: prod"));
        assert!(!raw.contains("previous_build_number"));
    }
}
