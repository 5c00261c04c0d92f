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

//! Append-only registry of numbered, immutable builds

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{validate_build_number, validate_project};
use crate::error::{Result, StoreError};
use crate::persist::{read_yaml, write_yaml};

const INDEX_FILE: &str = "builds.yaml";
const BUILDS_DIR: &str = "builds";
const RECORD_FILE: &str = "build.yaml";

/// One uploaded artifact. The store only ever sees metadata, never bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    pub path: String,
    pub size: u64,
    pub sha256: String,
    /// Location of the bytes on the file mirror, if already pushed there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub project: String,
    pub build_number: u64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_meta: BTreeMap<String, String>,
    pub files: Vec<BuildFile>,
}

impl Build {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Summary row kept in `builds.yaml` for listing without reading every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIndexEntry {
    pub project: String,
    pub build_number: u64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_count: usize,
    pub total_bytes: u64,
}

impl From<&Build> for BuildIndexEntry {
    fn from(build: &Build) -> Self {
        Self {
            project: build.project.clone(),
            build_number: build.build_number,
            uploaded_by: build.uploaded_by.clone(),
            uploaded_at: build.uploaded_at,
            file_count: build.files.len(),
            total_bytes: build.total_bytes(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BuildIndex {
    #[serde(default)]
    builds: Vec<BuildIndexEntry>,
    /// Highest number per project held by a record that could not be read
    /// during a reindex. Such numbers are never handed out again.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    reserved: BTreeMap<String, u64>,
}

/// Parameters for registering a build; the store assigns number and timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBuild {
    pub project: String,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub source_meta: BTreeMap<String, String>,
    #[serde(default)]
    pub files: Vec<BuildFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub build_count: usize,
    pub projects: usize,
}

#[derive(Debug)]
pub struct BuildStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl BuildStore {
    /// Open the store rooted at `data_dir`, creating the directory if needed.
    ///
    /// A missing `builds.yaml` next to existing build records is regenerated
    /// from the records.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .map_err(|e| StoreError::io("creating data directory", &data_dir, e))?;

        let store = Self {
            data_dir,
            lock: Mutex::new(()),
        };

        if !store.index_path().exists() && store.data_dir.join(BUILDS_DIR).is_dir() {
            let _guard = store.lock.lock();
            let count = store.reindex_locked()?;
            warn!(builds = count, "Build index missing, regenerated from build records");
        }

        Ok(store)
    }

    fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    fn build_path(&self, project: &str, build_number: u64) -> PathBuf {
        self.data_dir
            .join(BUILDS_DIR)
            .join(project)
            .join(build_number.to_string())
            .join(RECORD_FILE)
    }

    fn load_index(&self) -> Result<BuildIndex> {
        Ok(read_yaml(&self.index_path())?.unwrap_or_default())
    }

    fn save_index(&self, index: &BuildIndex) -> Result<()> {
        write_yaml(&self.index_path(), index)
    }

    /// Register a new build and assign it the next number for its project.
    ///
    /// The record is written before the index, so a failed index write leaves
    /// an unreferenced record behind and the number is handed out again.
    pub fn create(&self, new: NewBuild) -> Result<Build> {
        validate_project(&new.project)?;
        let files = validate_files(new.files)?;

        let _guard = self.lock.lock();
        let mut index = self.load_index()?;
        let build_number = next_build_number(&index, &new.project);

        let build = Build {
            project: new.project,
            build_number,
            uploaded_by: new.uploaded_by,
            uploaded_at: Utc::now(),
            source: new.source.filter(|s| !s.is_empty()),
            source_ref: new.source_ref.filter(|s| !s.is_empty()),
            source_meta: new.source_meta,
            files,
        };

        write_yaml(&self.build_path(&build.project, build_number), &build)?;

        index.builds.push(BuildIndexEntry::from(&build));
        self.save_index(&index)?;

        info!(
            project = %build.project,
            build_number,
            files = build.files.len(),
            total_bytes = build.total_bytes(),
            "Build registered"
        );
        Ok(build)
    }

    pub fn get(&self, project: &str, build_number: u64) -> Result<Build> {
        validate_project(project)?;
        validate_build_number(build_number)?;

        let _guard = self.lock.lock();
        read_yaml(&self.build_path(project, build_number))?
            .ok_or_else(|| StoreError::NotFound(format!("build {project}/{build_number}")))
    }

    /// All builds of `project` in creation order.
    pub fn list(&self, project: &str) -> Result<Vec<BuildIndexEntry>> {
        let _guard = self.lock.lock();
        let index = self.load_index()?;
        Ok(index
            .builds
            .into_iter()
            .filter(|e| e.project == project)
            .collect())
    }

    pub fn stats(&self) -> Result<BuildStats> {
        let _guard = self.lock.lock();
        let index = self.load_index()?;
        let projects: HashSet<&str> = index.builds.iter().map(|e| e.project.as_str()).collect();
        Ok(BuildStats {
            build_count: index.builds.len(),
            projects: projects.len(),
        })
    }

    /// Rebuild `builds.yaml` by scanning every build record on disk.
    ///
    /// Unreadable records are skipped with a warning. Returns the number of
    /// indexed builds.
    pub fn reindex(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        self.reindex_locked()
    }

    fn reindex_locked(&self) -> Result<usize> {
        let root = self.data_dir.join(BUILDS_DIR);
        let mut entries = Vec::new();
        let mut reserved = BTreeMap::new();

        let projects = match fs::read_dir(&root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.save_index(&BuildIndex::default())?;
                return Ok(0);
            }
            Err(e) => return Err(StoreError::io("scanning", &root, e)),
        };

        for project_dir in projects.flatten() {
            let Ok(numbers) = fs::read_dir(project_dir.path()) else {
                continue;
            };
            let project = project_dir.file_name().to_string_lossy().into_owned();
            for number_dir in numbers.flatten() {
                let path = number_dir.path().join(RECORD_FILE);
                match read_yaml::<Build>(&path) {
                    Ok(Some(build)) => entries.push(BuildIndexEntry::from(&build)),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable build record");
                        let number = number_dir.file_name().to_string_lossy().parse::<u64>();
                        if let Ok(number) = number {
                            let highest = reserved.entry(project.clone()).or_insert(0);
                            *highest = (*highest).max(number);
                        }
                    }
                }
            }
        }

        entries.sort_by(|a, b| {
            a.uploaded_at
                .cmp(&b.uploaded_at)
                .then_with(|| a.project.cmp(&b.project))
                .then_with(|| a.build_number.cmp(&b.build_number))
        });

        let count = entries.len();
        self.save_index(&BuildIndex {
            builds: entries,
            reserved,
        })?;
        Ok(count)
    }
}

fn next_build_number(index: &BuildIndex, project: &str) -> u64 {
    let indexed = index
        .builds
        .iter()
        .filter(|e| e.project == project)
        .map(|e| e.build_number)
        .max()
        .unwrap_or(0);
    let reserved = index.reserved.get(project).copied().unwrap_or(0);
    indexed.max(reserved) + 1
}

fn validate_files(files: Vec<BuildFile>) -> Result<Vec<BuildFile>> {
    if files.is_empty() {
        return Err(StoreError::InvalidArgument(
            "at least one file is required".to_owned(),
        ));
    }

    files
        .into_iter()
        .map(|mut file| {
            if file.path.is_empty()
                || file.path.starts_with('/')
                || file.path.split(['/', '\\']).any(|part| part == "..")
            {
                return Err(StoreError::InvalidArgument(format!(
                    "invalid file path: {:?}",
                    file.path
                )));
            }
            if file.sha256.len() != 64 || !file.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(StoreError::InvalidArgument(format!(
                    "invalid sha256 for {}: expected 64 hex characters",
                    file.path
                )));
            }
            file.sha256.make_ascii_lowercase();
            file.mirror_path = file.mirror_path.filter(|p| !p.is_empty());
            Ok(file)
        })
        .collect()
}
