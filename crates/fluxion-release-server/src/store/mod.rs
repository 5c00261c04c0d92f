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

//! YAML-backed build and release metadata stores.
//!
//! Layout under the data root:
//!
//! ```text
//! builds.yaml                                   index of every build
//! builds/<project>/<build_number>/build.yaml    full build record
//! releases.yaml                                 promotion/rollback history
//! releases/<project>/<environment>/release.yaml current release
//! ```
//!
//! Each store serializes all of its operations behind one mutex. The data
//! root must only be written by a single process.

pub mod build;
pub mod release;

pub use build::{Build, BuildFile, BuildIndexEntry, BuildStats, BuildStore, NewBuild};
pub use release::{PromoteRequest, Release, ReleaseHistoryEntry, ReleaseKind, ReleaseStore};

use crate::error::{Result, StoreError};

/// Project names become directory names, so they are restricted to
/// `[A-Za-z0-9][A-Za-z0-9._-]*`.
pub fn validate_project(project: &str) -> Result<()> {
    if project.is_empty() {
        return Err(StoreError::InvalidArgument("project is required".to_owned()));
    }
    if !is_valid_name(project) {
        return Err(StoreError::InvalidArgument(format!(
            "invalid project name: {project:?}"
        )));
    }
    Ok(())
}

pub fn validate_build_number(build_number: u64) -> Result<()> {
    if build_number == 0 {
        return Err(StoreError::InvalidArgument(
            "build_number must be positive".to_owned(),
        ));
    }
    Ok(())
}

/// Same character rules as project names; used for versions and file names
/// that end up in URLs.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
