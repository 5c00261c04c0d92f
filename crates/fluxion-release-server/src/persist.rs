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

//! Atomic YAML persistence helpers.
//!
//! Every file is written to a sibling `.tmp` file, synced, then renamed over
//! the target, so readers never observe a half-written document.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};

pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::io("creating directory for", path, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::io("writing", &temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::io("renaming into place", path, e)
    })
}

pub(crate) fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value).map_err(|e| StoreError::yaml("encoding", path, e))?;
    write_atomic(path, content.as_bytes())
}

/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io("reading", path, e)),
    };
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::yaml("parsing", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_write_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("doc.yaml");

        write_yaml(
            &path,
            &Doc {
                name: "demo".to_owned(),
                count: 3,
            },
        )
        .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        let loaded: Doc = read_yaml(&path).unwrap().unwrap();
        assert_eq!(loaded.count, 3);
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.yaml");

        write_atomic(&path, b"name: one\ncount: 1\n").unwrap();
        write_atomic(&path, b"name: two\ncount: 2\n").unwrap();

        let loaded: Doc = read_yaml(&path).unwrap().unwrap();
        assert_eq!(loaded.name, "two");
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Doc> = read_yaml(&dir.path().join("missing.yaml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_read_corrupt_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "name: [unterminated").unwrap();

        let err = read_yaml::<Doc>(&path).unwrap_err();
        assert!(err.is_storage());
        assert!(matches!(err, StoreError::Yaml { .. }));
    }
}
