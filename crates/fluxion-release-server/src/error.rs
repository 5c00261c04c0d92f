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

//! Error taxonomy for the build and release stores

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    /// The operation is valid in general but not in the current state.
    #[error("{0}")]
    Precondition(String),

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[error("{context} {path}: {source}")]
    Yaml {
        context: &'static str,
        path: String,
        source: serde_yaml::Error,
    },
}

impl StoreError {
    pub(crate) fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn yaml(context: &'static str, path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            context,
            path: path.display().to_string(),
            source,
        }
    }

    /// True for persistence failures, as opposed to caller mistakes.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Yaml { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
