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

//! Configuration for polling a release server

use std::path::{Path, PathBuf};

use fluxion_shared::Channel;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

fn default_channel() -> Channel {
    Channel::Production
}

fn default_3600() -> u64 {
    3600
}

fn default_30() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Release server root, e.g. `https://releases.example.com`
    pub base_url: String,

    pub project: String,

    #[serde(default = "default_channel")]
    pub channel: Channel,

    /// Version the running binary was built as
    pub current_version: String,

    /// How often `spawn_auto_check` polls (seconds)
    #[serde(default = "default_3600")]
    pub check_interval_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_30")]
    pub timeout_secs: u64,

    /// Install updates found by `spawn_auto_check` instead of only logging them
    #[serde(default)]
    pub auto_apply: bool,

    /// Binary replaced by `perform_update`; the running executable when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        project: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project: project.into(),
            channel: default_channel(),
            current_version: current_version.into(),
            check_interval_secs: default_3600(),
            timeout_secs: default_30(),
            auto_apply: false,
            install_path: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.project.is_empty() {
            return Err(ClientError::Config("project is required".to_owned()));
        }
        if self.current_version.is_empty() {
            return Err(ClientError::Config("current_version is required".to_owned()));
        }
        if self.check_interval_secs == 0 || self.timeout_secs == 0 {
            return Err(ClientError::Config(
                "check_interval_secs and timeout_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
