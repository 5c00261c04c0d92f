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

//! Polls `latest.json`, reports whether a newer release is published and
//! installs it on request

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fluxion_shared::LatestInfo;
use fluxion_shared::version::is_newer;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::checksum::{parse_sha256sums, verify_file};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::installer::{
    binary_name, download_to_file, make_executable, replace_binary, staging_path,
};

const USER_AGENT: &str = concat!("fluxion-release-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub build_number: u64,
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate(UpdateInfo),
    Installed { info: UpdateInfo, backup: PathBuf },
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    config: ClientConfig,
    client: reqwest::Client,
}

impl UpdateChecker {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn channel_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project,
            self.config.channel
        )
    }

    #[must_use]
    pub fn latest_url(&self) -> String {
        format!("{}/latest.json", self.channel_url())
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::Request(format!("Failed to read response: {e}")))
    }

    /// Fetch `latest.json` and compare it with the running version.
    ///
    /// A 404 means nothing has been released on the channel yet.
    pub async fn check_for_update(&self) -> Result<UpdateInfo> {
        let url = self.latest_url();
        let body = match self.get_text(&url).await {
            Ok(body) => body,
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(ClientError::NoRelease {
                    project: self.config.project.clone(),
                    channel: self.config.channel.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let latest: LatestInfo = serde_json::from_str(&body)?;

        let latest_version = strip_v(&latest.version).to_owned();
        let current_version = strip_v(&self.config.current_version).to_owned();
        let available = is_newer(&latest_version, &current_version);
        debug!(current = %current_version, latest = %latest_version, available, "Update check");

        Ok(UpdateInfo {
            current_version,
            latest_version,
            build_number: latest.build_number,
            available,
            checked_at: Utc::now(),
        })
    }

    /// Check a downloaded file against the published `SHA256SUMS` of `version`.
    pub async fn verify_download(&self, path: &Path, file_name: &str, version: &str) -> Result<()> {
        let url = format!("{}/{version}/SHA256SUMS", self.channel_url());
        let sums = self.get_text(&url).await?;
        let expected = parse_sha256sums(&sums, file_name)
            .ok_or_else(|| ClientError::ChecksumMissing(file_name.to_owned()))?;
        verify_file(path, &expected)
    }

    /// Binary that `perform_update` replaces.
    pub fn install_target(&self) -> Result<PathBuf> {
        match &self.config.install_path {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_exe()?.canonicalize()?),
        }
    }

    /// Check for a newer release and, if there is one, install it over
    /// [`install_target`](Self::install_target).
    ///
    /// The binary is downloaded next to the target, checked against the
    /// release's `SHA256SUMS`, and renamed into place. The previous binary is
    /// kept with a `.backup` suffix. Restarting is up to the caller.
    pub async fn perform_update(&self) -> Result<UpdateOutcome> {
        let info = self.check_for_update().await?;
        if !info.available {
            return Ok(UpdateOutcome::UpToDate(info));
        }
        let target = self.install_target()?;
        let backup = self.install(&info, &target).await?;
        Ok(UpdateOutcome::Installed { info, backup })
    }

    async fn install(&self, info: &UpdateInfo, target: &Path) -> Result<PathBuf> {
        let release_dir = format!("v{}", info.latest_version);
        let name = binary_name(&self.config.project);
        let url = format!("{}/{release_dir}/{name}", self.channel_url());
        let staged = staging_path(target);

        info!(
            project = %self.config.project,
            version = %info.latest_version,
            url = %url,
            "Downloading update"
        );
        let result = async {
            let actual = download_to_file(&self.client, &url, &staged).await?;
            let sums = self
                .get_text(&format!("{}/{release_dir}/SHA256SUMS", self.channel_url()))
                .await?;
            let expected = parse_sha256sums(&sums, &name)
                .ok_or_else(|| ClientError::ChecksumMissing(name.clone()))?;
            if !actual.eq_ignore_ascii_case(&expected) {
                return Err(ClientError::ChecksumMismatch { expected, actual });
            }
            make_executable(&staged)?;
            replace_binary(&staged, target)
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&staged);
        }
        result
    }

    /// Poll in the background every `check_interval_secs`. Updates are only
    /// logged unless `auto_apply` is set, in which case they are installed.
    #[must_use]
    pub fn spawn_auto_check(self) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.check_interval_secs);
        tokio::spawn(self.run_auto_check(period))
    }

    async fn run_auto_check(mut self, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let info = match self.check_for_update().await {
                Ok(info) if info.available => info,
                Ok(_) => {
                    debug!(project = %self.config.project, "Already on the latest version");
                    continue;
                }
                Err(e) => {
                    warn!(project = %self.config.project, error = %e, "Update check failed");
                    continue;
                }
            };

            info!(
                project = %self.config.project,
                current = %info.current_version,
                latest = %info.latest_version,
                build_number = info.build_number,
                "Update available"
            );
            if !self.config.auto_apply {
                continue;
            }

            let installed = match self.install_target() {
                Ok(target) => self.install(&info, &target).await,
                Err(e) => Err(e),
            };
            match installed {
                Ok(backup) => {
                    info!(
                        project = %self.config.project,
                        version = %info.latest_version,
                        backup = %backup.display(),
                        "Update installed, restart to run it"
                    );
                    // Until the restart the installed binary is the new one.
                    self.config.current_version = info.latest_version;
                }
                Err(e) => warn!(project = %self.config.project, error = %e, "Auto-update failed"),
            }
        }
    }
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}
