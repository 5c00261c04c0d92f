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

//! Client for the file mirror that stores the actual artifact bytes

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::store::Build;

const MIRROR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct LinkRequest<'a> {
    source: &'a str,
    targets: [&'a str; 1],
}

#[derive(Debug, Clone)]
pub struct MirrorClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl MirrorClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(MIRROR_TIMEOUT)
            .build()
            .context("Failed to build mirror HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Download location of a released file on the mirror.
    #[must_use]
    pub fn file_url(&self, project: &str, channel: &str, version: &str, file: &str) -> String {
        format!(
            "{}/api/v1/files/releases/{project}/{channel}/{version}/{file}",
            self.base_url
        )
    }

    /// Ask the mirror to expose `source` under `target` as well.
    pub async fn link(&self, source: &str, target: &str) -> Result<()> {
        let url = format!("{}/api/v1/link", self.base_url);
        let mut request = self.client.post(&url).json(&LinkRequest {
            source,
            targets: [target],
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to link {source} -> {target}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Mirror link {source} -> {target} returned {status}");
        }
        Ok(())
    }

    /// Link every file of `build` that already lives on the mirror under
    /// `builds/<project>/<build_number>/<path>`.
    pub async fn link_build_files(&self, build: &Build) -> usize {
        let mut linked = 0;
        for file in &build.files {
            let Some(source) = file.mirror_path.as_deref() else {
                continue;
            };
            let target = format!("builds/{}/{}/{}", build.project, build.build_number, file.path);
            match self.link(source, &target).await {
                Ok(()) => {
                    debug!(source, target = %target, "Mirror file linked");
                    linked += 1;
                }
                Err(e) => warn!(error = %e, "Mirror link failed"),
            }
        }
        linked
    }

    /// Fire-and-forget variant of [`Self::link_build_files`].
    pub fn spawn_link_build_files(&self, build: &Build) {
        if build.files.iter().all(|f| f.mirror_path.is_none()) {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!(project = %build.project, "No async runtime, mirror linking skipped");
            return;
        };

        let mirror = self.clone();
        let build = build.clone();
        handle.spawn(async move {
            let linked = mirror.link_build_files(&build).await;
            info!(
                project = %build.project,
                build_number = build.build_number,
                linked,
                "Mirror linking finished"
            );
        });
    }
}
