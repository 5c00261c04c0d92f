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

//! Promotion and rollback protocol over the stores, cache and event bus

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use fluxion_shared::version::{compare, parse_components};
use fluxion_shared::{Channel, Environment, LatestInfo};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::events::{EventBus, ReleaseEvent};
use crate::latest::LatestCache;
use crate::mirror::MirrorClient;
use crate::store::{
    Build, BuildIndexEntry, BuildStore, NewBuild, PromoteRequest, Release, ReleaseHistoryEntry,
    ReleaseStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub build_count: usize,
    pub projects: usize,
    pub release_count: usize,
}

/// Composition root for release metadata.
///
/// After `promote` or `rollback` returns, the release record, its history
/// entry and the latest-version cache all reflect the transition.
#[derive(Debug)]
pub struct ReleaseService {
    builds: Arc<BuildStore>,
    releases: Arc<ReleaseStore>,
    latest: Arc<LatestCache>,
    events: EventBus,
    mirror: Option<MirrorClient>,
    // Store write and cache update happen as one step per transition.
    transition: Mutex<()>,
}

impl ReleaseService {
    #[must_use]
    pub fn new(
        builds: Arc<BuildStore>,
        releases: Arc<ReleaseStore>,
        latest: Arc<LatestCache>,
        events: EventBus,
    ) -> Self {
        Self {
            builds,
            releases,
            latest,
            events,
            mirror: None,
            transition: Mutex::new(()),
        }
    }

    /// Open both stores under `data_dir` with an empty cache.
    pub fn open(data_dir: &Path, events: EventBus) -> Result<Self> {
        Ok(Self::new(
            Arc::new(BuildStore::open(data_dir)?),
            Arc::new(ReleaseStore::open(data_dir)?),
            Arc::new(LatestCache::new()),
            events,
        ))
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: MirrorClient) -> Self {
        self.mirror = Some(mirror);
        self
    }

    #[must_use]
    pub fn mirror(&self) -> Option<&MirrorClient> {
        self.mirror.as_ref()
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn latest_cache(&self) -> &LatestCache {
        &self.latest
    }

    /// Seed the cache from every current release on disk.
    pub fn warm_cache(&self) -> Result<usize> {
        let releases = self.releases.list_current_releases()?;
        let count = self.latest.seed(&releases);
        if count > 0 {
            info!(releases = count, "Latest-version cache warmed");
        }
        Ok(count)
    }

    pub fn create_build(&self, new: NewBuild) -> Result<Build> {
        let build = self.builds.create(new)?;

        self.events.emit(ReleaseEvent::BuildUploaded(build.clone()));
        if let Some(mirror) = &self.mirror {
            mirror.spawn_link_build_files(&build);
        }
        Ok(build)
    }

    pub fn get_build(&self, project: &str, build_number: u64) -> Result<Build> {
        self.builds.get(project, build_number)
    }

    pub fn list_builds(&self, project: &str) -> Result<Vec<BuildIndexEntry>> {
        self.builds.list(project)
    }

    /// Promote an existing build. Fails with `NotFound` if the build was
    /// never registered.
    pub fn promote(&self, request: PromoteRequest) -> Result<Release> {
        if request.version.trim().is_empty() {
            return Err(StoreError::InvalidArgument("version is required".to_owned()));
        }
        self.builds.get(&request.project, request.build_number)?;

        let channel = request.environment.channel();
        if let Err(e) = parse_components(request.version.trim()) {
            warn!(project = %request.project, error = %e, "Promoting a version that does not parse");
        }

        let guard = self.transition.lock();
        if let Some(current) = self.latest.get_latest(&request.project, channel)
            && compare(&request.version, &current.version) == Ordering::Less
        {
            warn!(
                project = %request.project,
                environment = %request.environment,
                current = %current.version,
                promoted = %request.version,
                "Promoting an older version than the current release"
            );
        }

        let project = request.project.clone();
        let environment = request.environment;
        let release = match self.releases.promote(request) {
            Ok(release) => release,
            Err(e) => {
                if e.is_storage() {
                    self.resync_latest(&project, environment);
                }
                return Err(e);
            }
        };
        self.latest.set_from_release(&release);
        drop(guard);

        self.events.emit(ReleaseEvent::ReleasePromoted(release.clone()));
        Ok(release)
    }

    pub fn rollback(
        &self,
        project: &str,
        environment: Environment,
        released_by: &str,
    ) -> Result<Release> {
        let guard = self.transition.lock();
        let release = match self.releases.rollback(project, environment, released_by) {
            Ok(release) => release,
            Err(e) => {
                if e.is_storage() {
                    self.resync_latest(project, environment);
                }
                return Err(e);
            }
        };
        self.latest.set_from_release(&release);
        drop(guard);

        self.events.emit(ReleaseEvent::ReleaseRolledBack {
            from_build: release.previous_build_number,
            release: release.clone(),
        });
        Ok(release)
    }

    /// Reload the current release after a transition failed part way, since
    /// the record may already have been replaced. Caller holds `transition`.
    fn resync_latest(&self, project: &str, environment: Environment) {
        match self.releases.get(project, environment) {
            Ok(release) => {
                warn!(
                    project,
                    environment = %environment,
                    build_number = release.build_number,
                    "Transition failed, latest-version cache resynced from store"
                );
                self.latest.set_from_release(&release);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                warn!(
                    project,
                    environment = %environment,
                    error = %e,
                    "Could not resync latest-version cache"
                );
            }
        }
    }

    pub fn get_release(&self, project: &str, environment: Environment) -> Result<Release> {
        self.releases.get(project, environment)
    }

    pub fn list_releases(&self, project: &str) -> Result<Vec<ReleaseHistoryEntry>> {
        self.releases.list(project)
    }

    /// Latest version for a polling client.
    ///
    /// Served from the cache; on a miss the release store is consulted and a
    /// hit is written back to the cache. `Ok(None)` means nothing was ever
    /// released on that channel.
    pub fn latest(&self, project: &str, channel: Channel) -> Result<Option<LatestInfo>> {
        if let Some(info) = self.latest.get_latest(project, channel) {
            return Ok(Some(info));
        }

        // A transition may finish between the store read and the write-back.
        let _guard = self.transition.lock();
        if let Some(info) = self.latest.get_latest(project, channel) {
            return Ok(Some(info));
        }
        match self.releases.get(project, channel.environment()) {
            Ok(release) => {
                debug!(project, channel = %channel, "Latest-version cache miss served from store");
                self.latest.set_from_release(&release);
                Ok(Some(LatestInfo {
                    version: release.version,
                    build_number: release.build_number,
                }))
            }
            Err(StoreError::NotFound(_) | StoreError::InvalidArgument(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn stats(&self) -> Result<ServiceStats> {
        let builds = self.builds.stats()?;
        Ok(ServiceStats {
            build_count: builds.build_count,
            projects: builds.projects,
            release_count: self.releases.stats()?,
        })
    }
}
