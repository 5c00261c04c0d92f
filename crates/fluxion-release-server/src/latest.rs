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

//! In-memory latest-version map serving the polling hot path

use std::collections::HashMap;

use fluxion_shared::{Channel, LatestInfo};
use parking_lot::RwLock;

use crate::store::Release;

/// Current release per (project, channel).
///
/// Writers only replace whole entries, so a reader never sees a version from
/// one release paired with the build number of another.
#[derive(Debug, Default)]
pub struct LatestCache {
    entries: RwLock<HashMap<String, HashMap<Channel, LatestInfo>>>,
}

impl LatestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, project: &str, channel: Channel, version: &str, build_number: u64) {
        let info = LatestInfo {
            version: version.to_owned(),
            build_number,
        };
        self.entries
            .write()
            .entry(project.to_owned())
            .or_default()
            .insert(channel, info);
    }

    #[must_use]
    pub fn get_latest(&self, project: &str, channel: Channel) -> Option<LatestInfo> {
        self.entries
            .read()
            .get(project)
            .and_then(|channels| channels.get(&channel))
            .cloned()
    }

    pub fn set_from_release(&self, release: &Release) {
        self.set_latest(
            &release.project,
            release.environment.channel(),
            &release.version,
            release.build_number,
        );
    }

    /// Load every current release; returns how many entries were written.
    pub fn seed<'a>(&self, releases: impl IntoIterator<Item = &'a Release>) -> usize {
        let mut count = 0;
        for release in releases {
            self.set_from_release(release);
            count += 1;
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fluxion_shared::Environment;
    use std::sync::Arc;

    fn release(project: &str, environment: Environment, build_number: u64, version: &str) -> Release {
        Release {
            project: project.to_owned(),
            environment,
            build_number,
            version: version.to_owned(),
            released_by: "ci".to_owned(),
            released_at: Utc::now(),
            release_notes: None,
            previous_build_number: 0,
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = LatestCache::new();
        assert!(cache.get_latest("demo", Channel::Production).is_none());

        cache.set_latest("demo", Channel::Production, "1.0.0", 1);
        let info = cache.get_latest("demo", Channel::Production).unwrap();
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.build_number, 1);
        assert!(cache.get_latest("demo", Channel::Staging).is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let cache = LatestCache::new();
        cache.set_latest("demo", Channel::Dev, "1.0.0", 1);
        cache.set_latest("demo", Channel::Dev, "0.9.0", 7);

        let info = cache.get_latest("demo", Channel::Dev).unwrap();
        assert_eq!((info.version.as_str(), info.build_number), ("0.9.0", 7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_seed_maps_environment_to_channel() {
        let cache = LatestCache::new();
        let releases = vec![
            release("demo", Environment::Prod, 3, "1.2.0"),
            release("demo", Environment::Staging, 4, "1.3.0-rc1"),
            release("other", Environment::Dev, 1, "0.1.0"),
        ];

        assert_eq!(cache.seed(&releases), 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.get_latest("demo", Channel::Production).unwrap().build_number,
            3
        );
        assert_eq!(
            cache.get_latest("demo", Channel::Staging).unwrap().version,
            "1.3.0-rc1"
        );
    }

    #[test]
    fn test_concurrent_readers_see_consistent_pairs() {
        let cache = Arc::new(LatestCache::new());
        cache.set_latest("demo", Channel::Production, "1", 1);

        std::thread::scope(|scope| {
            let writer = Arc::clone(&cache);
            scope.spawn(move || {
                for n in 2..200_u64 {
                    writer.set_latest("demo", Channel::Production, &n.to_string(), n);
                }
            });
            for _ in 0..4 {
                let reader = Arc::clone(&cache);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let info = reader.get_latest("demo", Channel::Production).unwrap();
                        assert_eq!(info.version, info.build_number.to_string());
                    }
                });
            }
        });
    }
}
