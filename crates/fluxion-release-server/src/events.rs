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

//! Build and release events, published in-process and to an optional webhook
//!
//! In-process consumers call [`EventBus::subscribe`]; the server binary runs
//! one of them, [`EventBus::spawn_audit_log`], which writes every event to the
//! log.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{Build, Release};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ReleaseEvent {
    #[serde(rename = "build.uploaded")]
    BuildUploaded(Build),
    #[serde(rename = "release.promoted")]
    ReleasePromoted(Release),
    #[serde(rename = "release.rolled-back")]
    ReleaseRolledBack { from_build: u64, release: Release },
}

impl ReleaseEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BuildUploaded(_) => "build.uploaded",
            Self::ReleasePromoted(_) => "release.promoted",
            Self::ReleaseRolledBack { .. } => "release.rolled-back",
        }
    }

    #[must_use]
    pub fn project(&self) -> &str {
        match self {
            Self::BuildUploaded(build) => &build.project,
            Self::ReleasePromoted(release) | Self::ReleaseRolledBack { release, .. } => {
                &release.project
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Webhook {
    url: String,
    client: reqwest::Client,
}

impl Webhook {
    async fn deliver(&self, event: &ReleaseEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .with_context(|| format!("Failed to POST event to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Webhook {} answered {status}", self.url);
        }
        Ok(())
    }
}

/// Fan-out point for store events.
///
/// Emitting never blocks and never fails: nobody listening is fine, and
/// webhook delivery runs on a detached task that only logs failures.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReleaseEvent>,
    webhook: Option<Webhook>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            webhook: None,
        }
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to build webhook HTTP client")?;
        self.webhook = Some(Webhook {
            url: url.into(),
            client,
        });
        Ok(self)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseEvent> {
        self.sender.subscribe()
    }

    /// Log every event until the last bus handle is dropped.
    ///
    /// The task resolves to the number of events it logged.
    pub fn spawn_audit_log(&self) -> JoinHandle<usize> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            let mut logged = 0;
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        logged += 1;
                        info!(
                            target: "fluxion_release_server::audit",
                            event = event.name(),
                            project = event.project(),
                            "{}",
                            serde_json::to_string(&event).unwrap_or_default()
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Audit log fell behind, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            logged
        })
    }

    pub fn emit(&self, event: ReleaseEvent) {
        debug!(event = event.name(), project = event.project(), "Emitting event");

        // An error only means there are no subscribers right now.
        let _ = self.sender.send(event.clone());

        let Some(webhook) = self.webhook.clone() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(event = event.name(), "No async runtime, webhook delivery skipped");
            return;
        };
        handle.spawn(async move {
            match webhook.deliver(&event).await {
                Ok(()) => info!(event = event.name(), url = %webhook.url, "Webhook delivered"),
                Err(e) => warn!(event = event.name(), error = %e, "Webhook delivery failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fluxion_shared::Environment;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn release() -> Release {
        Release {
            project: "demo".to_owned(),
            environment: Environment::Prod,
            build_number: 2,
            version: "1.1.0".to_owned(),
            released_by: "alice".to_owned(),
            released_at: Utc::now(),
            release_notes: None,
            previous_build_number: 1,
        }
    }

    #[test]
    fn test_event_json_shape() {
        let event = ReleaseEvent::ReleaseRolledBack {
            from_build: 2,
            release: release(),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "release.rolled-back");
        assert_eq!(value["data"]["from_build"], 2);
        assert_eq!(value["data"]["release"]["environment"], "prod");
        assert_eq!(event.project(), "demo");
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(ReleaseEvent::ReleasePromoted(release()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.name(), "release.promoted");
    }

    #[tokio::test]
    async fn test_audit_log_consumes_until_bus_is_dropped() {
        let bus = EventBus::new(8);
        let audit = bus.spawn_audit_log();

        bus.emit(ReleaseEvent::ReleasePromoted(release()));
        bus.emit(ReleaseEvent::ReleaseRolledBack {
            from_build: 2,
            release: release(),
        });
        drop(bus);

        let logged = tokio::time::timeout(Duration::from_secs(5), audit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logged, 2);
    }

    #[test]
    fn test_emit_without_subscribers_or_runtime() {
        let bus = EventBus::new(0)
            .with_webhook("http://127.0.0.1:9/unreachable")
            .unwrap();
        bus.emit(ReleaseEvent::ReleasePromoted(release()));
    }

    #[tokio::test]
    async fn test_webhook_receives_event() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::PartialJson(json!({
                "type": "release.promoted",
                "data": {"project": "demo", "build_number": 2}
            })))
            .with_status(204)
            .create_async()
            .await;

        let bus = EventBus::new(8)
            .with_webhook(format!("{}/hook", server.url()))
            .unwrap();
        bus.emit(ReleaseEvent::ReleasePromoted(release()));

        for _ in 0..100 {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_reported() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let webhook = Webhook {
            url: format!("{}/hook", server.url()),
            client: reqwest::Client::new(),
        };
        let result = webhook
            .deliver(&ReleaseEvent::ReleasePromoted(release()))
            .await;

        assert!(result.is_err());
        mock.assert_async().await;
    }
}
