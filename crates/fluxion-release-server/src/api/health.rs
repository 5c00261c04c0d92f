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

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::service::ServiceStats;

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    stats: Option<ServiceStats>,
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state
        .service
        .stats()
        .inspect_err(|e| warn!(error = %e, "Failed to collect store stats"))
        .ok();

    Json(HealthResponse {
        status: if stats.is_some() { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        stats,
    })
}
