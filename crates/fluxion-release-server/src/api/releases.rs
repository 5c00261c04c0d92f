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
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use fluxion_shared::Environment;
use serde::Deserialize;

use super::builds::ProjectQuery;
use super::{ApiError, ApiResult, AppState, Authorized};
use crate::store::{PromoteRequest, Release, ReleaseHistoryEntry};

#[derive(Debug, Deserialize)]
pub(super) struct PromoteBody {
    #[serde(default)]
    project: String,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    build_number: u64,
    #[serde(default)]
    version: String,
    #[serde(default)]
    released_by: String,
    #[serde(default)]
    release_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RollbackBody {
    #[serde(default)]
    project: String,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    rolled_back_by: String,
}

fn parse_environment(raw: &str) -> ApiResult<Environment> {
    raw.parse()
        .map_err(|e: fluxion_shared::ParseEnvironmentError| ApiError::BadRequest(e.to_string()))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn promote(
    _auth: Authorized,
    State(state): State<AppState>,
    body: Result<Json<PromoteBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Release>)> {
    let Json(body) = body?;
    let environment = parse_environment(&body.environment)?;

    let release = state.service.promote(PromoteRequest {
        project: body.project,
        environment,
        build_number: body.build_number,
        version: body.version,
        released_by: body.released_by,
        release_notes: body.release_notes,
    })?;
    Ok((StatusCode::CREATED, Json(release)))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn rollback(
    _auth: Authorized,
    State(state): State<AppState>,
    body: Result<Json<RollbackBody>, JsonRejection>,
) -> ApiResult<Json<Release>> {
    let Json(body) = body?;
    let environment = parse_environment(&body.environment)?;

    let release = state
        .service
        .rollback(&body.project, environment, &body.rolled_back_by)?;
    Ok(Json(release))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn list_releases(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<ReleaseHistoryEntry>>> {
    let project = query.required()?;
    Ok(Json(state.service.list_releases(&project)?))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn get_release(
    State(state): State<AppState>,
    Path((project, env)): Path<(String, String)>,
) -> ApiResult<Json<Release>> {
    let environment = parse_environment(&env)?;
    Ok(Json(state.service.get_release(&project, environment)?))
}
