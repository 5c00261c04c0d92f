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
use serde::Deserialize;

use super::{ApiError, ApiResult, AppState, Authorized};
use crate::store::{Build, BuildIndexEntry, NewBuild};

#[derive(Debug, Deserialize)]
pub(super) struct ProjectQuery {
    project: Option<String>,
}

impl ProjectQuery {
    pub(super) fn required(self) -> ApiResult<String> {
        self.project
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::BadRequest("project query parameter is required".to_owned()))
    }
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn create_build(
    _auth: Authorized,
    State(state): State<AppState>,
    body: Result<Json<NewBuild>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Build>)> {
    let Json(request) = body?;
    let build = state.service.create_build(request)?;
    Ok((StatusCode::CREATED, Json(build)))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<BuildIndexEntry>>> {
    let project = query.required()?;
    Ok(Json(state.service.list_builds(&project)?))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn get_build(
    State(state): State<AppState>,
    Path((project, number)): Path<(String, String)>,
) -> ApiResult<Json<Build>> {
    let build_number: u64 = number
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid build number".to_owned()))?;
    Ok(Json(state.service.get_build(&project, build_number)?))
}
