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

//! Polling endpoints consumed by unattended clients

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, LOCATION};
use axum::response::IntoResponse;
use fluxion_shared::Channel;

use super::{ApiError, ApiResult, AppState};
use crate::store::is_valid_name;

fn no_release(project: &str, channel: &str) -> ApiError {
    ApiError::NotFound(format!("no release found for {project}/{channel}"))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn latest_json(
    State(state): State<AppState>,
    Path((project, channel)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let Ok(parsed) = channel.parse::<Channel>() else {
        return Err(no_release(&project, &channel));
    };

    let info = state
        .service
        .latest(&project, parsed)?
        .ok_or_else(|| no_release(&project, &channel))?;

    Ok(([(CACHE_CONTROL, "no-cache")], Json(info)))
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub(super) async fn file_redirect(
    State(state): State<AppState>,
    Path((project, channel, version, file)): Path<(String, String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let Some(mirror) = state.service.mirror() else {
        return Err(ApiError::NotFound("file mirror not configured".to_owned()));
    };
    let Ok(parsed) = channel.parse::<Channel>() else {
        return Err(ApiError::NotFound(format!("unknown channel: {channel}")));
    };
    if ![project.as_str(), version.as_str(), file.as_str()]
        .into_iter()
        .all(is_valid_name)
    {
        return Err(ApiError::BadRequest("invalid file path".to_owned()));
    }

    let url = mirror.file_url(&project, parsed.as_str(), &version, &file);
    Ok((StatusCode::FOUND, [(LOCATION, url)]))
}
