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

//! HTTP surface of the release server

pub mod auth;
mod builds;
mod health;
mod latest;
mod releases;

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::StoreError;
use crate::service::ReleaseService;

pub use auth::Authorized;

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<ReleaseService>,
    /// Token required on write endpoints; `None` disables writes entirely.
    pub auth_token: Option<Arc<str>>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<ReleaseService>, auth_token: Option<String>) -> Self {
        Self {
            service,
            auth_token: auth_token.filter(|t| !t.is_empty()).map(Arc::from),
            started_at: Instant::now(),
        }
    }
}

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health_handler))
        .route(
            "/api/v1/builds",
            post(builds::create_build).get(builds::list_builds),
        )
        .route("/api/v1/builds/{project}/{number}", get(builds::get_build))
        .route(
            "/api/v1/releases",
            post(releases::promote).get(releases::list_releases),
        )
        .route("/api/v1/releases/rollback", post(releases::rollback))
        .route("/api/v1/releases/{project}/{env}", get(releases::get_release))
        .route("/{project}/{channel}/latest.json", get(latest::latest_json))
        .route(
            "/{project}/{channel}/{version}/{file}",
            get(latest::file_redirect),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(&'static str),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Rejected request body");
        Self::BadRequest("invalid request body".to_owned())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_owned()),
            Self::Store(e @ StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Store(e @ StoreError::InvalidArgument(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Store(e @ StoreError::Precondition(_)) => (StatusCode::CONFLICT, e.to_string()),
            Self::Store(e @ (StoreError::Io { .. } | StoreError::Yaml { .. })) => {
                error!(error = %e, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_owned(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
