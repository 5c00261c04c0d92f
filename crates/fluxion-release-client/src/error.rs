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

//! Error types for the release client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("release server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("no release published on {project}/{channel}")]
    NoRelease { project: String, channel: String },

    #[error("no checksum found for {0} in SHA256SUMS")]
    ChecksumMissing(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("downloaded file from {0} is empty")]
    EmptyDownload(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
