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

//! Release metadata server: numbered builds, per-environment releases with
//! single-level rollback, and a `latest.json` endpoint for polling clients.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod latest;
pub mod mirror;
mod persist;
pub mod service;
pub mod store;

pub use error::{Result, StoreError};
pub use service::ReleaseService;
