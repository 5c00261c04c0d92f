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

//! Polling client for the FluxION release server.
//!
//! Checks `/{project}/{channel}/latest.json` for a newer version, verifies
//! downloaded files against the published `SHA256SUMS` and can replace the
//! installed binary with the new release. Restarting into it is left to the
//! caller.

pub mod checker;
pub mod checksum;
pub mod config;
pub mod error;
pub mod installer;

pub use checker::{UpdateChecker, UpdateInfo, UpdateOutcome};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
