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

//! Types shared between the FluxION release server and its polling clients.

pub mod release;
pub mod version;

pub use release::{
    Channel, Environment, LatestInfo, ParseChannelError, ParseEnvironmentError,
    channel_to_environment, environment_to_channel,
};
