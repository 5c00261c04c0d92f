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

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "release_server.toml";

const AUTH_TOKEN_ENV: &str = "FLUXION_RELEASE_AUTH_TOKEN";
const MIRROR_URL_ENV: &str = "FLUXION_RELEASE_MIRROR_URL";
const MIRROR_TOKEN_ENV: &str = "FLUXION_RELEASE_MIRROR_TOKEN";
const PLACEHOLDER_TOKEN: &str = "change-me-to-a-strong-random-token";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub mirror: MirrorSettings,
    #[serde(default)]
    pub events: EventSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Bearer token for write endpoints. Writes are refused while unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorSettings {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    pub webhook_url: Option<String>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Secrets and the mirror location can come from the environment so
    /// they stay out of the config file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(AUTH_TOKEN_ENV) {
            self.auth.token = Some(token);
        }
        if let Some(url) = lookup(MIRROR_URL_ENV) {
            self.mirror.url = Some(url);
        }
        if let Some(token) = lookup(MIRROR_TOKEN_ENV) {
            self.mirror.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(token) = &self.auth.token
            && (token.trim().is_empty() || token == PLACEHOLDER_TOKEN)
        {
            bail!("auth.token must be a strong random value or left unset");
        }
        if self.events.channel_capacity == 0 {
            bail!("events.channel_capacity must be greater than zero");
        }
        if let Some(url) = &self.mirror.url {
            check_http_url("mirror.url", url)?;
        }
        if let Some(url) = &self.events.webhook_url {
            check_http_url("events.webhook_url", url)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must be an http(s) URL, got {url:?}");
    }
    Ok(())
}
