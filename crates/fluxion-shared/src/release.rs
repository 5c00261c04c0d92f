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

//! Release environments, polling channels and the payload served to polling clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid environment: {0:?} (must be dev, staging, or prod)")]
pub struct ParseEnvironmentError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid channel: {0:?} (must be dev, staging, or production)")]
pub struct ParseChannelError(pub String);

/// Deployment environment a build can be promoted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub const ALL: [Self; 3] = [Self::Dev, Self::Staging, Self::Prod];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    #[must_use]
    pub const fn channel(self) -> Channel {
        environment_to_channel(self)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            other => Err(ParseEnvironmentError(other.to_owned())),
        }
    }
}

/// Channel name used in the polling URL namespace (`/{project}/{channel}/latest.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Dev,
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Dev, Self::Staging, Self::Production];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    #[must_use]
    pub const fn environment(self) -> Environment {
        channel_to_environment(self)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ParseChannelError;

    /// Accepts the environment spelling `prod` as an alias for `production`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ParseChannelError(other.to_owned())),
        }
    }
}

#[must_use]
pub const fn channel_to_environment(channel: Channel) -> Environment {
    match channel {
        Channel::Dev => Environment::Dev,
        Channel::Staging => Environment::Staging,
        Channel::Production => Environment::Prod,
    }
}

#[must_use]
pub const fn environment_to_channel(environment: Environment) -> Channel {
    match environment {
        Environment::Dev => Channel::Dev,
        Environment::Staging => Channel::Staging,
        Environment::Prod => Channel::Production,
    }
}

impl From<Channel> for Environment {
    fn from(channel: Channel) -> Self {
        channel_to_environment(channel)
    }
}

impl From<Environment> for Channel {
    fn from(environment: Environment) -> Self {
        environment_to_channel(environment)
    }
}

/// Body of `latest.json`: what a polling client needs to decide whether to update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestInfo {
    pub version: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub build_number: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_environment_round_trip() {
        for env in Environment::ALL {
            assert_eq!(channel_to_environment(environment_to_channel(env)), env);
        }
        for channel in Channel::ALL {
            assert_eq!(environment_to_channel(channel_to_environment(channel)), channel);
        }
    }

    #[test]
    fn test_production_maps_to_prod() {
        assert_eq!(Channel::Production.environment(), Environment::Prod);
        assert_eq!(Environment::Prod.channel(), Channel::Production);
        assert_eq!(Channel::Staging.environment().as_str(), "staging");
        assert_eq!(Environment::Dev.channel().as_str(), "dev");
    }

    #[test]
    fn test_parse_environment() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert!("production".parse::<Environment>().is_err());
        assert!("Prod".parse::<Environment>().is_err());
        assert!("".parse::<Environment>().is_err());
    }

    #[test]
    fn test_parse_channel_accepts_prod_alias() {
        assert_eq!("production".parse::<Channel>().unwrap(), Channel::Production);
        assert_eq!("prod".parse::<Channel>().unwrap(), Channel::Production);
        assert_eq!("dev".parse::<Channel>().unwrap(), Channel::Dev);
        assert!("nightly".parse::<Channel>().is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        for env in Environment::ALL {
            assert_eq!(env.to_string(), env.as_str());
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
        for channel in Channel::ALL {
            assert_eq!(channel.to_string().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Environment::Prod).unwrap(), "\"prod\"");
        assert_eq!(serde_json::to_string(&Channel::Production).unwrap(), "\"production\"");
        let alias: Channel = serde_json::from_str("\"prod\"").unwrap();
        assert_eq!(alias, Channel::Production);
    }

    #[test]
    fn test_latest_info_omits_zero_build_number() {
        let info = LatestInfo {
            version: "1.0.0".to_owned(),
            build_number: 0,
        };
        assert_eq!(serde_json::to_string(&info).unwrap(), r#"{"version":"1.0.0"}"#);

        let parsed: LatestInfo = serde_json::from_str(r#"{"version":"1.1.0","build_number":7}"#).unwrap();
        assert_eq!(parsed.build_number, 7);
    }
}
