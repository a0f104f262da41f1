//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset variables fall back to
//! defaults suitable for local development.
//!
//! | variable                  | default                  |
//! |---------------------------|--------------------------|
//! | `TRACKER_SEND_TIMEOUT_MS` | `5000` (`0` = no limit)  |
//! | `TRACKER_TRACKED_KIND`    | `create-entity`          |
//! | `TRACKER_BUS`             | `memory` (or `redis`)    |
//! | `REDIS_URL`               | required for `redis`     |
//! | `TRACKER_REDIS_CHANNEL`   | `tracker.entity-created` |

use std::time::Duration;

use thiserror::Error;

use creation_tracker_events::OperationKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required when {reason}")]
    Missing { var: &'static str, reason: &'static str },

    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which bus the tracker publishes to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BusKind {
    /// In-process bus; forwarded messages are only visible to local consumers.
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub send_timeout: Option<Duration>,
    pub tracked_kind: OperationKind,
    pub bus: BusKind,
    pub redis_url: Option<String>,
    pub redis_channel: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            send_timeout: Some(Duration::from_millis(Self::DEFAULT_SEND_TIMEOUT_MS)),
            tracked_kind: OperationKind::CreateEntity,
            bus: BusKind::Memory,
            redis_url: None,
            redis_channel: Self::DEFAULT_REDIS_CHANNEL.to_string(),
        }
    }
}

impl TrackerConfig {
    pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;
    pub const DEFAULT_REDIS_CHANNEL: &'static str = "tracker.entity-created";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("TRACKER_SEND_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: "TRACKER_SEND_TIMEOUT_MS",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            config.send_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Some(raw) = lookup("TRACKER_TRACKED_KIND") {
            config.tracked_kind = raw.trim().parse().map_err(|e: creation_tracker_events::UnknownOperationKind| {
                ConfigError::Invalid {
                    var: "TRACKER_TRACKED_KIND",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(raw) = lookup("TRACKER_BUS") {
            config.bus = match raw.trim().to_ascii_lowercase().as_str() {
                "memory" => BusKind::Memory,
                "redis" => BusKind::Redis,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "TRACKER_BUS",
                        value: raw,
                        reason: "expected `memory` or `redis`".to_string(),
                    });
                }
            };
        }

        config.redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        if let Some(channel) = lookup("TRACKER_REDIS_CHANNEL").filter(|c| !c.trim().is_empty()) {
            config.redis_channel = channel;
        }

        if config.bus == BusKind::Redis && config.redis_url.is_none() {
            return Err(ConfigError::Missing {
                var: "REDIS_URL",
                reason: "TRACKER_BUS=redis",
            });
        }

        Ok(config)
    }
}
