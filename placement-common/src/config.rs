//! Configuration loading
//!
//! Every setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! remaining tiers apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

pub const ENV_CONFIG_FILE: &str = "PLACEMENT_CONFIG";
pub const ENV_BIND_ADDR: &str = "PLACEMENT_BIND_ADDR";
pub const ENV_DATABASE: &str = "PLACEMENT_DATABASE";
pub const ENV_CORS_ORIGIN: &str = "PLACEMENT_CORS_ORIGIN";
pub const ENV_DEADLINE: &str = "PLACEMENT_DEADLINE";
pub const ENV_RELAY_URL: &str = "PLACEMENT_RELAY_URL";
pub const ENV_STRICT_TRANSITIONS: &str = "PLACEMENT_STRICT_TRANSITIONS";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_UNIQUE_ID_PREFIX: &str = "NCE-";
pub const DEFAULT_MAIL_FROM: &str = "placement-cell@localhost";
pub const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_MAX_ATTEMPTS: i64 = 5;

/// On-disk TOML layout. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub cors_origin: Option<String>,
    pub submission: SubmissionSection,
    pub queue: QueueSection,
    pub notifications: NotificationSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSection {
    /// RFC 3339 instant after which submissions are refused
    pub deadline: Option<String>,
    pub unique_id_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub strict_transitions: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSection {
    pub relay_url: Option<String>,
    pub from: Option<String>,
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<i64>,
}

impl TomlConfig {
    /// Read a TOML config file; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(config))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// `None` leaves the window open indefinitely
    pub deadline: Option<DateTime<Utc>>,
    pub unique_id_prefix: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    /// Enforce the documented transition table on status changes
    pub strict_transitions: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub relay_url: Option<String>,
    pub from: String,
    pub interval_secs: u64,
    pub max_attempts: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            from: DEFAULT_MAIL_FROM.to_string(),
            interval_secs: DEFAULT_DISPATCH_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub cors_origin: Option<String>,
    pub submission: SubmissionConfig,
    pub queue: QueueConfig,
    pub notifications: NotificationConfig,
}

impl Config {
    /// Resolve configuration from the process environment and the config file
    pub fn resolve(cli: &ConfigOverrides) -> Result<Self> {
        let path = cli
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match path {
            Some(path) => match TomlConfig::load(&path)? {
                Some(config) => {
                    info!("Loaded config file: {}", path.display());
                    config
                }
                None => {
                    warn!("Config file not found: {} (using defaults)", path.display());
                    TomlConfig::default()
                }
            },
            None => {
                warn!("Could not determine config directory (using defaults)");
                TomlConfig::default()
            }
        };

        Self::from_sources(toml_config, |key| std::env::var(key).ok(), cli)
    }

    /// Merge the tiers; `env` looks up an environment variable by name
    pub fn from_sources<F>(toml_config: TomlConfig, env: F, cli: &ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = cli
            .bind_addr
            .clone()
            .or_else(|| env(ENV_BIND_ADDR))
            .or(toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address {:?}: {}", bind_addr, e))
        })?;

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let cors_origin = env(ENV_CORS_ORIGIN).or(toml_config.cors_origin);

        let deadline = cli
            .deadline
            .clone()
            .or_else(|| env(ENV_DEADLINE))
            .or(toml_config.submission.deadline)
            .map(|s| {
                crate::time::parse(&s)
                    .map_err(|e| Error::Config(format!("Invalid submission deadline: {}", e)))
            })
            .transpose()?;

        let unique_id_prefix = toml_config
            .submission
            .unique_id_prefix
            .unwrap_or_else(|| DEFAULT_UNIQUE_ID_PREFIX.to_string());

        let strict_transitions = match env(ENV_STRICT_TRANSITIONS) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                Error::Config(format!(
                    "{} must be true or false (got {:?})",
                    ENV_STRICT_TRANSITIONS, value
                ))
            })?,
            None => toml_config.queue.strict_transitions.unwrap_or(false),
        };

        let defaults = NotificationConfig::default();
        let notifications = NotificationConfig {
            relay_url: env(ENV_RELAY_URL).or(toml_config.notifications.relay_url),
            from: toml_config.notifications.from.unwrap_or(defaults.from),
            interval_secs: toml_config
                .notifications
                .interval_secs
                .unwrap_or(defaults.interval_secs)
                .max(1),
            max_attempts: toml_config
                .notifications
                .max_attempts
                .unwrap_or(defaults.max_attempts)
                .max(1),
        };

        Ok(Self {
            bind_addr,
            database_path,
            cors_origin,
            submission: SubmissionConfig {
                deadline,
                unique_id_prefix,
            },
            queue: QueueConfig { strict_transitions },
            notifications,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Platform config file location: `<config_dir>/placement/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("placement").join("config.toml"))
}

/// Platform data location: `<data_local_dir>/placement/placement.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("placement").join("placement.db"))
        .unwrap_or_else(|| PathBuf::from("./placement.db"))
}
