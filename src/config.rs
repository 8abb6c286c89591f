//! Configuration types.
//!
//! Everything is read from the environment once at startup and passed down
//! explicitly. `from_lookup` takes the variable source as a closure so the
//! parsing rules can be exercised without touching the process environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::sync::{Bucket, ListMapping, Schedule};

const DEFAULT_BASE_URL: &str = "https://api.trello.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MOVE_DELAY_MS: u64 = 100;
const DEFAULT_INTERVAL_SECS: u64 = 900;
const DEFAULT_PORT: u16 = 8080;

/// Board API connection settings.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// API root, without the `/1` version segment.
    pub base_url: String,
    pub api_key: SecretString,
    pub token: SecretString,
    pub board_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub board: BoardConfig,
    /// Destination list per bucket. Missing entries mean skipped cards.
    pub mapping: ListMapping,
    /// Pause after every move request.
    pub move_delay: Duration,
    pub schedule: Schedule,
    /// Run once immediately instead of waiting for the first tick.
    pub run_on_start: bool,
    /// Port for the trigger/health server.
    pub port: u16,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let board = BoardConfig {
            base_url: get("TRELLO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: SecretString::from(require("TRELLO_API_KEY")?),
            token: SecretString::from(require("TRELLO_TOKEN")?),
            board_id: require("TRELLO_BOARD_ID")?,
            timeout: Duration::from_secs(parse_or(
                get("TRELLO_TIMEOUT_SECS"),
                "TRELLO_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        };

        let mut mapping = ListMapping::new();
        for bucket in Bucket::ALL {
            if let Some(list_id) = get(bucket.env_key()) {
                mapping.insert(bucket, list_id);
            }
        }

        let move_delay = Duration::from_millis(parse_or(
            get("DUE_SORT_MOVE_DELAY_MS"),
            "DUE_SORT_MOVE_DELAY_MS",
            DEFAULT_MOVE_DELAY_MS,
        )?);

        let schedule = match get("DUE_SORT_CRON") {
            Some(expression) => {
                Schedule::cron(&expression).map_err(|message| ConfigError::InvalidValue {
                    key: "DUE_SORT_CRON".into(),
                    message,
                })?
            }
            None => {
                let secs = parse_or(
                    get("DUE_SORT_INTERVAL_SECS"),
                    "DUE_SORT_INTERVAL_SECS",
                    DEFAULT_INTERVAL_SECS,
                )?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "DUE_SORT_INTERVAL_SECS".into(),
                        message: "interval must be at least one second".into(),
                    });
                }
                Schedule::Interval(Duration::from_secs(secs))
            }
        };

        let run_on_start = match get("DUE_SORT_RUN_ON_START") {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "DUE_SORT_RUN_ON_START".into(),
                message: format!("expected true/false, got '{value}'"),
            })?,
            None => true,
        };

        let port = parse_or(get("DUE_SORT_PORT"), "DUE_SORT_PORT", DEFAULT_PORT)?;

        Ok(Self {
            board,
            mapping,
            move_delay,
            schedule,
            run_on_start,
            port,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
