//! Layered value resolution: environment > config file > default
//!
//! Absent values fall back to the default with an info line; unparseable
//! values fall back with a warning. Neither is fatal.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::parser::SettingsFile;

/// One recognised setting: environment variable name and file key
#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub env: &'static str,
    pub file: &'static str,
}

pub const VEHICLE_LIST_URL: Key = Key { env: "VEHICLE_LIST_URL", file: "vehicle_list_url" };
pub const SEARCH_APIS: Key = Key { env: "SEARCH_APIS", file: "search_apis" };
pub const REQUEST_TIMEOUT: Key = Key { env: "REQUEST_TIMEOUT", file: "request_timeout" };
pub const WORKER_COUNT: Key = Key { env: "WORKER_COUNT", file: "worker_count" };
pub const PUBLISH_TIMEOUT: Key = Key { env: "PUBLISH_TIMEOUT", file: "publish_timeout" };
pub const TOPIC_READY_ATTEMPTS: Key = Key { env: "TOPIC_READY_ATTEMPTS", file: "topic_ready_attempts" };
pub const TOPIC_READY_DELAY: Key = Key { env: "TOPIC_READY_DELAY", file: "topic_ready_delay" };
pub const GCP_PROJECT_ID: Key = Key { env: "GCP_PROJECT_ID", file: "gcp_project_id" };
pub const PUBSUB_TOPIC: Key = Key { env: "PUBSUB_TOPIC", file: "pubsub_topic" };
pub const PUBSUB_EMULATOR_HOST: Key = Key { env: "PUBSUB_EMULATOR_HOST", file: "pubsub_emulator_host" };
pub const PUBSUB_ACCESS_TOKEN: Key = Key { env: "PUBSUB_ACCESS_TOKEN", file: "pubsub_access_token" };

/// Source of environment variables
///
/// The process environment in production, a map in tests.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads `std::env`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolves keys against the environment and an optional file layer
pub struct Resolver<'a, E: EnvSource> {
    env: &'a E,
    file: &'a SettingsFile,
}

impl<'a, E: EnvSource> Resolver<'a, E> {
    pub fn new(env: &'a E, file: &'a SettingsFile) -> Self {
        Self { env, file }
    }

    /// Raw value, empty strings treated as absent
    pub fn raw(&self, key: Key) -> Option<String> {
        self.env
            .var(key.env)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.file.get(key.file).filter(|v| !v.trim().is_empty()))
    }

    pub fn string(&self, key: Key, default: &str) -> String {
        match self.raw(key) {
            Some(value) => value,
            None => {
                info!(key = key.env, default, "not set or empty, using default");
                default.to_string()
            }
        }
    }

    pub fn optional(&self, key: Key) -> Option<String> {
        self.raw(key)
    }

    /// Comma separated list; entries trimmed, empty entries dropped
    pub fn list(&self, key: Key, default: &[&str]) -> Vec<String> {
        let parsed: Option<Vec<String>> = self.raw(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        });

        match parsed {
            Some(list) if !list.is_empty() => list,
            _ => {
                info!(key = key.env, default = ?default, "not set or empty, using default");
                default.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    pub fn number<T>(&self, key: Key, default: T) -> T
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let Some(value) = self.raw(key) else {
            info!(key = key.env, %default, "not set or empty, using default");
            return default;
        };

        match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key = key.env, value = %value, %default, "invalid integer, using default");
                default
            }
        }
    }

    pub fn duration(&self, key: Key, default: Duration) -> Duration {
        let shown = humantime::format_duration(default);
        let Some(value) = self.raw(key) else {
            info!(key = key.env, default = %shown, "not set or empty, using default");
            return default;
        };

        match humantime::parse_duration(value.trim()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(key = key.env, value = %value, default = %shown, error = %e, "invalid duration, using default");
                default
            }
        }
    }
}
