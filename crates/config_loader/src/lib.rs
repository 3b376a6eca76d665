//! # Config Loader
//!
//! Configuration loading and validation module.
//!
//! Responsibilities:
//! - Read the optional TOML/JSON settings file
//! - Layer the process environment over it, falling back to defaults
//! - Enforce explicitly required values
//! - Validate and produce one immutable `PipelineSettings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, Overrides};
//!
//! let settings = ConfigLoader::load(None, &Overrides::default()).unwrap();
//! println!("Topic: {}", settings.pubsub.topic);
//! ```

mod parser;
mod resolver;
mod validator;

pub use contracts::PipelineSettings;
pub use parser::{ConfigFormat, SettingsFile};
pub use resolver::{EnvSource, ProcessEnv};

use contracts::{
    ContractError, PubSubSettings, TopicReadiness, DEFAULT_GCP_PROJECT_ID, DEFAULT_PUBLISH_TIMEOUT,
    DEFAULT_PUBSUB_TOPIC, DEFAULT_SEARCH_APIS, DEFAULT_SEARCH_TIMEOUT,
    DEFAULT_TOPIC_READY_ATTEMPTS, DEFAULT_TOPIC_READY_DELAY, DEFAULT_VEHICLE_LIST_URL,
    DEFAULT_WORKER_COUNT,
};
use resolver::Resolver;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Values supplied on the command line, applied before validation
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub worker_count: Option<usize>,
    pub search_timeout: Option<Duration>,
}

/// Configuration loader
///
/// Provides static methods to build settings from files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from the optional file and the process environment
    ///
    /// # Errors
    /// - File read or parse failure
    /// - Missing required value
    /// - Validation failure
    pub fn load(
        path: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<PipelineSettings, ContractError> {
        let file = match path {
            Some(path) => Self::load_file(path)?,
            None => SettingsFile::default(),
        };
        Self::load_with_env(&file, &ProcessEnv, overrides)
    }

    /// Load settings from an explicit file layer and environment source
    ///
    /// # Errors
    /// - Missing required value
    /// - Validation failure
    pub fn load_with_env<E: EnvSource>(
        file: &SettingsFile,
        env: &E,
        overrides: &Overrides,
    ) -> Result<PipelineSettings, ContractError> {
        let mut settings = Self::resolve(&Resolver::new(env, file))?;

        if let Some(workers) = overrides.worker_count {
            info!(workers, "Overriding worker count from CLI");
            settings.worker_count = workers;
        }
        if let Some(timeout) = overrides.search_timeout {
            info!(timeout_ms = timeout.as_millis() as u64, "Overriding search timeout from CLI");
            settings.search_timeout = timeout;
        }

        validator::validate(&settings)?;
        Ok(settings)
    }

    /// Parse a settings file
    ///
    /// Automatically detects format from file extension (.toml / .json).
    pub fn load_file(path: &Path) -> Result<SettingsFile, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        parser::parse(&content, format)
    }

    /// Serialize settings to pretty JSON (token omitted)
    pub fn to_json(settings: &PipelineSettings) -> Result<String, ContractError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn resolve<E: EnvSource>(r: &Resolver<'_, E>) -> Result<PipelineSettings, ContractError> {
        let emulator_host = r.optional(resolver::PUBSUB_EMULATOR_HOST);
        let access_token = r.optional(resolver::PUBSUB_ACCESS_TOKEN);

        // The hosted service refuses unauthenticated publishes
        if emulator_host.is_none() && access_token.is_none() {
            return Err(ContractError::missing_required(
                resolver::PUBSUB_ACCESS_TOKEN.env,
            ));
        }

        if let Some(ref host) = emulator_host {
            info!(emulator_host = %host, "Using Pub/Sub emulator");
        }

        Ok(PipelineSettings {
            vehicle_list_url: r.string(resolver::VEHICLE_LIST_URL, DEFAULT_VEHICLE_LIST_URL),
            search_apis: r.list(resolver::SEARCH_APIS, &DEFAULT_SEARCH_APIS),
            search_timeout: r.duration(resolver::REQUEST_TIMEOUT, DEFAULT_SEARCH_TIMEOUT),
            worker_count: r.number(resolver::WORKER_COUNT, DEFAULT_WORKER_COUNT),
            publish_timeout: r.duration(resolver::PUBLISH_TIMEOUT, DEFAULT_PUBLISH_TIMEOUT),
            readiness: TopicReadiness {
                max_attempts: r.number(resolver::TOPIC_READY_ATTEMPTS, DEFAULT_TOPIC_READY_ATTEMPTS),
                delay: r.duration(resolver::TOPIC_READY_DELAY, DEFAULT_TOPIC_READY_DELAY),
            },
            pubsub: PubSubSettings {
                project_id: r.string(resolver::GCP_PROJECT_ID, DEFAULT_GCP_PROJECT_ID),
                topic: r.string(resolver::PUBSUB_TOPIC, DEFAULT_PUBSUB_TOPIC),
                emulator_host,
                access_token,
            },
        })
    }
}
