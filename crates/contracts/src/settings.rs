//! PipelineSettings - Config Loader output
//!
//! Built once at startup, validated, then shared read-only (`Arc`) with every
//! component. Nothing in the pipeline looks at the environment on its own.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use validator::{Validate, ValidationError};

pub const DEFAULT_VEHICLE_LIST_URL: &str = "https://sandbox-update.transfer360.dev/test_vehicles";

pub const DEFAULT_SEARCH_APIS: [&str; 4] = [
    "https://sandbox-update.transfer360.dev/test_search/acmelease",
    "https://sandbox-update.transfer360.dev/test_search/fleetcompany",
    "https://sandbox-update.transfer360.dev/test_search/hirecompany",
    "https://sandbox-update.transfer360.dev/test_search/leasecompany",
];

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WORKER_COUNT: usize = 5;
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_TOPIC_READY_ATTEMPTS: u32 = 10;
pub const DEFAULT_TOPIC_READY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_GCP_PROJECT_ID: &str = "your-gcp-project-id";
pub const DEFAULT_PUBSUB_TOPIC: &str = "your-pubsub-topic";

/// Upper bound for the search and publish timeouts
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Validate)]
pub struct PipelineSettings {
    /// Listing feed page
    pub vehicle_list_url: String,

    /// Search endpoint URLs, unvalidated; malformed entries are skipped per search
    #[validate(length(min = 1, message = "at least one search endpoint is required"))]
    pub search_apis: Vec<String>,

    /// Shared deadline for one search fan-out
    #[serde(serialize_with = "serialize_duration")]
    #[validate(custom(function = "bounded_timeout"))]
    pub search_timeout: Duration,

    /// Concurrent workers
    #[validate(range(min = 1, max = 256))]
    pub worker_count: usize,

    /// Job-scoped deadline for one publish, disjoint from the search deadline
    #[serde(serialize_with = "serialize_duration")]
    #[validate(custom(function = "bounded_timeout"))]
    pub publish_timeout: Duration,

    /// Destination topic readiness polling
    #[validate(nested)]
    pub readiness: TopicReadiness,

    /// Destination topic
    #[validate(nested)]
    pub pubsub: PubSubSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            vehicle_list_url: DEFAULT_VEHICLE_LIST_URL.to_string(),
            search_apis: DEFAULT_SEARCH_APIS.iter().map(|s| s.to_string()).collect(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            worker_count: DEFAULT_WORKER_COUNT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            readiness: TopicReadiness::default(),
            pubsub: PubSubSettings::default(),
        }
    }
}

/// Bounded existence polling before the first publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Validate)]
pub struct TopicReadiness {
    /// Existence checks before giving up
    #[validate(range(min = 1))]
    pub max_attempts: u32,

    /// Pause between checks
    #[serde(serialize_with = "serialize_duration")]
    #[validate(custom(function = "non_zero_duration"))]
    pub delay: Duration,
}

impl Default for TopicReadiness {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_TOPIC_READY_ATTEMPTS,
            delay: DEFAULT_TOPIC_READY_DELAY,
        }
    }
}

/// Destination project, topic and endpoint override
#[derive(Clone, PartialEq, Eq, Serialize, Validate)]
pub struct PubSubSettings {
    #[validate(length(min = 1))]
    pub project_id: String,

    #[validate(length(min = 1))]
    pub topic: String,

    /// `host:port` of a local emulator; when set no credentials are sent
    pub emulator_host: Option<String>,

    /// Bearer token for the hosted service
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl PubSubSettings {
    /// Fully qualified topic resource name
    pub fn topic_path(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic)
    }
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_GCP_PROJECT_ID.to_string(),
            topic: DEFAULT_PUBSUB_TOPIC.to_string(),
            emulator_host: None,
            access_token: None,
        }
    }
}

impl fmt::Debug for PubSubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubSettings")
            .field("project_id", &self.project_id)
            .field("topic", &self.topic)
            .field("emulator_host", &self.emulator_host)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("non_zero_duration"));
    }
    Ok(())
}

fn bounded_timeout(value: &Duration) -> Result<(), ValidationError> {
    non_zero_duration(value)?;
    if *value > MAX_TIMEOUT {
        return Err(ValidationError::new("bounded_timeout").with_message("must not exceed 1h".into()));
    }
    Ok(())
}
