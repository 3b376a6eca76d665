//! Publish layer errors
//!
//! `TopicUnavailable` is fatal to the run; every other variant is fatal to
//! one job only.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Readiness never confirmed
    #[error("topic {topic} not ready after {attempts} attempts")]
    TopicUnavailable { topic: String, attempts: u32 },

    /// One existence check failed (counted as not ready)
    #[error("topic check failed: {0}")]
    TopicCheck(String),

    /// Envelope could not be encoded
    #[error("envelope serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Connection or protocol failure while publishing
    #[error("publish transport error: {0}")]
    Transport(String),

    /// Destination refused the message
    #[error("publish rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 200 response without a message id
    #[error("publish acknowledged without a message id")]
    MissingAck,

    /// Job-scoped publish deadline elapsed
    #[error("publish timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl PublishError {
    /// Whether the whole run must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TopicUnavailable { .. })
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TopicUnavailable { .. } => "topic_unavailable",
            Self::TopicCheck(_) => "topic_check",
            Self::Serialize(_) => "serialize",
            Self::Transport(_) => "transport",
            Self::Rejected { .. } => "rejected",
            Self::MissingAck => "missing_ack",
            Self::Timeout(_) => "timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
