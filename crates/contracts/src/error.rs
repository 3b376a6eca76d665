//! Layered error definitions
//!
//! Categorized by source: config / endpoint

use std::time::Duration;

use thiserror::Error;

/// Unified error type for process-level failures
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A value that has no default was not provided
    #[error("missing required configuration value: {key}")]
    MissingRequired { key: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing required value error
    pub fn missing_required(key: impl Into<String>) -> Self {
        Self::MissingRequired { key: key.into() }
    }
}

/// Why a single search endpoint dropped out of a search.
///
/// None of these escape the dispatcher; each one only removes its endpoint
/// from consideration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// URL lacks a scheme or host
    #[error("malformed endpoint '{target}': {reason}")]
    MalformedTarget { target: String, reason: String },

    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Shared search deadline elapsed while the request was in flight
    #[error("deadline of {}ms exceeded", .0.as_millis())]
    DeadlineExceeded(Duration),

    /// Search stopped because another endpoint already matched
    #[error("cancelled after another endpoint matched")]
    Cancelled,

    /// Endpoint answered with something other than 200
    #[error("http status {0}")]
    Status(u16),

    /// Body could not be decoded as vehicle data
    #[error("payload decode failed: {0}")]
    Decode(String),
}

impl EndpointError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedTarget { .. } => "malformed",
            Self::Transport(_) => "transport",
            Self::DeadlineExceeded(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
        }
    }
}
