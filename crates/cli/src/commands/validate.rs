//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, Overrides};
use contracts::PipelineSettings;
use dispatcher::SearchEndpoint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    topic: String,
    emulator: bool,
    worker_count: usize,
    valid_endpoints: usize,
    malformed_endpoints: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %config_label(args), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn config_label(args: &ValidateArgs) -> String {
    args.config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<environment>".to_string())
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = config_label(args);

    match ConfigLoader::load(args.config.as_deref(), &Overrides::default()) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            let malformed = settings
                .search_apis
                .iter()
                .filter(|raw| SearchEndpoint::parse(raw).is_err())
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    topic: settings.pubsub.topic_path(),
                    emulator: settings.pubsub.emulator_host.is_some(),
                    worker_count: settings.worker_count,
                    valid_endpoints: settings.search_apis.len() - malformed,
                    malformed_endpoints: malformed,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &PipelineSettings) -> Vec<String> {
    let mut warnings: Vec<String> = settings
        .search_apis
        .iter()
        .filter_map(|raw| SearchEndpoint::parse(raw).err())
        .map(|e| format!("{e} - endpoint will be skipped"))
        .collect();

    if warnings.len() == settings.search_apis.len() {
        warnings.push("No valid search endpoints - no vehicle can match".to_string());
    }

    if settings.publish_timeout < settings.search_timeout {
        warnings.push(format!(
            "publish_timeout ({}) is shorter than search_timeout ({})",
            humantime::format_duration(settings.publish_timeout),
            humantime::format_duration(settings.search_timeout)
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Topic: {}", summary.topic);
            println!("  Emulator: {}", summary.emulator);
            println!("  Workers: {}", summary.worker_count);
            println!("  Endpoints: {} valid, {} malformed", summary.valid_endpoints, summary.malformed_endpoints);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
