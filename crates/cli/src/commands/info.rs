//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, Overrides};
use contracts::PipelineSettings;
use dispatcher::SearchEndpoint;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let settings = ConfigLoader::load(args.config.as_deref(), &Overrides::default())
        .map_err(CliError::from)
        .context("Failed to load configuration")?;

    if args.json {
        let json = ConfigLoader::to_json(&settings)
            .map_err(CliError::from)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&settings);
    }

    Ok(())
}

fn print_config_info(settings: &PipelineSettings) {
    let duration = |d: std::time::Duration| humantime::format_duration(d).to_string();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Hirer Lookup Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📋 Listing");
    println!("   └─ URL: {}", settings.vehicle_list_url);

    println!("\n🔎 Search Endpoints ({})", settings.search_apis.len());
    for (i, raw) in settings.search_apis.iter().enumerate() {
        let prefix = if i == settings.search_apis.len() - 1 { "└─" } else { "├─" };
        match SearchEndpoint::parse(raw) {
            Ok(_) => println!("   {} {}", prefix, raw),
            Err(e) => println!("   {} {} (skipped: {})", prefix, raw, e),
        }
    }

    println!("\n⚙️  Workers");
    println!("   ├─ Count: {}", settings.worker_count);
    println!("   ├─ Search timeout: {}", duration(settings.search_timeout));
    println!("   └─ Publish timeout: {}", duration(settings.publish_timeout));

    let pubsub = &settings.pubsub;
    println!("\n📤 Pub/Sub");
    println!("   ├─ Topic: {}", pubsub.topic_path());
    match &pubsub.emulator_host {
        Some(host) => println!("   ├─ Emulator: {}", host),
        None => println!(
            "   ├─ Credentials: {}",
            if pubsub.access_token.is_some() { "bearer token" } else { "none" }
        ),
    }
    println!(
        "   └─ Readiness: {} attempts, {} apart",
        settings.readiness.max_attempts,
        duration(settings.readiness.delay)
    );

    println!();
}
