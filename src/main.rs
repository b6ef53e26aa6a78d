//! Site Restore Tool
//!
//! Rebuilds a site from an archive holding its code, public files and a
//! database dump.

// siterestore/src/main.rs
mod config;
mod errors;
mod restore;
mod utils;

use anyhow::{Context, Result};
use config::{AppConfig, RestoreOverrides, env_flag_is_set, load_restore_config_from_json};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::errors::RestoreError;

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<RestoreError>().is_some_and(RestoreError::is_user_abort) {
                eprintln!("🛑 Restore cancelled: {:#}", e);
            } else {
                eprintln!("❌ Error: {:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config_path = env::var("RESTORE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    // siterestore [ARCHIVE_OR_DIR] [SITE_ALIAS]
    let mut args = env::args().skip(1);
    let overrides = RestoreOverrides {
        archive_path: args.next().map(PathBuf::from),
        site: args.next(),
        database_url: env::var("TARGET_DATABASE_URL").ok().filter(|url| !url.is_empty()),
        assume_yes: env_flag_is_set(env::var("RESTORE_ASSUME_YES").ok().as_deref()),
    };

    let restore_config = load_restore_config_from_json(&app_config.raw_json_config, &overrides)
        .context("Failed to load restore configuration from JSON")?;

    init_tracing(restore_config.request.verbose);

    info!(
        "🔄 Starting Restore Process (config: {})...",
        app_config.config_path.display()
    );
    match &restore_config.request.input_path {
        Some(input) => info!("Restore input: {}", input.display()),
        None => info!("No archive given, using configured source paths"),
    }
    match &restore_config.request.site {
        Some(alias) => info!("Target site: {}", alias),
        None => info!("No site alias given, restoring into an explicit destination"),
    }

    restore::run_restore_flow(&restore_config)
        .await
        .context("Restore process failed")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
