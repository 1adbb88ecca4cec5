//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the relay configuration file.

use crate::config::{load_config, StorageProvider};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {}", config.application.environment.as_str());
        println!("  Log Level: {}", config.application.log_level);
        match config.storage.provider {
            StorageProvider::Http => println!(
                "  Blob Store: http ({})",
                config.storage.endpoint.as_deref().unwrap_or("-")
            ),
            StorageProvider::Local => println!(
                "  Blob Store: local ({})",
                config.storage.local_root.as_deref().unwrap_or("-")
            ),
        }
        println!(
            "  Storage Retry: {} attempts, {} ms initial delay",
            config.storage.retry.max_attempts, config.storage.retry.initial_delay_ms
        );
        println!("  FHIR Server: {}", config.fhir.base_url);
        println!("  FHIR Auth: {:?}", config.fhir.auth_type);
        println!(
            "  FHIR Network Retry: {} attempts",
            config.fhir.retry.max_attempts
        );
        println!("  Batch Attempt Ceiling: {}", config.pipeline.max_attempts);
        println!("  Metrics Sink: {:?}", config.metrics.sink);
        println!("  Error Capture Sink: {:?}", config.error_reporting.sink);
        println!();
        Ok(0)
    }
}
