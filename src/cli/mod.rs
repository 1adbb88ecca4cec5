//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the relay using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// FHIR Relay - queue-triggered FHIR bundle upsert worker
#[derive(Parser, Debug)]
#[command(name = "fhir-relay")]
#[command(version, about, long_about = None)]
#[command(author = "FHIR Relay Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhir-relay.toml", env = "FHIR_RELAY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIR_RELAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one queue event (from a file or stdin)
    Process(commands::process::ProcessArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
