//! Configuration management for the relay.
//!
//! The relay reads one TOML file at start-up into a [`RelayConfig`] that is
//! then passed explicitly to every component. No component reads the process
//! environment on its own.
//!
//! The file supports:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FHIR_RELAY_<SECTION>_<KEY>` overrides applied after parsing
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! environment = "production"
//!
//! [storage]
//! provider = "http"
//! endpoint = "https://s3.us-east-2.amazonaws.com"
//!
//! [fhir]
//! base_url = "https://fhir.internal.example.com/fhir"
//! auth_type = "bearer"
//! api_token = "${FHIR_API_TOKEN}"
//!
//! [pipeline]
//! max_attempts = 10
//!
//! [error_reporting]
//! sink = "http"
//! endpoint = "https://errors.example.com/api/capture"
//! api_key = "${ERROR_CAPTURE_KEY}"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhir_relay::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhir-relay.toml")?;
//! println!("FHIR server: {}", config.fhir.base_url);
//! println!("Attempt ceiling: {}", config.pipeline.max_attempts);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, Environment, ErrorReportingConfig, ErrorSinkKind, FhirAuthType,
    FhirConfig, LoggingConfig, MetricsConfig, MetricsSinkKind, PipelineConfig, RelayConfig,
    RetryConfig, StorageConfig, StorageProvider,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
