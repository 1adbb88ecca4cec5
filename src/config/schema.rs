//! Configuration schema types
//!
//! This module defines the configuration structure that maps to the TOML file.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Main relay configuration
///
/// Constructed once at process start and passed by reference into each
/// component constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Blob storage the bundles are read from
    pub storage: StorageConfig,

    /// FHIR server the bundles are upserted into
    pub fhir: FhirConfig,

    /// Application-level retry settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Metrics sink settings
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Error-capture settings
    #[serde(default)]
    pub error_reporting: ErrorReportingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.storage.validate()?;
        self.fhir.validate(&self.application.environment)?;
        self.pipeline.validate()?;
        self.metrics.validate(&self.logging)?;
        self.error_reporting.validate(&self.logging)?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: Environment::default(),
        }
    }
}

/// Retry configuration for transport-level failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self, section: &str) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 20 {
            return Err(format!(
                "{section}.retry.max_attempts must be between 1 and 20, got {}",
                self.max_attempts
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "{section}.retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(format!(
                "{section}.retry.max_delay_ms must be >= initial_delay_ms ({} < {})",
                self.max_delay_ms, self.initial_delay_ms
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Blob storage provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// S3-compatible object store over HTTP(S)
    #[default]
    Http,
    /// Local directory, one sub-directory per bucket
    Local,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider
    #[serde(default)]
    pub provider: StorageProvider,

    /// Object store endpoint (required for the http provider)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with object requests (optional)
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Root directory (required for the local provider)
    #[serde(default)]
    pub local_root: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Retry policy for transient storage failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        match self.provider {
            StorageProvider::Http => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                if endpoint.is_empty() {
                    return Err(
                        "storage.endpoint is required when provider = 'http'".to_string()
                    );
                }
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err("storage.endpoint must start with http:// or https://".to_string());
                }
            }
            StorageProvider::Local => {
                if self.local_root.as_deref().unwrap_or_default().is_empty() {
                    return Err(
                        "storage.local_root is required when provider = 'local'".to_string()
                    );
                }
            }
        }

        if self.timeout_seconds == 0 {
            return Err("storage.timeout_seconds must be > 0".to_string());
        }

        self.retry.validate("storage")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Http,
            endpoint: None,
            access_token: None,
            local_root: None,
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

/// FHIR server authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FhirAuthType {
    /// No Authorization header
    #[default]
    None,
    /// HTTP basic authentication
    Basic,
    /// Static bearer token
    Bearer,
}

/// FHIR server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirConfig {
    /// Base URL; the tenant ID is appended as the last path segment
    pub base_url: String,

    /// Authentication scheme
    #[serde(default)]
    pub auth_type: FhirAuthType,

    /// Username for basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Token for bearer authentication
    #[serde(default)]
    pub api_token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_fhir_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: Disabling verification is only accepted outside
    /// production environments.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Network-level retry policy, independent of `pipeline.max_attempts`
    #[serde(default)]
    pub retry: RetryConfig,
}

impl FhirConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.base_url.is_empty() {
            return Err("fhir.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("fhir.base_url must start with http:// or https://".to_string());
        }

        match self.auth_type {
            FhirAuthType::Basic => {
                if self.username.as_deref().unwrap_or_default().is_empty() {
                    return Err(
                        "fhir.username cannot be empty when auth_type is 'basic'".to_string()
                    );
                }
                if self
                    .password
                    .as_ref()
                    .map(|s| s.expose_secret().is_empty())
                    .unwrap_or(true)
                {
                    return Err(
                        "fhir.password cannot be empty when auth_type is 'basic'".to_string()
                    );
                }
            }
            FhirAuthType::Bearer => {
                if self
                    .api_token
                    .as_ref()
                    .map(|s| s.expose_secret().is_empty())
                    .unwrap_or(true)
                {
                    return Err(
                        "fhir.api_token cannot be empty when auth_type is 'bearer'".to_string()
                    );
                }
            }
            FhirAuthType::None => {}
        }

        if self.timeout_seconds == 0 {
            return Err("fhir.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments. \
                Set 'tls_verify = true' or use environment = \"development\" or \"staging\"."
                    .to_string(),
            );
        }

        self.retry.validate("fhir")
    }
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888/fhir".to_string(),
            auth_type: FhirAuthType::None,
            username: None,
            password: None,
            api_token: None,
            timeout_seconds: default_fhir_timeout_seconds(),
            tls_verify: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Application-level retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of full-batch submissions per job
    #[serde(default = "default_pipeline_max_attempts")]
    pub max_attempts: u32,

    /// Pause between full-batch resubmissions in milliseconds
    #[serde(default)]
    pub attempt_delay_ms: u64,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 50 {
            return Err(format!(
                "pipeline.max_attempts must be between 1 and 50, got {}",
                self.max_attempts
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_pipeline_max_attempts(),
            attempt_delay_ms: 0,
        }
    }
}

/// Where metrics records are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSinkKind {
    /// Structured log event
    #[default]
    Log,
    /// Azure Log Analytics (uses the `logging.azure_*` settings)
    Azure,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub sink: MetricsSinkKind,

    /// Namespace the metrics are grouped under
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,

    /// Service dimension attached to every metric
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl MetricsConfig {
    fn validate(&self, logging: &LoggingConfig) -> Result<(), String> {
        if self.namespace.trim().is_empty() {
            return Err("metrics.namespace cannot be empty".to_string());
        }
        if self.sink == MetricsSinkKind::Azure && !logging.azure_enabled {
            return Err(
                "metrics.sink = 'azure' requires logging.azure_enabled = true".to_string()
            );
        }
        Ok(())
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sink: MetricsSinkKind::Log,
            namespace: default_metrics_namespace(),
            service_name: default_service_name(),
        }
    }
}

/// Where error context is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSinkKind {
    /// Structured log event
    #[default]
    Log,
    /// JSON POST to an error-capture endpoint
    Http,
    /// Azure Log Analytics (uses the `logging.azure_*` settings)
    Azure,
}

/// Error-capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorReportingConfig {
    #[serde(default)]
    pub sink: ErrorSinkKind,

    /// Capture endpoint (required for the http sink)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Key sent in the `X-Capture-Key` header (optional)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Environment tag attached to events; defaults to `application.environment`
    #[serde(default)]
    pub environment: Option<String>,
}

impl ErrorReportingConfig {
    fn validate(&self, logging: &LoggingConfig) -> Result<(), String> {
        match self.sink {
            ErrorSinkKind::Http => {
                let endpoint = self.endpoint.as_deref().unwrap_or_default();
                if endpoint.is_empty() {
                    return Err(
                        "error_reporting.endpoint is required when sink = 'http'".to_string()
                    );
                }
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(
                        "error_reporting.endpoint must start with http:// or https://".to_string()
                    );
                }
            }
            ErrorSinkKind::Azure if !logging.azure_enabled => {
                return Err(
                    "error_reporting.sink = 'azure' requires logging.azure_enabled = true"
                        .to_string(),
                );
            }
            _ => {}
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Enable Azure Log Analytics
    #[serde(default)]
    pub azure_enabled: bool,

    /// Azure AD tenant ID
    #[serde(default)]
    pub azure_tenant_id: Option<String>,

    /// Azure AD client ID (from App Registration)
    #[serde(default)]
    pub azure_client_id: Option<String>,

    /// Azure AD client secret (from App Registration)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub azure_client_secret: Option<SecretString>,

    /// Data Collection Rule (DCR) immutable ID
    #[serde(default)]
    pub azure_dcr_immutable_id: Option<String>,

    /// Data Collection Endpoint (DCE) URL
    #[serde(default)]
    pub azure_dce_endpoint: Option<String>,

    /// Stream name for custom logs (e.g., "Custom-FhirRelay_CL")
    #[serde(default)]
    pub azure_stream_name: Option<String>,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.azure_enabled {
            if self.azure_tenant_id.is_none() {
                return Err("Azure logging enabled but azure_tenant_id not provided".to_string());
            }
            if self.azure_client_id.is_none() {
                return Err("Azure logging enabled but azure_client_id not provided".to_string());
            }
            if self.azure_client_secret.is_none() {
                return Err(
                    "Azure logging enabled but azure_client_secret not provided".to_string()
                );
            }
            if self.azure_dcr_immutable_id.is_none() {
                return Err(
                    "Azure logging enabled but azure_dcr_immutable_id not provided".to_string(),
                );
            }
            if self.azure_dce_endpoint.is_none() {
                return Err("Azure logging enabled but azure_dce_endpoint not provided".to_string());
            }
            if self.azure_stream_name.is_none() {
                return Err("Azure logging enabled but azure_stream_name not provided".to_string());
            }
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            azure_enabled: false,
            azure_tenant_id: None,
            azure_client_id: None,
            azure_client_secret: None,
            azure_dcr_immutable_id: None,
            azure_dce_endpoint: None,
            azure_stream_name: None,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_fhir_timeout_seconds() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_pipeline_max_attempts() -> u32 {
    10
}

fn default_metrics_namespace() -> String {
    "FhirRelay".to_string()
}

fn default_service_name() -> String {
    "fhir-relay".to_string()
}

fn default_local_path() -> String {
    "/var/log/fhir-relay".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
