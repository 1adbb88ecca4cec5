//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{
    ErrorSinkKind, FhirAuthType, MetricsSinkKind, RelayConfig, StorageProvider,
};
use super::secret::secret_string;
use crate::domain::errors::RelayError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "FHIR_RELAY";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into RelayConfig
/// 4. Applies environment variable overrides (FHIR_RELAY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if any step fails
///
/// # Examples
///
/// ```no_run
/// use fhir_relay::config::loader::load_config;
///
/// let config = load_config("fhir-relay.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RelayConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RelayError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RelayError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Loads configuration from TOML text
///
/// Same steps as [`load_config`] without the file read.
pub fn load_config_from_str(contents: &str) -> Result<RelayConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: RelayConfig = toml::from_str(&contents)
        .map_err(|e| RelayError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    config.validate().map_err(|e| {
        RelayError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched. All missing variables are
/// reported in a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_regex();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(RelayError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        RelayError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

fn parse_enum_override<T: serde::de::DeserializeOwned>(name: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| RelayError::Configuration(format!("Invalid value '{value}' for {name}")))
}

/// Applies environment variable overrides using the FHIR_RELAY_* prefix
///
/// Variables follow the pattern `FHIR_RELAY_<SECTION>_<KEY>`, for example
/// `FHIR_RELAY_FHIR_BASE_URL` or `FHIR_RELAY_PIPELINE_MAX_ATTEMPTS`.
/// `lookup` is injected so tests don't have to mutate the process environment.
fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        let name = format!("{ENV_PREFIX}_{key}");
        lookup(&name).map(|value| (name, value))
    };

    // Application overrides
    if let Some((_, val)) = var("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some((name, val)) = var("APPLICATION_ENVIRONMENT") {
        config.application.environment = parse_enum_override(&name, &val)?;
    }

    // Storage overrides
    if let Some((name, val)) = var("STORAGE_PROVIDER") {
        config.storage.provider = parse_enum_override::<StorageProvider>(&name, &val)?;
    }
    if let Some((_, val)) = var("STORAGE_ENDPOINT") {
        config.storage.endpoint = Some(val);
    }
    if let Some((_, val)) = var("STORAGE_ACCESS_TOKEN") {
        config.storage.access_token = Some(secret_string(val));
    }
    if let Some((_, val)) = var("STORAGE_LOCAL_ROOT") {
        config.storage.local_root = Some(val);
    }
    if let Some((name, val)) = var("STORAGE_RETRY_MAX_ATTEMPTS") {
        config.storage.retry.max_attempts = parse_override(&name, &val)?;
    }

    // FHIR overrides
    if let Some((_, val)) = var("FHIR_BASE_URL") {
        config.fhir.base_url = val;
    }
    if let Some((name, val)) = var("FHIR_AUTH_TYPE") {
        config.fhir.auth_type = parse_enum_override::<FhirAuthType>(&name, &val)?;
    }
    if let Some((_, val)) = var("FHIR_USERNAME") {
        config.fhir.username = Some(val);
    }
    if let Some((_, val)) = var("FHIR_PASSWORD") {
        config.fhir.password = Some(secret_string(val));
    }
    if let Some((_, val)) = var("FHIR_API_TOKEN") {
        config.fhir.api_token = Some(secret_string(val));
    }
    if let Some((name, val)) = var("FHIR_TIMEOUT_SECONDS") {
        config.fhir.timeout_seconds = parse_override(&name, &val)?;
    }
    if let Some((name, val)) = var("FHIR_TLS_VERIFY") {
        config.fhir.tls_verify = parse_override(&name, &val)?;
    }

    // Pipeline overrides
    if let Some((name, val)) = var("PIPELINE_MAX_ATTEMPTS") {
        config.pipeline.max_attempts = parse_override(&name, &val)?;
    }
    if let Some((name, val)) = var("PIPELINE_ATTEMPT_DELAY_MS") {
        config.pipeline.attempt_delay_ms = parse_override(&name, &val)?;
    }

    // Metrics overrides
    if let Some((name, val)) = var("METRICS_SINK") {
        config.metrics.sink = parse_enum_override::<MetricsSinkKind>(&name, &val)?;
    }
    if let Some((_, val)) = var("METRICS_NAMESPACE") {
        config.metrics.namespace = val;
    }

    // Error reporting overrides
    if let Some((name, val)) = var("ERROR_REPORTING_SINK") {
        config.error_reporting.sink = parse_enum_override::<ErrorSinkKind>(&name, &val)?;
    }
    if let Some((_, val)) = var("ERROR_REPORTING_ENDPOINT") {
        config.error_reporting.endpoint = Some(val);
    }
    if let Some((_, val)) = var("ERROR_REPORTING_API_KEY") {
        config.error_reporting.api_key = Some(secret_string(val));
    }

    // Logging overrides
    if let Some((name, val)) = var("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override(&name, &val)?;
    }
    if let Some((_, val)) = var("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some((name, val)) = var("LOGGING_AZURE_ENABLED") {
        config.logging.azure_enabled = parse_override(&name, &val)?;
    }
    if let Some((_, val)) = var("LOGGING_AZURE_TENANT_ID") {
        config.logging.azure_tenant_id = Some(val);
    }
    if let Some((_, val)) = var("LOGGING_AZURE_CLIENT_ID") {
        config.logging.azure_client_id = Some(val);
    }
    if let Some((_, val)) = var("LOGGING_AZURE_CLIENT_SECRET") {
        config.logging.azure_client_secret = Some(secret_string(val));
    }
    if let Some((_, val)) = var("LOGGING_AZURE_DCR_IMMUTABLE_ID") {
        config.logging.azure_dcr_immutable_id = Some(val);
    }
    if let Some((_, val)) = var("LOGGING_AZURE_DCE_ENDPOINT") {
        config.logging.azure_dce_endpoint = Some(val);
    }
    if let Some((_, val)) = var("LOGGING_AZURE_STREAM_NAME") {
        config.logging.azure_stream_name = Some(val);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[storage]
endpoint = "https://s3.example.com"

[fhir]
base_url = "https://fhir.example.com/fhir"
"#;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FHIR_RELAY_TEST_SUBST_VAR", "test_value");
        let input = "password = \"${FHIR_RELAY_TEST_SUBST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("FHIR_RELAY_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let input = "password = \"${FHIR_RELAY_TEST_DEFINITELY_MISSING}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err
            .to_string()
            .contains("FHIR_RELAY_TEST_DEFINITELY_MISSING"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# token = \"${FHIR_RELAY_TEST_ONLY_IN_COMMENT}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${FHIR_RELAY_TEST_ONLY_IN_COMMENT}"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config: RelayConfig = toml::from_str(MINIMAL).unwrap();
        let lookup = lookup_from(&[
            ("FHIR_RELAY_FHIR_BASE_URL", "https://other.example.com/fhir"),
            ("FHIR_RELAY_FHIR_AUTH_TYPE", "Bearer"),
            ("FHIR_RELAY_FHIR_API_TOKEN", "tok"),
            ("FHIR_RELAY_PIPELINE_MAX_ATTEMPTS", "4"),
            ("FHIR_RELAY_APPLICATION_ENVIRONMENT", "production"),
            ("FHIR_RELAY_STORAGE_PROVIDER", "local"),
            ("FHIR_RELAY_STORAGE_LOCAL_ROOT", "/tmp/bundles"),
        ]);

        apply_env_overrides(&mut config, lookup).unwrap();

        assert_eq!(config.fhir.base_url, "https://other.example.com/fhir");
        assert_eq!(config.fhir.auth_type, FhirAuthType::Bearer);
        assert_eq!(
            config.fhir.api_token.as_ref().unwrap().expose_secret(),
            "tok"
        );
        assert_eq!(config.pipeline.max_attempts, 4);
        assert_eq!(config.application.environment, Environment::Production);
        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_invalid_number() {
        let mut config: RelayConfig = toml::from_str(MINIMAL).unwrap();
        let lookup = lookup_from(&[("FHIR_RELAY_PIPELINE_MAX_ATTEMPTS", "ten")]);

        let err = apply_env_overrides(&mut config, lookup).unwrap_err();
        assert!(err.to_string().contains("FHIR_RELAY_PIPELINE_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_env_override_invalid_enum() {
        let mut config: RelayConfig = toml::from_str(MINIMAL).unwrap();
        let lookup = lookup_from(&[("FHIR_RELAY_METRICS_SINK", "statsd")]);
        assert!(apply_env_overrides(&mut config, lookup).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-fhir-relay.toml");
        assert!(matches!(result, Err(RelayError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.fhir.base_url, "https://fhir.example.com/fhir");
        assert_eq!(config.pipeline.max_attempts, 10);
        assert_eq!(config.storage.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_config_invalid_values() {
        let toml = r#"
[storage]
endpoint = "https://s3.example.com"

[fhir]
base_url = "ftp://fhir.example.com"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("fhir.base_url"));
    }
}
