//! Error and notification escalation
//!
//! Fatal job errors and anomalous invocations are described by an
//! [`ErrorContext`] and handed to an [`ErrorReporter`].

pub mod context;
pub mod reporter;

pub use context::{ErrorContext, Severity};
pub use reporter::{AzureErrorReporter, ErrorReporter, HttpErrorReporter, LogErrorReporter};

use crate::config::{ErrorSinkKind, RelayConfig};
use crate::domain::{RelayError, Result};
use crate::logging::azure::AzureLogger;
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Create the configured error reporter
///
/// `azure` must be supplied when the sink is `azure`.
///
/// # Errors
///
/// Returns a configuration error if the selected sink is missing settings
pub fn create_error_reporter(
    config: &RelayConfig,
    azure: Option<Arc<AzureLogger>>,
) -> Result<Arc<dyn ErrorReporter>> {
    let reporting = &config.error_reporting;

    match reporting.sink {
        ErrorSinkKind::Log => Ok(Arc::new(LogErrorReporter)),
        ErrorSinkKind::Http => {
            let endpoint = reporting.endpoint.clone().ok_or_else(|| {
                RelayError::Configuration(
                    "error_reporting.endpoint is required when sink = 'http'".to_string(),
                )
            })?;
            let environment = reporting
                .environment
                .clone()
                .unwrap_or_else(|| config.application.environment.as_str().to_string());

            Ok(Arc::new(HttpErrorReporter::new(
                endpoint,
                reporting
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret().to_string()),
                Some(environment),
            )?))
        }
        ErrorSinkKind::Azure => {
            let logger = azure.ok_or_else(|| {
                RelayError::Configuration(
                    "error_reporting.sink = 'azure' requires Azure logging to be configured"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(AzureErrorReporter::new(logger)))
        }
    }
}
