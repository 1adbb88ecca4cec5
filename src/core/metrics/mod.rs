//! Job metrics aggregation and reporting

pub mod record;
pub mod sink;

pub use record::{JobMetrics, MetricValue, MetricsRecord};
pub use sink::{AzureMetricsSink, LogMetricsSink, MetricsSink};

use crate::config::{MetricsConfig, MetricsSinkKind};
use crate::domain::{RelayError, Result};
use crate::logging::azure::AzureLogger;
use std::sync::Arc;

/// Create the configured metrics sink
///
/// `azure` must be supplied when the sink is `azure`.
///
/// # Errors
///
/// Returns a configuration error if the Azure sink is selected without a logger
pub fn create_metrics_sink(
    config: &MetricsConfig,
    azure: Option<Arc<AzureLogger>>,
) -> Result<Arc<dyn MetricsSink>> {
    match config.sink {
        MetricsSinkKind::Log => Ok(Arc::new(LogMetricsSink::new(
            config.namespace.clone(),
            config.service_name.clone(),
        ))),
        MetricsSinkKind::Azure => {
            let logger = azure.ok_or_else(|| {
                RelayError::Configuration(
                    "metrics.sink = 'azure' requires Azure logging to be configured".to_string(),
                )
            })?;
            Ok(Arc::new(AzureMetricsSink::new(logger, config.namespace.clone())))
        }
    }
}
