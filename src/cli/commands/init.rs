//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fhir-relay.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing FHIR Relay configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set FHIR_API_TOKEN (or FHIR_USERNAME/FHIR_PASSWORD for basic auth)");
                println!("     - Set STORAGE_ACCESS_TOKEN if the blob endpoint requires one");
                println!("  3. Validate configuration: fhir-relay validate-config");
                println!("  4. Process an event: fhir-relay process --event event.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate the commented example configuration
    fn generate_config() -> String {
        r#"# FHIR Relay Configuration File
# Upserts converted FHIR bundles into a FHIR server as batch transactions

[application]
log_level = "info"
environment = "development"  # development | staging | production

[storage]
provider = "http"  # http | local
endpoint = "https://s3.us-east-2.amazonaws.com"
# access_token = "${STORAGE_ACCESS_TOKEN}"
# local_root = "/var/lib/fhir-relay/bundles"  # provider = "local"
timeout_seconds = 30

[storage.retry]
max_attempts = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[fhir]
base_url = "http://localhost:8888/fhir"
auth_type = "bearer"  # none | basic | bearer
api_token = "${FHIR_API_TOKEN}"
# username = "${FHIR_USERNAME}"
# password = "${FHIR_PASSWORD}"
timeout_seconds = 120
tls_verify = true

[fhir.retry]
max_attempts = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[pipeline]
# Full-batch submissions before a job is declared failed
max_attempts = 10
attempt_delay_ms = 0

[metrics]
sink = "log"  # log | azure
namespace = "FhirRelay"
service_name = "fhir-relay"

[error_reporting]
sink = "log"  # log | http | azure
# endpoint = "https://errors.example.com/api/capture"
# api_key = "${ERROR_CAPTURE_KEY}"

[logging]
local_enabled = false
local_path = "/var/log/fhir-relay"
local_rotation = "daily"  # daily | hourly
azure_enabled = false
# azure_tenant_id = "${AZURE_TENANT_ID}"
# azure_client_id = "${AZURE_CLIENT_ID}"
# azure_client_secret = "${AZURE_CLIENT_SECRET}"
# azure_dcr_immutable_id = "dcr-..."
# azure_dce_endpoint = "https://<dce>.ingest.monitor.azure.com"
# azure_stream_name = "Custom-FhirRelay_CL"
"#
        .to_string()
    }
}
