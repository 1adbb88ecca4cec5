//! Process command implementation
//!
//! Runs one invocation of the pipeline for a queue event read from a file or
//! from stdin. The invocation is abandoned if a shutdown signal arrives first;
//! nothing is flushed and the queue is expected to redeliver the message.

use crate::config::load_config;
use crate::core::pipeline::InvocationHandler;
use crate::domain::RelayError;
use clap::Args;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Queue event JSON file (reads stdin when omitted)
    #[arg(short, long)]
    pub event: Option<PathBuf>,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting process command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let handler = match InvocationHandler::from_config(&config) {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize pipeline");
                eprintln!("Failed to initialize pipeline: {e}");
                return Ok(2);
            }
        };

        let raw = self.read_event().await?;

        tokio::select! {
            result = handler.handle_raw(&raw) => Ok(report(result)),
            _ = wait_for_shutdown(shutdown_signal) => {
                tracing::warn!("Invocation interrupted by shutdown signal");
                eprintln!("Interrupted; message left for redelivery");
                Ok(130)
            }
        }
    }

    async fn read_event(&self) -> anyhow::Result<String> {
        match self.event {
            Some(ref path) => Ok(tokio::fs::read_to_string(path).await?),
            None => {
                let mut raw = String::new();
                tokio::io::stdin().read_to_string(&mut raw).await?;
                Ok(raw)
            }
        }
    }
}

fn report(result: crate::domain::Result<crate::core::pipeline::InvocationSummary>) -> i32 {
    match result {
        Ok(summary) => {
            println!("Invocation {} completed", summary.invocation_id);
            for job in &summary.jobs {
                println!(
                    "  {} entries upserted in {} attempt(s), {} ms",
                    job.entries,
                    job.attempts,
                    job.duration.as_millis()
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Invocation failed: {e}");
            if let RelayError::Job { source, .. } = &e {
                eprintln!("  Caused by: {}", source.root_cause());
            }
            1
        }
    }
}

/// Resolves once the shutdown flag is set; never resolves if the sender is gone
async fn wait_for_shutdown(mut shutdown_signal: watch::Receiver<bool>) {
    while !*shutdown_signal.borrow() {
        if shutdown_signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
