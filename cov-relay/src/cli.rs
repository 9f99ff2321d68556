//! CLI for cov-relay: argument parsing and the async [`run`] entrypoint.
//!
//! All pipeline logic lives in `cov-relay-core`. This module loads the
//! configuration, applies command-line overrides, wires the live HTTP and
//! git adapters into a [`Processor`] and reports the outcome.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cov_relay_core::{ProcessingSummary, Processor};

use crate::codacy::CodacyClient;
use crate::git::GitCliLocator;
use crate::load_config::load_config;

/// Aggregate multi-module coverage reports and submit them per language.
#[derive(Parser)]
#[clap(
    name = "cov-relay",
    version,
    about = "Find, convert and submit coverage reports of a multi-module build"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover, transform and submit coverage using the given config file
    Report {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Coverage service URL, overriding the config file and environment
        #[clap(long)]
        url: Option<String>,
        /// Project base directory, overriding the config file
        #[clap(long)]
        base_dir: Option<PathBuf>,
        /// Commit SHA to report against instead of the repository HEAD
        #[clap(long)]
        commit: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<ProcessingSummary> {
    // Top-level marker event, emitted before anything can fail.
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Report {
            config,
            url,
            base_dir,
            commit,
        } => {
            let mut relay = load_config(config)?;
            if let Some(url) = url {
                relay.processor.url = Some(url);
            }
            if let Some(base_dir) = base_dir {
                relay.processor.base_dir = base_dir;
            }

            tracing::info!(command = "report", "Starting coverage reporting");
            let service = CodacyClient::new(relay.timeout)
                .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
            let processor = Processor::new(relay.processor, service, GitCliLocator::new(commit));

            match processor.process_reports().await {
                Ok(summary) => {
                    tracing::info!(command = "report", ?summary, "Coverage reporting complete");
                    Ok(summary)
                }
                Err(e) => {
                    tracing::error!(command = "report", error = %e, "Coverage reporting failed");
                    Err(e.into())
                }
            }
        }
    }
}
