use anyhow::Result;
use clap::Parser;
use cov_relay::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(summary) => {
            tracing::info!("CLI completed successfully");
            println!(
                "Found {} report(s); submitted coverage for {} language(s), {} failed submission(s)",
                summary.reports_found,
                summary.languages.len(),
                summary.failed_submissions()
            );
            for language in &summary.languages {
                println!(
                    "  {}: {} report(s), {} submitted, {} failed{}",
                    language.language,
                    language.reports,
                    language.submitted,
                    language.failed,
                    if language.finalized { ", finalized" } else { "" }
                );
            }
        }
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result.map(|_| ())
}
