//! High-level pipeline: orchestrates discover → transform → partition → submit.
//!
//! # Responsibilities
//! - Finds report files for every project (see [`crate::discovery`])
//! - Parses each report once and splits it per [`Language`] (see [`crate::transform`])
//! - Partitions the non-empty results by language (see [`crate::partition`])
//! - Submits each language's batch through the [`SubmissionClient`]
//! - Applies the [`FailurePolicy`] at every boundary and returns a
//!   [`ProcessingSummary`] of what was sent
//!
//! All transformation happens before the first remote call, so a fatal
//! parse or unknown-entry error never leaves a half-submitted language
//! behind. Languages are submitted sequentially in [`Language::ALL`] order.
//!
//! # Error Handling
//! Configuration errors (missing base directory, missing URL, bad
//! credential) always abort. Everything else is gated by the policy: a
//! failed run returns exactly one error, the first fatal cause.

use std::path::{Path, PathBuf};

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::contract::{CoverageService, RepositoryLocator};
use crate::coverage::CoverageReport;
use crate::credential::Credential;
use crate::discovery::{
    discover_reports, report_count, supported_predicate, DiscoveredProject, DiscoveryOptions,
    Project,
};
use crate::error::ReporterError;
use crate::language::Language;
use crate::partition::partition_by_language;
use crate::policy::FailurePolicy;
use crate::submission::{LanguageSummary, SubmissionClient};
use crate::transform::{CoverageTransformer, TransformInput};

/// Everything one run needs. Immutable for the run's duration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub credential: Credential,
    pub url: Option<String>,
    pub projects: Vec<Project>,
    pub base_dir: PathBuf,
    pub policy: FailurePolicy,
    pub ignore_test_build_directory: bool,
    pub report_reject_list: Vec<String>,
}

/// Output of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Report files found by discovery, before transformation.
    pub reports_found: usize,
    pub languages: Vec<LanguageSummary>,
}

impl ProcessingSummary {
    pub fn failed_submissions(&self) -> usize {
        self.languages.iter().map(|l| l.failed).sum()
    }
}

pub struct Processor<S, L> {
    config: ProcessorConfig,
    service: S,
    locator: L,
}

impl<S, L> Processor<S, L>
where
    S: CoverageService,
    L: RepositoryLocator,
{
    pub fn new(config: ProcessorConfig, service: S, locator: L) -> Self {
        Self {
            config,
            service,
            locator,
        }
    }

    pub async fn process_reports(&self) -> Result<ProcessingSummary, ReporterError> {
        let span = info_span!("process_reports", run_id = %Uuid::new_v4());
        self.run().instrument(span).await
    }

    async fn run(&self) -> Result<ProcessingSummary, ReporterError> {
        let config = &self.config;
        info!(
            base_dir = %config.base_dir.display(),
            projects = config.projects.len(),
            credential = config.credential.kind(),
            "[PROCESS] Coverage reporting started"
        );

        let options = DiscoveryOptions {
            ignore_test_build_directory: config.ignore_test_build_directory,
            report_reject_list: config.report_reject_list.clone(),
        };
        // Model filenames are computed against this absolute form.
        let base_dir = std::path::absolute(&config.base_dir)
            .map_err(|_| ReporterError::ProjectDirectoryNotFound(config.base_dir.clone()))?;
        let discovered =
            discover_reports(&config.projects, supported_predicate(), &base_dir, &options)?;

        let mut summary = ProcessingSummary {
            reports_found: report_count(&discovered),
            languages: Vec::new(),
        };
        if summary.reports_found == 0 {
            config.policy.check(ReporterError::ReportNotFound)?;
            info!("[PROCESS] No reports to submit");
            return Ok(summary);
        }

        let repository = self
            .locator
            .locate(&base_dir)
            .map_err(|e| ReporterError::Repository(config.credential.redact(&e.to_string())))?;
        info!(commit = %repository.commit, branch = ?repository.branch, "[PROCESS] Resolved repository");

        let transformed = self.transform_all(&base_dir, &discovered)?;
        let batches = partition_by_language(transformed);

        let client = SubmissionClient::new(
            &self.service,
            &config.credential,
            config.url.as_deref(),
            &repository,
        );
        for batch in &batches {
            let language_summary = client.submit_batch(batch, &config.policy).await?;
            summary.languages.push(language_summary);
        }

        info!(
            languages = summary.languages.len(),
            failed = summary.failed_submissions(),
            "[PROCESS] Coverage reporting complete"
        );
        Ok(summary)
    }

    /// Transforms every discovered report, reading each file once.
    fn transform_all(
        &self,
        base_dir: &Path,
        discovered: &[DiscoveredProject<'_>],
    ) -> Result<Vec<(Language, CoverageReport)>, ReporterError> {
        let transformer = CoverageTransformer::new(self.config.policy);
        let mut transformed = Vec::new();

        for entry in discovered {
            let roots = resolve_roots(base_dir, entry.project.source_roots());
            for report in &entry.reports {
                let input = TransformInput {
                    report,
                    source_roots: &roots,
                    base_dir,
                };
                transformed.extend(transformer.transform_all(&input)?);
            }
        }
        Ok(transformed)
    }
}

fn resolve_roots(base_dir: &Path, roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .map(|root| {
            if root.is_absolute() {
                root.clone()
            } else {
                base_dir.join(root)
            }
        })
        .collect()
}
