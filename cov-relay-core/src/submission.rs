//! Submission client: wraps the [`CoverageService`] and runs the per-language
//! submission protocol.
//!
//! For a language with exactly one report a single complete submission is
//! made. With more than one, every report is sent as a partial submission in
//! discovery order and only then is the end-of-submission call issued. Each
//! call is wrapped individually: errors are redacted and then either abort
//! the run or are logged, according to the [`FailurePolicy`].

use tracing::{debug, error, info, warn};

use crate::contract::{
    CoverageService, RepositoryMetadata, ServiceError, SubmissionResult, SubmitEndRequest,
    SubmitRequest,
};
use crate::coverage::CoverageReport;
use crate::credential::Credential;
use crate::error::ReporterError;
use crate::language::Language;
use crate::partition::LanguageBatch;
use crate::policy::FailurePolicy;

/// What happened to one language's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSummary {
    pub language: Language,
    pub reports: usize,
    pub partial: bool,
    pub submitted: usize,
    pub failed: usize,
    /// Whether the end-of-submission call was issued and accepted.
    pub finalized: bool,
}

impl LanguageSummary {
    fn count(&mut self, succeeded: bool) {
        if succeeded {
            self.submitted += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub struct SubmissionClient<'a, S: CoverageService + ?Sized> {
    service: &'a S,
    credential: &'a Credential,
    url: Option<&'a str>,
    repository: &'a RepositoryMetadata,
}

impl<'a, S: CoverageService + ?Sized> SubmissionClient<'a, S> {
    pub fn new(
        service: &'a S,
        credential: &'a Credential,
        url: Option<&'a str>,
        repository: &'a RepositoryMetadata,
    ) -> Self {
        Self {
            service,
            credential,
            url,
            repository,
        }
    }

    fn url(&self) -> Result<&'a str, ReporterError> {
        match self.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(ReporterError::UrlNotConfigured),
        }
    }

    fn submission_error(&self, language: Language, err: ServiceError) -> ReporterError {
        ReporterError::Submission {
            language,
            message: self.credential.redact(&err.to_string()),
        }
    }

    /// Submits one report. Fails with [`ReporterError::UrlNotConfigured`]
    /// before touching the service when no URL is set.
    pub async fn submit(
        &self,
        language: Language,
        partial: bool,
        report: &CoverageReport,
    ) -> Result<SubmissionResult, ReporterError> {
        let url = self.url()?;
        debug!(
            language = %language,
            partial,
            payload = %serde_json::to_string(report).unwrap_or_default(),
            "[SUBMIT] Sending coverage report"
        );
        self.service
            .submit(&SubmitRequest {
                credential: self.credential.clone(),
                language,
                url: url.to_string(),
                repository: self.repository.clone(),
                partial,
                report: report.clone(),
            })
            .await
            .map_err(|e| self.submission_error(language, e))
    }

    /// Issues the end-of-submission call for `language`.
    pub async fn submit_end(&self, language: Language) -> Result<SubmissionResult, ReporterError> {
        let url = self.url()?;
        self.service
            .submit_end(&SubmitEndRequest {
                credential: self.credential.clone(),
                language,
                url: url.to_string(),
                repository: self.repository.clone(),
            })
            .await
            .map_err(|e| self.submission_error(language, e))
    }

    /// Runs the submission protocol for one language.
    pub async fn submit_batch(
        &self,
        batch: &LanguageBatch,
        policy: &FailurePolicy,
    ) -> Result<LanguageSummary, ReporterError> {
        let language = batch.language;
        let mut summary = LanguageSummary {
            language,
            reports: batch.reports.len(),
            partial: batch.is_partial(),
            submitted: 0,
            failed: 0,
            finalized: false,
        };
        info!(language = %language, reports = summary.reports, "[SUBMIT] Found reports for language");

        match batch.reports.as_slice() {
            [] => {}
            [single] => {
                let outcome = self.submit(language, false, single).await;
                summary.count(settle(outcome, language, policy)?);
            }
            reports => {
                for report in reports {
                    let outcome = self.submit(language, true, report).await;
                    summary.count(settle(outcome, language, policy)?);
                }
                let outcome = self.submit_end(language).await;
                summary.finalized = settle(outcome, language, policy)?;
            }
        }

        info!(
            language = %language,
            submitted = summary.submitted,
            failed = summary.failed,
            finalized = summary.finalized,
            "[SUBMIT] Coverage reporting for language complete"
        );
        Ok(summary)
    }
}

/// Applies the policy to one call's outcome. Returns whether the call succeeded.
fn settle(
    outcome: Result<SubmissionResult, ReporterError>,
    language: Language,
    policy: &FailurePolicy,
) -> Result<bool, ReporterError> {
    match outcome {
        Ok(result) if result.success => {
            info!(language = %language, "[SUBMIT] Service accepted submission");
            Ok(true)
        }
        Ok(_) => {
            warn!(language = %language, "[SUBMIT] Service reported an unsuccessful submission");
            Ok(false)
        }
        Err(err) if err.is_configuration() => Err(err),
        Err(err) => {
            error!(language = %language, error = %err, "[SUBMIT] Failed sending coverage report");
            if policy.is_fatal(&err) {
                return Err(err);
            }
            Ok(false)
        }
    }
}
