//! # contract: interfaces to the collaborators outside the pipeline
//!
//! Two boundaries leave the core:
//! - [`CoverageService`]: the remote coverage-tracking service. It accepts
//!   a single report (optionally flagged as one fragment of a partial
//!   upload) and an end-of-submission signal that finalises partial uploads.
//! - [`RepositoryLocator`]: version-control metadata used to stamp
//!   submissions (commit, branch).
//!
//! Both traits are annotated for `mockall`, so tests (and downstream crates
//! with the `test-export-mocks` feature) get `MockCoverageService` and
//! `MockRepositoryLocator`.
//!
//! Errors crossing these boundaries are boxed trait objects. The core turns
//! them into [`crate::error::ReporterError`] values, redacting the credential
//! secret on the way.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageReport;
use crate::credential::Credential;
use crate::language::Language;

/// Error type for collaborator calls.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Version-control metadata attached to every submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub commit: String,
    pub branch: Option<String>,
}

/// One coverage upload.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub credential: Credential,
    pub language: Language,
    pub url: String,
    pub repository: RepositoryMetadata,
    /// `true` when this is one fragment of a multi-report upload.
    pub partial: bool,
    pub report: CoverageReport,
}

/// Finalises the partial uploads for one language.
#[derive(Debug, Clone)]
pub struct SubmitEndRequest {
    pub credential: Credential,
    pub language: Language,
    pub url: String,
    pub repository: RepositoryMetadata,
}

/// Outcome of one remote call. `success == false` is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
}

impl SubmissionResult {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// The remote coverage service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CoverageService: Send + Sync {
    /// Upload one report for `req.language`.
    async fn submit(&self, req: &SubmitRequest) -> Result<SubmissionResult, ServiceError>;

    /// Signal that every partial upload for `req.language` has been sent.
    async fn submit_end(&self, req: &SubmitEndRequest) -> Result<SubmissionResult, ServiceError>;
}

/// Resolves repository metadata for the project base directory.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait RepositoryLocator: Send + Sync {
    fn locate(&self, base_dir: &Path) -> Result<RepositoryMetadata, ServiceError>;
}
