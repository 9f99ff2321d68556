use std::path::PathBuf;

use thiserror::Error;

use crate::credential::CredentialError;
use crate::language::Language;

/// Every way a run can fail.
///
/// `ProjectDirectoryNotFound`, `UrlNotConfigured` and `Credential` are
/// configuration errors and always abort. The others only abort when the
/// matching failure-policy switch asks for it.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("project base directory not found: {0}")]
    ProjectDirectoryNotFound(PathBuf),

    #[error("coverage service URL is not configured")]
    UrlNotConfigured,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("no coverage reports found")]
    ReportNotFound,

    #[error("failed to parse report {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("report {path} references a source file that cannot be resolved: {entry}")]
    UnknownEntry { path: PathBuf, entry: String },

    #[error("failed to submit {language} coverage: {message}")]
    Submission { language: Language, message: String },

    #[error("failed to read repository metadata: {0}")]
    Repository(String),
}

impl ReporterError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReporterError::ProjectDirectoryNotFound(_)
                | ReporterError::UrlNotConfigured
                | ReporterError::Credential(_)
        )
    }
}
