//! Failure policy: which gated error categories abort a run.
//!
//! Configuration errors are never routed through here; they always abort.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::ReporterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailurePolicy {
    pub fail_on_report_not_found: bool,
    pub fail_on_report_sending: bool,
    pub fail_on_unknown: bool,
    pub fail_on_xml_parse_error: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            fail_on_report_not_found: true,
            fail_on_report_sending: true,
            fail_on_unknown: true,
            fail_on_xml_parse_error: true,
        }
    }
}

impl FailurePolicy {
    /// Policy that logs and continues on every gated condition.
    pub fn lenient() -> Self {
        Self {
            fail_on_report_not_found: false,
            fail_on_report_sending: false,
            fail_on_unknown: false,
            fail_on_xml_parse_error: false,
        }
    }

    /// Decides whether `err` aborts the run.
    ///
    /// Returns the error back when it must propagate; otherwise logs it and
    /// returns `Ok(())` so the caller can continue with the next item.
    pub fn check(&self, err: ReporterError) -> Result<(), ReporterError> {
        if self.is_fatal(&err) {
            error!(error = %err, "[POLICY] Aborting run");
            return Err(err);
        }
        warn!(error = %err, "[POLICY] Continuing after recoverable error");
        Ok(())
    }

    pub fn is_fatal(&self, err: &ReporterError) -> bool {
        match err {
            ReporterError::ReportNotFound => self.fail_on_report_not_found,
            ReporterError::Submission { .. } => self.fail_on_report_sending,
            ReporterError::UnknownEntry { .. } => self.fail_on_unknown,
            ReporterError::Parse { .. } => self.fail_on_xml_parse_error,
            ReporterError::ProjectDirectoryNotFound(_)
            | ReporterError::UrlNotConfigured
            | ReporterError::Credential(_)
            | ReporterError::Repository(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use std::path::PathBuf;

    fn submission_error() -> ReporterError {
        ReporterError::Submission {
            language: Language::Java,
            message: "boom".into(),
        }
    }

    #[test]
    fn configuration_errors_ignore_switches() {
        let lenient = FailurePolicy::lenient();
        assert!(lenient.is_fatal(&ReporterError::UrlNotConfigured));
        assert!(lenient.is_fatal(&ReporterError::ProjectDirectoryNotFound(PathBuf::from("/nope"))));
    }

    #[test]
    fn gated_errors_follow_their_switch() {
        let strict = FailurePolicy::default();
        assert!(strict.check(submission_error()).is_err());
        assert!(FailurePolicy::lenient().check(submission_error()).is_ok());

        let only_parse = FailurePolicy {
            fail_on_xml_parse_error: true,
            ..FailurePolicy::lenient()
        };
        let parse = ReporterError::Parse {
            path: PathBuf::from("jacoco.xml"),
            message: "bad".into(),
        };
        assert!(only_parse.is_fatal(&parse));
        assert!(!only_parse.is_fatal(&submission_error()));
        assert!(!only_parse.is_fatal(&ReporterError::ReportNotFound));
    }
}
