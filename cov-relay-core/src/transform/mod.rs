//! Format transformers: turn one report file into [`CoverageReport`]s per language.
//!
//! Parsers only parse; they never decide whether a problem is fatal. They
//! return either a hard [`TransformError`] or a [`ParsedCoverage`] holding
//! every source entry, resolved or not. [`CoverageTransformer`] selects the
//! entries of each language, applies the [`FailurePolicy`] and yields a
//! [`TransformOutcome`].

pub mod jacoco;
pub mod lcov;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coverage::{CoverageReport, FileCoverage};
use crate::discovery::ReportFile;
use crate::error::ReporterError;
use crate::language::Language;
use crate::policy::FailurePolicy;

pub use jacoco::JacocoParser;
pub use lcov::LcovParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// JaCoCo XML (`jacoco.xml`, `jacocoTestReport.xml`, ...).
    Jacoco,
    /// LCOV tracefile (`lcov.info`, `*.lcov`).
    Lcov,
}

impl ReportFormat {
    /// Recognises a report format from the file name alone.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.starts_with("jacoco") && name.ends_with(".xml") {
            Some(ReportFormat::Jacoco)
        } else if name == "lcov.info" || name.ends_with(".lcov") {
            Some(ReportFormat::Lcov)
        } else {
            None
        }
    }
}

/// Everything a parser needs to read one report.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    pub report: &'a ReportFile,
    /// Compile source roots of the owning project, already resolved against `base_dir`.
    pub source_roots: &'a [PathBuf],
    /// Absolute repository base directory; model filenames are relative to it.
    pub base_dir: &'a Path,
}

/// One source file entry of a parsed report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCoverage {
    /// The source as named by the report. Its extension decides the owning language.
    pub source: String,
    /// Model filename, or `None` when the source did not resolve to a file under the base directory.
    pub filename: Option<String>,
    pub lines: BTreeMap<u32, u32>,
}

/// Parser output before language selection and the failure policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCoverage {
    pub sources: Vec<SourceCoverage>,
}

impl ParsedCoverage {
    /// The coverage model of `language`, plus the sources of that language that did not resolve.
    pub fn select(&self, language: Language) -> (CoverageReport, Vec<String>) {
        let mut files = Vec::new();
        let mut unresolved = Vec::new();
        for entry in &self.sources {
            if entry.lines.is_empty() || !language.owns(Path::new(&entry.source)) {
                continue;
            }
            match &entry.filename {
                Some(name) => files.push(FileCoverage::new(name.clone(), entry.lines.clone())),
                None => unresolved.push(entry.source.clone()),
            }
        }
        (CoverageReport::new(files), unresolved)
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read report: {0}")]
    Io(#[from] io::Error),
    #[error("malformed report: {0}")]
    Malformed(String),
    #[error("no parser registered for this report format")]
    UnsupportedFormat,
}

/// Parses one report format. Parsers keep every source entry; language selection happens later.
pub trait ReportParser: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn parse(&self, input: &TransformInput<'_>) -> Result<ParsedCoverage, TransformError>;
}

/// Result of transforming one report under the failure policy.
#[derive(Debug)]
pub enum TransformOutcome {
    Ok(CoverageReport),
    /// A recoverable parse failure; the report carries no coverage.
    Degraded(CoverageReport),
    Fatal(ReporterError),
}

impl TransformOutcome {
    /// Collapses the outcome; degraded reports become empty models.
    pub fn into_result(self) -> Result<CoverageReport, ReporterError> {
        match self {
            TransformOutcome::Ok(report) | TransformOutcome::Degraded(report) => Ok(report),
            TransformOutcome::Fatal(err) => Err(err),
        }
    }
}

/// Dispatches report files to the parser for their format and applies the failure policy.
pub struct CoverageTransformer {
    parsers: Vec<Box<dyn ReportParser>>,
    policy: FailurePolicy,
}

impl CoverageTransformer {
    /// Transformer with the built-in JaCoCo and LCOV parsers.
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            parsers: vec![Box::new(JacocoParser), Box::new(LcovParser)],
            policy,
        }
    }

    /// Registers an extra parser. It takes precedence over earlier ones for its format.
    pub fn with_parser(mut self, parser: Box<dyn ReportParser>) -> Self {
        self.parsers.insert(0, parser);
        self
    }

    /// Transforms one report for one language.
    pub fn transform(&self, input: &TransformInput<'_>, language: Language) -> TransformOutcome {
        match self.parse(input) {
            Ok(Some(parsed)) => self.select(input, &parsed, language),
            Ok(None) => TransformOutcome::Degraded(CoverageReport::default()),
            Err(err) => TransformOutcome::Fatal(err),
        }
    }

    /// Transforms one report for every language in [`Language::ALL`] order,
    /// reading it once. Languages without coverage in the report are omitted.
    pub fn transform_all(
        &self,
        input: &TransformInput<'_>,
    ) -> Result<Vec<(Language, CoverageReport)>, ReporterError> {
        let Some(parsed) = self.parse(input)? else {
            return Ok(Vec::new());
        };
        let mut transformed = Vec::new();
        for language in Language::ALL {
            let report = self.select(input, &parsed, language).into_result()?;
            if !report.is_empty() {
                transformed.push((language, report));
            }
        }
        Ok(transformed)
    }

    /// Parses the report. `Ok(None)` means the parse failed and the policy allows continuing.
    fn parse(&self, input: &TransformInput<'_>) -> Result<Option<ParsedCoverage>, ReporterError> {
        let path = &input.report.path;
        info!(path = %path.display(), "[TRANSFORM] Parsing report");

        let parsed = ReportFormat::detect(path)
            .and_then(|format| self.parsers.iter().find(|p| p.format() == format))
            .ok_or(TransformError::UnsupportedFormat)
            .and_then(|parser| parser.parse(input));

        match parsed {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => {
                let err = ReporterError::Parse {
                    path: path.clone(),
                    message: err.to_string(),
                };
                if self.policy.fail_on_xml_parse_error {
                    return Err(err);
                }
                warn!(error = %err, "[TRANSFORM] Treating unparseable report as empty");
                Ok(None)
            }
        }
    }

    fn select(
        &self,
        input: &TransformInput<'_>,
        parsed: &ParsedCoverage,
        language: Language,
    ) -> TransformOutcome {
        let path = &input.report.path;
        let (report, unresolved) = parsed.select(language);

        if let Some(entry) = unresolved.first() {
            if self.policy.fail_on_unknown {
                return TransformOutcome::Fatal(ReporterError::UnknownEntry {
                    path: path.clone(),
                    entry: entry.clone(),
                });
            }
            for entry in &unresolved {
                warn!(path = %path.display(), entry = %entry, "[TRANSFORM] Skipping unresolvable coverage entry");
            }
        }

        debug!(
            path = %path.display(),
            language = %language,
            files = report.file_reports.len(),
            total = report.total,
            "[TRANSFORM] Report transformed"
        );
        TransformOutcome::Ok(report)
    }
}

/// Finds `relative` beneath the first source root that contains it.
pub(crate) fn resolve_in_roots(roots: &[PathBuf], relative: &Path) -> Option<PathBuf> {
    roots
        .iter()
        .map(|root| root.join(relative))
        .find(|candidate| candidate.is_file())
}

/// Renders `path` relative to `base_dir` with `/` separators.
///
/// Falls back to comparing canonical paths when the lexical prefix does not
/// match. Returns `None` for files outside `base_dir`.
pub(crate) fn relative_name(base_dir: &Path, path: &Path) -> Option<String> {
    let lexical = path.strip_prefix(base_dir).ok().and_then(normal_components);
    let name = lexical.or_else(|| {
        let base = fs::canonicalize(base_dir).ok()?;
        let path = fs::canonicalize(path).ok()?;
        path.strip_prefix(&base).ok().and_then(normal_components)
    });
    if name.is_none() {
        warn!(
            path = %path.display(),
            base_dir = %base_dir.display(),
            "[TRANSFORM] Source file lies outside the base directory"
        );
    }
    name
}

fn normal_components(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
