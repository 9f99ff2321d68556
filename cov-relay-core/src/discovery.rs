//! Report discovery: finds candidate coverage report files per project.
//!
//! Projects are visited in input order and each build directory is walked
//! with entries sorted by file name, so the same inputs always yield the
//! same report sequence (and therefore the same submission sequence).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ReporterError;
use crate::transform::ReportFormat;

/// Build metadata of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Build output directory; report files are searched for beneath it.
    pub directory: PathBuf,
    pub test_output_directory: PathBuf,
}

/// One module of a multi-module build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub compile_source_roots: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub build: Option<Build>,
}

impl Project {
    pub fn new(compile_source_roots: Vec<PathBuf>, build: Build) -> Self {
        Self {
            compile_source_roots: Some(compile_source_roots),
            build: Some(build),
        }
    }

    pub fn source_roots(&self) -> &[PathBuf] {
        self.compile_source_roots.as_deref().unwrap_or_default()
    }
}

/// A discovered candidate report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub path: PathBuf,
}

/// A project together with the report files found for it, in traversal order.
#[derive(Debug, Clone)]
pub struct DiscoveredProject<'a> {
    pub project: &'a Project,
    pub reports: Vec<ReportFile>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    pub ignore_test_build_directory: bool,
    /// Path fragments; a file whose path contains any of them is dropped.
    pub report_reject_list: Vec<String>,
}

/// Default inclusion predicate: accepts any file with a recognised report format.
///
/// The first argument is the owning module's test output directory.
pub fn supported_predicate() -> impl Fn(&Path, &Path) -> bool {
    |_test_output_directory: &Path, file: &Path| ReportFormat::detect(file).is_some()
}

/// Total number of report files across all discovered projects.
pub fn report_count(discovered: &[DiscoveredProject<'_>]) -> usize {
    discovered.iter().map(|d| d.reports.len()).sum()
}

/// Enumerates report files for every project that has compile source roots.
///
/// Relative build directories resolve against `base_dir`. A missing
/// `base_dir` is always an error.
pub fn discover_reports<'a, P>(
    projects: &'a [Project],
    predicate: P,
    base_dir: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<DiscoveredProject<'a>>, ReporterError>
where
    P: Fn(&Path, &Path) -> bool,
{
    if !base_dir.is_dir() {
        return Err(ReporterError::ProjectDirectoryNotFound(base_dir.to_path_buf()));
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut discovered = Vec::new();

    for project in projects {
        if project.compile_source_roots.is_none() {
            debug!(?project, "[DISCOVER] Skipping project without compile source roots");
            continue;
        }
        let Some(build) = &project.build else {
            debug!(?project, "[DISCOVER] Skipping project without build descriptor");
            continue;
        };

        let build_dir = resolve(base_dir, &build.directory);
        let test_dir = resolve(base_dir, &build.test_output_directory);
        let mut reports = Vec::new();

        if !build_dir.is_dir() {
            debug!(path = %build_dir.display(), "[DISCOVER] Build directory does not exist");
        } else {
            for entry in WalkDir::new(&build_dir).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, path = %build_dir.display(), "[DISCOVER] Skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if options.ignore_test_build_directory && path.starts_with(&test_dir) {
                    debug!(path = %path.display(), "[DISCOVER] Ignoring file in test output directory");
                    continue;
                }
                if !predicate(&test_dir, path) {
                    continue;
                }
                if is_rejected(path, &options.report_reject_list) {
                    info!(path = %path.display(), "[DISCOVER] Report rejected by reject list");
                    continue;
                }
                if !seen.insert(path.to_path_buf()) {
                    debug!(path = %path.display(), "[DISCOVER] Report already claimed by an earlier project");
                    continue;
                }
                info!(path = %path.display(), "[DISCOVER] Found report");
                reports.push(ReportFile {
                    path: path.to_path_buf(),
                });
            }
        }

        discovered.push(DiscoveredProject { project, reports });
    }

    info!(
        projects = discovered.len(),
        reports = report_count(&discovered),
        "[DISCOVER] Discovery complete"
    );
    Ok(discovered)
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn is_rejected(path: &Path, reject_list: &[String]) -> bool {
    let path = path.to_string_lossy();
    reject_list
        .iter()
        .filter(|fragment| !fragment.is_empty())
        .any(|fragment| path.contains(fragment.as_str()))
}
