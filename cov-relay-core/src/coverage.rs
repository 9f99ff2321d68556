//! Normalised coverage model shared by every report format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coverage for one report, scoped to one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Percentage of coverable lines hit across all files.
    pub total: u32,
    pub file_reports: Vec<FileCoverage>,
}

/// Line coverage for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Path relative to the repository base directory, `/`-separated.
    pub filename: String,
    pub total: u32,
    /// Line number to hit count. Only coverable lines are present.
    pub coverage: BTreeMap<u32, u32>,
}

impl FileCoverage {
    pub fn new(filename: impl Into<String>, coverage: BTreeMap<u32, u32>) -> Self {
        let total = percentage(covered_lines(&coverage), coverage.len());
        Self {
            filename: filename.into(),
            total,
            coverage,
        }
    }

    pub fn covered(&self) -> usize {
        covered_lines(&self.coverage)
    }
}

impl CoverageReport {
    pub fn new(file_reports: Vec<FileCoverage>) -> Self {
        let coverable: usize = file_reports.iter().map(|f| f.coverage.len()).sum();
        let covered: usize = file_reports.iter().map(FileCoverage::covered).sum();
        Self {
            total: percentage(covered, coverable),
            file_reports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_reports.is_empty()
    }
}

fn covered_lines(coverage: &BTreeMap<u32, u32>) -> usize {
    coverage.values().filter(|hits| **hits > 0).count()
}

fn percentage(covered: usize, coverable: usize) -> u32 {
    if coverable == 0 {
        return 0;
    }
    ((covered * 100) / coverable) as u32
}
