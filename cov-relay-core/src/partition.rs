//! Groups transformed reports by language.

use crate::coverage::CoverageReport;
use crate::language::Language;

/// All non-empty reports for one language, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageBatch {
    pub language: Language,
    pub reports: Vec<CoverageReport>,
}

impl LanguageBatch {
    /// More than one report means the partial-submission protocol applies.
    pub fn is_partial(&self) -> bool {
        self.reports.len() > 1
    }
}

/// Partitions `(language, report)` pairs into one batch per language.
///
/// Empty reports are discarded and languages left with nothing are omitted.
/// Batches follow [`Language::ALL`]; reports within a batch keep input order.
pub fn partition_by_language<I>(transformed: I) -> Vec<LanguageBatch>
where
    I: IntoIterator<Item = (Language, CoverageReport)>,
{
    let mut buckets: Vec<Vec<CoverageReport>> = vec![Vec::new(); Language::ALL.len()];
    for (language, report) in transformed {
        if report.is_empty() {
            continue;
        }
        if let Some(slot) = Language::ALL.iter().position(|l| *l == language) {
            buckets[slot].push(report);
        }
    }

    Language::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, reports)| !reports.is_empty())
        .map(|(language, reports)| LanguageBatch { language, reports })
        .collect()
}
