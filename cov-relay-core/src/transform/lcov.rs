//! LCOV tracefiles (`SF:` / `DA:` / `end_of_record`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{
    relative_name, resolve_in_roots, ParsedCoverage, ReportFormat, ReportParser, SourceCoverage,
    TransformError, TransformInput,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct LcovParser;

impl ReportParser for LcovParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Lcov
    }

    fn parse(&self, input: &TransformInput<'_>) -> Result<ParsedCoverage, TransformError> {
        let content = fs::read_to_string(&input.report.path)?;
        parse_str(&content, input)
    }
}

fn parse_str(content: &str, input: &TransformInput<'_>) -> Result<ParsedCoverage, TransformError> {
    // Records for the same file are merged; first appearance fixes the order.
    let mut sources: Vec<SourceCoverage> = Vec::new();
    let mut current: Option<(String, BTreeMap<u32, u32>)> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let line_no = index + 1;
        if line.is_empty() {
            continue;
        }
        if line == "end_of_record" {
            if let Some(record) = current.take() {
                finish_record(record, input, &mut sources);
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(malformed(line_no, "expected KEY:value"));
        };
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(malformed(line_no, "invalid record key"));
        }
        match key {
            "SF" => {
                if let Some(record) = current.take() {
                    finish_record(record, input, &mut sources);
                }
                current = Some((value.trim().to_string(), BTreeMap::new()));
            }
            "DA" => {
                let Some((_, lines)) = current.as_mut() else {
                    return Err(malformed(line_no, "DA outside of a source file record"));
                };
                let mut fields = value.split(',');
                let nr = fields
                    .next()
                    .and_then(|f| f.trim().parse::<u32>().ok())
                    .ok_or_else(|| malformed(line_no, "invalid line number"))?;
                let hits = fields
                    .next()
                    .and_then(|f| f.trim().parse::<u64>().ok())
                    .ok_or_else(|| malformed(line_no, "invalid hit count"))?;
                let hits = u32::try_from(hits).unwrap_or(u32::MAX);
                let entry = lines.entry(nr).or_insert(0);
                *entry = entry.saturating_add(hits);
            }
            _ => {}
        }
    }
    if let Some(record) = current.take() {
        finish_record(record, input, &mut sources);
    }

    Ok(ParsedCoverage { sources })
}

fn finish_record(
    (source, lines): (String, BTreeMap<u32, u32>),
    input: &TransformInput<'_>,
    sources: &mut Vec<SourceCoverage>,
) {
    if lines.is_empty() {
        return;
    }
    let filename = resolve_source(Path::new(&source), input)
        .and_then(|found| relative_name(input.base_dir, &found));

    let existing = filename
        .as_deref()
        .and_then(|name| sources.iter_mut().find(|s| s.filename.as_deref() == Some(name)));
    match existing {
        Some(existing) => {
            for (nr, hits) in lines {
                let entry = existing.lines.entry(nr).or_insert(0);
                *entry = entry.saturating_add(hits);
            }
        }
        None => sources.push(SourceCoverage {
            source,
            filename,
            lines,
        }),
    }
}

fn resolve_source(source: &Path, input: &TransformInput<'_>) -> Option<PathBuf> {
    if source.is_absolute() {
        return source.is_file().then(|| source.to_path_buf());
    }
    let from_base = input.base_dir.join(source);
    if from_base.is_file() {
        return Some(from_base);
    }
    resolve_in_roots(input.source_roots, source)
}

fn malformed(line_no: usize, what: &str) -> TransformError {
    TransformError::Malformed(format!("line {line_no}: {what}"))
}
