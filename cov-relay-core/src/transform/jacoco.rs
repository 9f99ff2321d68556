//! JaCoCo XML reports.
//!
//! Source files are located as `<package name>/<sourcefile name>` beneath the
//! project's compile source roots. A line counts as hit when it has at least
//! one covered instruction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    relative_name, resolve_in_roots, ParsedCoverage, ReportFormat, ReportParser, SourceCoverage,
    TransformError, TransformInput,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct JacocoParser;

impl ReportParser for JacocoParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Jacoco
    }

    fn parse(&self, input: &TransformInput<'_>) -> Result<ParsedCoverage, TransformError> {
        let content = fs::read_to_string(&input.report.path)?;
        parse_str(&content, input)
    }
}

struct SourceFile {
    relative: PathBuf,
    lines: BTreeMap<u32, u32>,
}

fn parse_str(content: &str, input: &TransformInput<'_>) -> Result<ParsedCoverage, TransformError> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();

    let mut depth: usize = 0;
    let mut seen_root = false;
    let mut package: Option<String> = None;
    let mut current: Option<SourceFile> = None;

    let mut sources = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if e.name().as_ref() != b"report" {
                        return Err(TransformError::Malformed(
                            "root element is not <report>".to_string(),
                        ));
                    }
                    seen_root = true;
                }
                depth += 1;
                match e.name().as_ref() {
                    b"package" => package = Some(attribute(&e, b"name")?.unwrap_or_default()),
                    b"sourcefile" => {
                        let name = attribute(&e, b"name")?.ok_or_else(|| {
                            TransformError::Malformed("<sourcefile> without name".to_string())
                        })?;
                        let relative = match &package {
                            Some(pkg) if !pkg.is_empty() => Path::new(pkg).join(&name),
                            _ => PathBuf::from(&name),
                        };
                        current = Some(SourceFile {
                            relative,
                            lines: BTreeMap::new(),
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    return Err(TransformError::Malformed(
                        "report has no content".to_string(),
                    ));
                }
                if e.name().as_ref() == b"line" {
                    if let Some(source) = current.as_mut() {
                        let (nr, hit) = line_hit(&e)?;
                        source.lines.insert(nr, hit);
                    }
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"sourcefile" => {
                        if let Some(source) = current.take() {
                            finish_source(source, input, &mut sources);
                        }
                    }
                    b"package" => package = None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TransformError::Malformed(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(TransformError::Malformed("no <report> element found".to_string()));
    }
    if depth != 0 {
        return Err(TransformError::Malformed("unexpected end of document".to_string()));
    }

    Ok(ParsedCoverage { sources })
}

fn finish_source(source: SourceFile, input: &TransformInput<'_>, sources: &mut Vec<SourceCoverage>) {
    if source.lines.is_empty() {
        return;
    }
    let filename = resolve_in_roots(input.source_roots, &source.relative)
        .and_then(|found| relative_name(input.base_dir, &found));
    sources.push(SourceCoverage {
        source: source.relative.to_string_lossy().replace('\\', "/"),
        filename,
        lines: source.lines,
    });
}

fn line_hit(e: &BytesStart<'_>) -> Result<(u32, u32), TransformError> {
    let nr = numeric_attribute(e, b"nr")?
        .ok_or_else(|| TransformError::Malformed("<line> without nr".to_string()))?;
    let covered = numeric_attribute(e, b"ci")?.unwrap_or(0);
    Ok((nr, u32::from(covered > 0)))
}

fn numeric_attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<u32>, TransformError> {
    match attribute(e, key)? {
        Some(raw) => raw.trim().parse::<u32>().map(Some).map_err(|_| {
            TransformError::Malformed(format!(
                "attribute {} is not a number: {raw:?}",
                String::from_utf8_lossy(key)
            ))
        }),
        None => Ok(None),
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, TransformError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TransformError::Malformed(err.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| TransformError::Malformed(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
