// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! RFC822-style record parser.
//!
//! Records are blocks of `key: value` lines separated by blank lines. A line
//! starting with a space continues the previous value, a line holding a lone
//! `.` (after indentation) encodes an empty line inside a multi-line value
//! and lines starting with `#` are comments.
//!
//! Parsing stops at the first syntax error; every record completed before
//! the error is still returned.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Syntax error in record text, with the 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}:{line}: {message}")]
pub struct Rfc822Error {
    pub source_name: String,
    pub line: usize,
    pub message: String,
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOrigin {
    /// Human-readable source (file name, `job output of <id>`, ...)
    pub source: String,
    pub line_start: usize,
    pub line_end: usize,
}

/// One parsed record: ordered normalized key/value pairs plus origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: IndexMap<String, String>,
    pub origin: RecordOrigin,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Result of parsing a whole text: the good records and the error that
/// stopped parsing, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecords {
    pub records: Vec<Record>,
    pub error: Option<Rfc822Error>,
}

struct Pending {
    data: IndexMap<String, String>,
    line_start: Option<usize>,
    line_end: usize,
    key: Option<String>,
    values: Vec<String>,
}

impl Pending {
    fn new() -> Self {
        Self { data: IndexMap::new(), line_start: None, line_end: 0, key: None, values: Vec::new() }
    }

    fn commit_value(&mut self) {
        if let Some(key) = self.key.take() {
            let raw = self.values.join("\n");
            self.data.insert(key, normalize_value(&raw));
            self.values.clear();
        }
    }

    fn finish(mut self, source: &str) -> Option<Record> {
        self.commit_value();
        if self.data.is_empty() {
            return None;
        }
        Some(Record {
            data: self.data,
            origin: RecordOrigin {
                source: source.to_string(),
                line_start: self.line_start.unwrap_or(0),
                line_end: self.line_end,
            },
        })
    }
}

/// Parse all records from `text`, attributing them to `source`.
pub fn parse_records(text: &str, source: &str) -> ParsedRecords {
    let mut parsed = ParsedRecords::default();
    let mut pending = Pending::new();

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let error = |message: String| Rfc822Error {
            source_name: source.to_string(),
            line: lineno,
            message,
        };

        if line.starts_with('#') {
            continue;
        }
        if line.trim().is_empty() {
            if let Some(record) = std::mem::replace(&mut pending, Pending::new()).finish(source) {
                parsed.records.push(record);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if pending.key.is_none() {
                parsed.error = Some(error("unexpected multi-line value".to_string()));
                return parsed;
            }
            pending.values.push(rest.to_string());
            pending.line_end = lineno;
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            parsed.error = Some(error(format!("unexpected non-empty line: {line:?}")));
            return parsed;
        };

        pending.line_start.get_or_insert(lineno);
        pending.commit_value();
        let key = key.trim().to_string();
        if let Some(old) = pending.data.get(&key) {
            parsed.error = Some(error(format!(
                "duplicate key {key:?} with old value {old:?} and new value {:?}",
                value.trim_start()
            )));
            return parsed;
        }
        let value = value.trim_start();
        if !value.trim().is_empty() {
            pending.values.push(value.to_string());
        }
        pending.key = Some(key);
        pending.line_end = lineno;
    }

    if let Some(record) = pending.finish(source) {
        parsed.records.push(record);
    }
    parsed
}

/// Normalize a raw value: drop multi-line dot markers, remove common
/// indentation and trim.
fn normalize_value(raw: &str) -> String {
    if raw.lines().count() < 2 {
        return raw.trim().to_string();
    }
    let lines: Vec<&str> = raw
        .lines()
        .map(|line| {
            let content = line.trim_start();
            if content == "." {
                &line[..line.len() - 1]
            } else {
                line
            }
        })
        .collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - strip_indent(line).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_else(|| strip_indent(line)))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Only ASCII spaces and tabs count as indentation.
fn strip_indent(line: &str) -> &str {
    line.trim_start_matches([' ', '\t'])
}

#[cfg(test)]
#[path = "rfc822_tests.rs"]
mod tests;
