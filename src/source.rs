//! Work-item sources: case files and generated backlogs.
//!
//! The exchange format is the delimited text the bench tooling already
//! emits: an `M,ID` header line followed by one `value,id` record per line.
//! Blank lines are tolerated anywhere; ids must be unique within a file.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

/// Case-file header, fixed by the bench tooling.
const HEADER: &str = "M,ID";

/// One unit of work: message `value` to raise, `id` unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub id: u64,
    pub value: u64,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read case file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write case file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("case file {path} has no header line")]
    Empty { path: PathBuf },

    #[error("case file {path} line {line}: expected `{HEADER}` header, found {found:?}")]
    BadHeader {
        path: PathBuf,
        line: usize,
        found: String,
    },

    #[error("case file {path} line {line}: {reason}")]
    BadRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("case file {path} line {line}: duplicate id {id}")]
    DuplicateId { path: PathBuf, line: usize, id: u64 },

    #[error("cannot draw case values from the empty range {lo}..={hi}")]
    EmptyRange { lo: u64, hi: u64 },
}

/// Parse a case file into work items, preserving file order.
pub fn load_cases(path: &Path) -> Result<Vec<WorkItem>, SourceError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        None => {
            return Err(SourceError::Empty { path: path.to_path_buf() });
        }
        Some((line, header)) if !header.eq_ignore_ascii_case(HEADER) => {
            return Err(SourceError::BadHeader {
                path: path.to_path_buf(),
                line,
                found: header.to_string(),
            });
        }
        Some(_) => {}
    }

    let mut items = Vec::new();
    let mut seen = HashSet::new();
    for (line, record) in lines {
        let item = parse_record(record).map_err(|reason| SourceError::BadRecord {
            path: path.to_path_buf(),
            line,
            reason,
        })?;
        if !seen.insert(item.id) {
            return Err(SourceError::DuplicateId {
                path: path.to_path_buf(),
                line,
                id: item.id,
            });
        }
        items.push(item);
    }

    debug!(path = %path.display(), items = items.len(), "case file loaded");
    Ok(items)
}

fn parse_record(record: &str) -> Result<WorkItem, String> {
    let mut fields = record.split(',');
    let (Some(value), Some(id), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(format!("expected two comma-separated fields, found {record:?}"));
    };
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad value {:?}: {e}", value.trim()))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad id {:?}: {e}", id.trim()))?;
    Ok(WorkItem { id, value })
}

/// Write work items out in the same `M,ID` format [`load_cases`] reads.
pub fn write_cases(path: &Path, items: &[WorkItem]) -> Result<(), SourceError> {
    let mut out = String::with_capacity(items.len() * 16 + HEADER.len() + 1);
    out.push_str(HEADER);
    out.push('\n');
    for item in items {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{},{}", item.value, item.id);
    }
    fs::write(path, out).map_err(|source| SourceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Generate `count` random cases with ids numbered densely from zero.
///
/// A fixed `seed` makes the backlog reproducible; `None` draws the seed from
/// the operating system.
pub fn generate_cases(
    count: usize,
    values: RangeInclusive<u64>,
    seed: Option<u64>,
) -> Result<Vec<WorkItem>, SourceError> {
    if values.is_empty() {
        return Err(SourceError::EmptyRange {
            lo: *values.start(),
            hi: *values.end(),
        });
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    Ok((0..count as u64)
        .map(|id| WorkItem {
            id,
            value: rng.random_range(values.clone()),
        })
        .collect())
}
