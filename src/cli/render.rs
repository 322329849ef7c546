//! Human renderer for CLI outputs.
//!
//! This module is pure formatting; handlers gather any extra data needed.
//! The tables mirror what the hardware bench prints: a hex result table with
//! a mismatch column, and a per-item progression across the stages.

use std::collections::BTreeMap;
use std::path::Path;

use crate::pipeline::{TraceEvent, TracePoint};
use crate::report::CorrectnessReport;
use crate::schedule::KeySchedule;
use crate::timing::Projection;

/// Result table in hex, one row per admitted item, reference alongside.
pub fn render_report(report: &CorrectnessReport) -> String {
    if report.entries.is_empty() {
        return "no cases were admitted".into();
    }

    let mut out = format!(
        "results of C = M ^ {:#x} mod {:#x} (e and n in hex)\n\n",
        report.exponent, report.modulus
    );
    out.push_str(&format!(
        "{:<12} {:<20} {:<20} {}\n",
        "message id", "pipeline", "reference", "mismatch"
    ));
    out.push_str(&"-".repeat(62));
    out.push('\n');

    for entry in &report.entries {
        let pipeline = match entry.pipeline {
            Some(value) => format!("{value:#x}"),
            None => "(lost)".into(),
        };
        let mismatch = if entry.matched { "no" } else { "yes" };
        out.push_str(&format!(
            "{:<12} {:<20} {:<20} {}\n",
            entry.id,
            pipeline,
            format!("{:#x}", entry.expected),
            mismatch
        ));
    }

    out.push('\n');
    if report.all_matched() {
        out.push_str(&format!("all {} results match the reference", report.entries.len()));
    } else {
        out.push_str(&format!(
            "{} of {} results disagree with the reference",
            report.mismatches,
            report.entries.len()
        ));
    }
    out
}

/// Per-item progression: the (C, P) pair entering each stage, then the pair
/// leaving the pipe, one row per tag.
pub fn render_timeline(trace: &[TraceEvent], stages: u32) -> String {
    if trace.is_empty() {
        return "no transits were observed".into();
    }

    // Columns: one per stage entry point, plus egress.
    let columns = stages as usize + 1;
    let mut rows: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    for event in trace {
        let col = match event.point {
            TracePoint::Stage(i) => i as usize - 1,
            TracePoint::Egress => columns - 1,
        };
        let cells = rows
            .entry(event.tag)
            .or_insert_with(|| vec![String::new(); columns]);
        cells[col] = format!("C={} P={}", event.acc, event.base);
    }

    let mut headers: Vec<String> = Vec::with_capacity(columns + 1);
    headers.push("tag".into());
    for i in 1..=stages {
        headers.push(format!("stage {i}"));
    }
    headers.push("egress".into());

    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for (tag, cells) in &rows {
        widths[0] = widths[0].max(tag.to_string().len());
        for (i, cell) in cells.iter().enumerate() {
            widths[i + 1] = widths[i + 1].max(cell.len());
        }
    }

    let mut out = String::from("pipeline progression\n\n");
    let header_row = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{h:<width$}", width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ");
    let header_row = header_row.trim_end();
    out.push_str(header_row);
    out.push('\n');
    out.push_str(&"-".repeat(header_row.len()));
    out.push('\n');

    for (tag, cells) in &rows {
        let mut row = format!("{tag:<width$}", width = widths[0]);
        for (i, cell) in cells.iter().enumerate() {
            row.push_str("  ");
            row.push_str(&format!("{cell:<width$}", width = widths[i + 1]));
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out.trim_end().into()
}

/// Cycle and wall-clock projection for the synthesized target.
pub fn render_projection(p: &Projection) -> String {
    let mut out = format!("projected latency at {:.2} MHz\n", p.clock_hz as f64 / 1e6);
    out.push_str(&format!(
        "  multiplier: {}..{} cycles per multiply\n",
        p.multiplier.best, p.multiplier.worst
    ));
    out.push_str(&format!(
        "  stage:      {}..{} cycles ({:.4}..{:.4} ms)\n",
        p.stage.best, p.stage.worst, p.stage_ms_best, p.stage_ms_worst
    ));
    out.push_str(&format!(
        "  drain:      {}..{} cycles ({:.4}..{:.4} ms)",
        p.run.best, p.run.worst, p.run_ms_best, p.run_ms_worst
    ));
    out
}

/// Single-value check: the sliced walk against the reference.
pub fn render_exp(message: u64, schedule: &KeySchedule, sliced: u64, expected: u64) -> String {
    let mut out = format!(
        "{} ^ {} mod {} across {} stages\n",
        message,
        schedule.exponent(),
        schedule.modulus(),
        schedule.stage_count(),
    );
    out.push_str(&format!("  sliced:    {sliced:#x} ({sliced})\n"));
    out.push_str(&format!("  reference: {expected:#x} ({expected})\n"));
    if sliced == expected {
        out.push_str("results match");
    } else {
        out.push_str("results disagree");
    }
    out
}

pub fn render_generated(path: &Path, count: usize) -> String {
    format!("wrote {count} cases to {}", path.display())
}
