// ABOUTME: Rendering of audit reports for automation (JSON) and people (text).
// ABOUTME: Also maps the report verdict onto the process exit code.

use crate::args::Format;
use anyhow::{Context, Result};
use keyaudit_core::{display_fingerprint, AuditReport};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Render `report` in the requested format.
pub fn render(report: &AuditReport, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(report).context("Failed to serialize report"),
        Format::Text => Ok(render_text(report)),
    }
}

/// Exit code for the enclosing command: 1 when the run failed.
pub fn exit_code(report: &AuditReport) -> i32 {
    if report.failed {
        1
    } else {
        0
    }
}

fn verdict(report: &AuditReport) -> &'static str {
    if report.failed {
        "FAILED"
    } else if report.changed {
        "CHANGED"
    } else {
        "OK"
    }
}

/// Human-readable diff with key fingerprints next to each flagged entry.
pub fn render_text(report: &AuditReport) -> String {
    let audited: BTreeSet<&String> = report
        .authorized_keys
        .keys()
        .chain(report.errors.keys())
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} account(s) audited, {} with violations, {} warning(s), {} error(s)",
        audited.len(),
        report.diff.len(),
        report.warnings.len(),
        report.errors.len()
    );

    for warning in &report.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }

    for entry in &report.diff {
        let _ = writeln!(out, "--- {}", entry.before_header);
        let _ = writeln!(out, "+++ {}", entry.after_header);
        for line in entry.before.lines() {
            let _ = writeln!(out, "-{line}  [{}]", display_fingerprint(line));
        }
        for line in entry.after.lines() {
            let _ = writeln!(out, "+{line}  [{}]", display_fingerprint(line));
        }
    }

    for (account, error) in &report.errors {
        let _ = writeln!(out, "error ({account}): {error}");
    }

    let _ = write!(out, "result: {}", verdict(report));
    out
}
