// ABOUTME: Warnings, per-account diffs and the final audit report.
// ABOUTME: ReportBuilder is the per-run accumulator consumed into an AuditReport at the end.

use crate::error::AuditError;
use crate::policy::AuditFinding;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Advisory condition that never changes findings but keeps a run from passing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Accounts served by this backend were not enumerated.
    ExcludedBackend { backend: String },
    /// sshd consults an AuthorizedKeysCommand whose output cannot be audited from files.
    KeysCommand { account: String, command: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExcludedBackend { backend } => write!(
                f,
                "accounts from name service backend '{backend}' are not audited (not in allowed_backends)"
            ),
            Warning::KeysCommand { account, command } => write!(
                f,
                "AuthorizedKeysCommand '{command}' is configured for {account}; keys it returns are not audited"
            ),
        }
    }
}

impl Serialize for Warning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Before/after view of one non-compliant account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    /// Entries to remove, one per line.
    pub before: String,
    /// Entries to add, one per line.
    pub after: String,
    pub before_header: String,
    pub after_header: String,
}

impl DiffEntry {
    fn from_finding(account: &str, finding: &AuditFinding) -> Self {
        let header = format!("authorized_keys ({account})");
        Self {
            before: finding.removals(),
            after: finding.additions(),
            before_header: header.clone(),
            after_header: header,
        }
    }
}

/// Result of one audit run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Something was found: a policy violation or a warning.
    pub changed: bool,
    /// The run did not pass (violations outside check mode, or account errors).
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Effective authorized_keys entries per account.
    pub authorized_keys: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<Warning>,
    /// One entry per non-compliant account, ordered by account name.
    pub diff: Vec<DiffEntry>,
    /// Accounts that could not be audited, with the reason.
    pub errors: BTreeMap<String, String>,
}

impl AuditReport {
    /// Any finding or any warning.
    pub fn has_violations(&self) -> bool {
        !self.diff.is_empty() || !self.warnings.is_empty()
    }
}

/// Per-run accumulator for results from every account.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    authorized_keys: BTreeMap<String, Vec<String>>,
    findings: BTreeMap<String, AuditFinding>,
    warnings: Vec<Warning>,
    errors: BTreeMap<String, String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn record_keys(&mut self, account: &str, keys: Vec<String>) {
        self.authorized_keys.insert(account.to_string(), keys);
    }

    pub fn record_finding(&mut self, account: &str, finding: AuditFinding) {
        self.findings.insert(account.to_string(), finding);
    }

    pub fn record_error(&mut self, account: &str, error: &AuditError) {
        let entry = self.errors.entry(account.to_string()).or_default();
        if !entry.is_empty() {
            entry.push_str("; ");
        }
        entry.push_str(&error.to_string());
    }

    /// Build the report. In check mode violations mark the run `changed`
    /// only; otherwise they also fail it.
    pub fn finish(self, check_mode: bool) -> AuditReport {
        let diff: Vec<DiffEntry> = self
            .findings
            .iter()
            .filter(|(_, finding)| !finding.is_compliant())
            .map(|(account, finding)| DiffEntry::from_finding(account, finding))
            .collect();

        let mut report = AuditReport {
            changed: false,
            failed: false,
            msg: None,
            authorized_keys: self.authorized_keys,
            warnings: self.warnings,
            diff,
            errors: self.errors,
        };

        report.changed = report.has_violations();
        report.failed = !report.errors.is_empty() || (report.changed && !check_mode);
        if report.failed {
            report.msg = Some(failure_message(&report));
        }
        report
    }
}

fn failure_message(report: &AuditReport) -> String {
    let mut msg: String = report
        .diff
        .iter()
        .map(|entry| format!("{}{}", entry.after, entry.before))
        .collect();
    for warning in &report.warnings {
        msg.push_str(&format!("warning: {warning}\n"));
    }
    for (account, error) in &report.errors {
        msg.push_str(&format!("error ({account}): {error}\n"));
    }
    msg
}
