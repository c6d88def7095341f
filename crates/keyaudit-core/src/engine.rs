// ABOUTME: Runs one audit: enumerate accounts, then resolve, load and audit each one concurrently.
// ABOUTME: Per-account failures are reported without aborting the rest of the run.

use crate::accounts::{Account, AccountEnumerator};
use crate::error::{AuditError, Result};
use crate::keys;
use crate::policy::{AuditFinding, Policy};
use crate::report::{AuditReport, ReportBuilder, Warning};
use crate::sshd::SshdResolver;
use crate::tokens;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Everything one audit run needs.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub user: Option<String>,
    pub file: Option<String>,
    pub sshd: PathBuf,
    pub sshd_config: PathBuf,
    pub policy: Policy,
    pub allowed_backends: BTreeSet<String>,
    pub nsswitch: PathBuf,
    pub getent: PathBuf,
    pub timeout: Duration,
    pub concurrency: usize,
    pub fail_fast: bool,
    /// Report only; violations mark the run changed instead of failed.
    pub check_mode: bool,
}

/// Result of auditing a single account.
#[derive(Debug)]
struct AccountOutcome {
    account: String,
    /// Present once the key files were read, even partially.
    keys: Option<Vec<String>>,
    finding: Option<AuditFinding>,
    warnings: Vec<Warning>,
    errors: Vec<AuditError>,
}

impl AccountOutcome {
    fn failed(account: &Account, warnings: Vec<Warning>, error: AuditError) -> Self {
        tracing::error!(account = %account.name, error = %error, "Account could not be audited");
        Self {
            account: account.name.clone(),
            keys: None,
            finding: None,
            warnings,
            errors: vec![error],
        }
    }
}

/// Run a full audit.
///
/// Returns an error only for run-level failures (enumeration, or any account
/// failure when `fail_fast` is set); everything else lands in the report.
/// With `fail_fast`, accounts not yet started when the first failure arrives
/// are never audited.
pub async fn run_audit(request: &AuditRequest) -> Result<AuditReport> {
    let enumerator = AccountEnumerator::new(&request.getent, &request.nsswitch, request.timeout);
    let enumeration = enumerator
        .enumerate(request.user.as_deref(), &request.allowed_backends)
        .await?;

    tracing::info!(
        accounts = enumeration.accounts.len(),
        check_mode = request.check_mode,
        "Auditing authorized keys"
    );
    if request.policy.is_empty() {
        tracing::info!("Policy is empty, only collecting authorized keys");
    }

    let resolver = SshdResolver::new(&request.sshd, &request.sshd_config, request.timeout);
    let mut pending = stream::iter(enumeration.accounts.values())
        .map(|account| audit_account(account, &resolver, request))
        .buffer_unordered(request.concurrency.max(1));

    let mut outcomes: Vec<AccountOutcome> = Vec::with_capacity(enumeration.accounts.len());
    while let Some(mut outcome) = pending.next().await {
        if request.fail_fast && !outcome.errors.is_empty() {
            // Dropping the stream cancels in-flight accounts and kills their children
            tracing::error!(account = %outcome.account, "Aborting audit on first failed account");
            return Err(outcome.errors.remove(0));
        }
        outcomes.push(outcome);
    }
    // buffer_unordered yields in completion order
    outcomes.sort_by(|a, b| a.account.cmp(&b.account));

    let mut builder = ReportBuilder::new();
    builder.warn(enumeration.warnings);

    for outcome in outcomes {
        builder.warn(outcome.warnings);
        if let Some(keys) = outcome.keys {
            builder.record_keys(&outcome.account, keys);
        }
        if let Some(finding) = outcome.finding {
            builder.record_finding(&outcome.account, finding);
        }
        for error in &outcome.errors {
            builder.record_error(&outcome.account, error);
        }
    }

    let report = builder.finish(request.check_mode);
    tracing::info!(
        changed = report.changed,
        failed = report.failed,
        violations = report.diff.len(),
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        "Audit finished"
    );
    Ok(report)
}

async fn audit_account(
    account: &Account,
    resolver: &SshdResolver,
    request: &AuditRequest,
) -> AccountOutcome {
    let (source, warnings) = match resolver.resolve(account, request.file.as_deref()).await {
        Ok(resolved) => resolved,
        Err(e) => return AccountOutcome::failed(account, Vec::new(), e),
    };

    let paths = match source
        .templates
        .iter()
        .map(|template| tokens::resolve(template, account))
        .collect::<Result<Vec<_>>>()
    {
        Ok(paths) => paths,
        Err(e) => return AccountOutcome::failed(account, warnings, e),
    };

    let loaded = keys::load(&paths, request.timeout).await;
    let finding = request.policy.audit(&loaded.entries);
    if !finding.is_compliant() {
        tracing::warn!(
            account = %account.name,
            missing = finding.missing.len(),
            disallowed = finding.disallowed.len(),
            forbidden = finding.forbidden.len(),
            "Policy violation"
        );
    }

    AccountOutcome {
        account: account.name.clone(),
        keys: Some(loaded.entries),
        finding: Some(finding),
        warnings,
        errors: loaded.errors,
    }
}
