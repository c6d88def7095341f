// ABOUTME: Audit engine for effective SSH authorized_keys per account.
// ABOUTME: Enumerates accounts, asks sshd where keys live, loads them and checks a key policy.

//! # keyaudit-core
//!
//! Determines, per account, the authorized_keys entries sshd would honor and
//! checks them against a required/allowed/forbidden policy.
//!
//! ```text
//! accounts ──▶ sshd ──▶ tokens ──▶ keys ──▶ policy ──▶ report
//! ```
//!
//! - [`accounts`]: name service enumeration with backend allow-listing
//! - [`sshd`]: `sshd -T` per account for AuthorizedKeysFile/AuthorizedKeysCommand
//! - [`tokens`]: `%u`, `%U`, `%h`, `%%` expansion
//! - [`keys`]: authorized_keys loading
//! - [`policy`]: the three-list policy check
//! - [`report`]: warnings, diffs and the final verdict
//! - [`engine`]: the run itself

pub mod accounts;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod fingerprint;
pub mod keys;
pub mod policy;
pub mod report;
pub mod sshd;
pub mod tokens;

pub use accounts::{Account, AccountEnumerator, Enumeration};
pub use config::AuditConfig;
pub use engine::{run_audit, AuditRequest};
pub use error::{AuditError, Result};
pub use fingerprint::{compute_fingerprint, display_fingerprint};
pub use keys::LoadedKeys;
pub use policy::{AuditFinding, Policy};
pub use report::{AuditReport, DiffEntry, ReportBuilder, Warning};
pub use sshd::{AuthorizedKeysSource, SshdResolver};
