// ABOUTME: SHA256 fingerprints for authorized_keys entries, for display only.
// ABOUTME: Parses option-prefixed entries with ssh-key; policy matching never uses these.

use crate::error::{AuditError, Result};
use ssh_key::authorized_keys::Entry;
use ssh_key::HashAlg;

/// Compute the `SHA256:<base64>` fingerprint of an authorized_keys line,
/// as printed by `ssh-keygen -l`.
///
/// Leading option clauses (`from=`, `restrict`, ...) and trailing comments
/// are accepted. Any key algorithm is supported.
///
/// # Errors
/// Returns `AuditError::ParseKey` if the line is not a valid entry.
pub fn compute_fingerprint(entry: &str) -> Result<String> {
    let parsed: Entry = entry.trim().parse().map_err(AuditError::ParseKey)?;
    Ok(parsed.public_key().fingerprint(HashAlg::Sha256).to_string())
}

/// Fingerprint for reports: the fingerprint, or `unparseable` when the entry
/// is not a valid key line.
pub fn display_fingerprint(entry: &str) -> String {
    compute_fingerprint(entry).unwrap_or_else(|_| "unparseable".to_string())
}
