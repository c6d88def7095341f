// ABOUTME: Error types for the authorized_keys audit engine using thiserror.
// ABOUTME: Covers enumeration, sshd query, path token and key file failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while auditing authorized keys.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A directly named account does not exist in any active backend.
    #[error("user {0} does not exist")]
    UnknownAccount(String),

    /// The SSH daemon's configuration test failed for an account.
    #[error(
        "sshd configuration invalid for {account} (or insufficient privileges, try running as root): {detail}"
    )]
    ConfigurationInvalid { account: String, detail: String },

    /// A `%` token in an AuthorizedKeysFile template is not supported.
    #[error("unsupported token {token} in AuthorizedKeysFile path {template}")]
    UnsupportedToken { token: String, template: String },

    /// Failed to read an authorized_keys file for a reason other than absence.
    #[error("failed to read authorized keys from {path}: {source}")]
    ReadKeys {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the name service routing table.
    #[error("failed to read name service routing table {path}: {source}")]
    ReadRoutingTable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An identity backend listing returned a failure status.
    #[error("failed to enumerate accounts from backend {backend}: {detail}")]
    BackendQuery { backend: String, detail: String },

    /// A passwd record could not be parsed.
    #[error("malformed passwd record from backend {backend}: {record}")]
    MalformedRecord { backend: String, record: String },

    /// Failed to start an external program.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external program or file read did not finish in time.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// Failed to parse an authorized_keys entry for display.
    #[error("failed to parse authorized keys entry: {0}")]
    ParseKey(#[source] ssh_key::Error),

    /// Failed to load the policy configuration file.
    #[error("failed to load configuration from {path}: {detail}")]
    LoadConfig { path: PathBuf, detail: String },
}

/// Result type alias using AuditError.
pub type Result<T> = std::result::Result<T, AuditError>;
