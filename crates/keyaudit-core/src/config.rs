// ABOUTME: Audit configuration loaded from a TOML policy file.
// ABOUTME: Every field has a default so a bare [policy] table is a valid configuration.

use crate::engine::AuditRequest;
use crate::error::{AuditError, Result};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Audit only this account (all accounts when unset)
    pub user: Option<String>,

    /// Read this authorized_keys path (tokens allowed) instead of asking sshd
    pub file: Option<String>,

    /// sshd binary used for `-T` configuration tests
    pub sshd: PathBuf,

    /// sshd configuration file passed with `-f`
    pub sshd_config: PathBuf,

    /// Name service backends whose accounts are enumerated
    pub allowed_backends: BTreeSet<String>,

    /// Name service routing table
    pub nsswitch: PathBuf,

    /// getent binary used to list backend accounts
    pub getent: PathBuf,

    /// Upper bound for each external program and file read
    pub timeout_secs: u64,

    /// Accounts audited concurrently
    pub concurrency: usize,

    /// Abort the whole run on the first account that cannot be audited
    pub fail_fast: bool,

    pub policy: Policy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            user: None,
            file: None,
            sshd: PathBuf::from("sshd"),
            sshd_config: PathBuf::from("/etc/ssh/sshd_config"),
            allowed_backends: BTreeSet::from(["files".to_string()]),
            nsswitch: PathBuf::from("/etc/nsswitch.conf"),
            getent: PathBuf::from("getent"),
            timeout_secs: 30,
            concurrency: 8,
            fail_fast: false,
            policy: Policy::default(),
        }
    }
}

impl AuditConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AuditError::LoadConfig {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| AuditError::LoadConfig {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Get the default config file path (~/.config/keyaudit/policy.toml)
    pub fn default_path() -> PathBuf {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyaudit")
            .join("policy.toml")
    }

    /// Turn this configuration into a run request.
    pub fn into_request(self, check_mode: bool) -> AuditRequest {
        AuditRequest {
            user: self.user,
            file: self.file,
            sshd: self.sshd,
            sshd_config: self.sshd_config,
            policy: self.policy,
            allowed_backends: self.allowed_backends,
            nsswitch: self.nsswitch,
            getent: self.getent,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            concurrency: self.concurrency.max(1),
            fail_fast: self.fail_fast,
            check_mode,
        }
    }
}
