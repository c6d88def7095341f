// ABOUTME: Command-line arguments for the keyaudit binary.
// ABOUTME: Flags override the TOML policy file; policy entries given as flags extend it.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use keyaudit_core::AuditConfig;
use std::path::PathBuf;

/// Report format written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "keyaudit")]
#[command(about = "Audit effective SSH authorized_keys against a key policy")]
#[command(version)]
pub struct Cli {
    /// Policy file (defaults to ~/.config/keyaudit/policy.toml when present)
    #[arg(short, long, env = "KEYAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Audit only this user (all users when omitted)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Read this authorized_keys path instead of asking sshd (%u, %U, %h allowed)
    #[arg(long)]
    pub file: Option<String>,

    /// Path to the sshd binary
    #[arg(long, env = "KEYAUDIT_SSHD")]
    pub sshd: Option<PathBuf>,

    /// Path to the sshd config file
    #[arg(long)]
    pub sshd_config: Option<PathBuf>,

    /// Required authorized_keys entry (repeatable)
    #[arg(long = "required", value_name = "ENTRY")]
    pub required: Vec<String>,

    /// Allowed authorized_keys entry (repeatable)
    #[arg(long = "allowed", value_name = "ENTRY")]
    pub allowed: Vec<String>,

    /// Forbidden authorized_keys entry (repeatable)
    #[arg(long = "forbidden", value_name = "ENTRY")]
    pub forbidden: Vec<String>,

    /// Name service backend to enumerate (repeatable, replaces the configured set)
    #[arg(long = "allow-backend", value_name = "BACKEND")]
    pub allow_backends: Vec<String>,

    /// Name service routing table
    #[arg(long)]
    pub nsswitch: Option<PathBuf>,

    /// Path to the getent binary
    #[arg(long)]
    pub getent: Option<PathBuf>,

    /// Timeout for each external program and file read, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Number of accounts audited concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort on the first account that cannot be audited
    #[arg(long)]
    pub fail_fast: bool,

    /// Report violations without failing (dry run)
    #[arg(long)]
    pub check: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Load the policy file (explicit, or the default one if it exists) and apply flags.
    pub fn load_config(&self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::load(path)
                .with_context(|| format!("Failed to load policy file {}", path.display()))?,
            None => {
                let default_path = AuditConfig::default_path();
                if default_path.exists() {
                    tracing::debug!(path = %default_path.display(), "Using default policy file");
                    AuditConfig::load(&default_path).with_context(|| {
                        format!("Failed to load policy file {}", default_path.display())
                    })?
                } else {
                    AuditConfig::default()
                }
            }
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Overlay command-line flags onto `config`.
    pub fn apply(&self, config: &mut AuditConfig) {
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(file) = &self.file {
            config.file = Some(file.clone());
        }
        if let Some(sshd) = &self.sshd {
            config.sshd = sshd.clone();
        }
        if let Some(sshd_config) = &self.sshd_config {
            config.sshd_config = sshd_config.clone();
        }
        if let Some(nsswitch) = &self.nsswitch {
            config.nsswitch = nsswitch.clone();
        }
        if let Some(getent) = &self.getent {
            config.getent = getent.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.fail_fast {
            config.fail_fast = true;
        }
        if !self.allow_backends.is_empty() {
            config.allowed_backends = self.allow_backends.iter().cloned().collect();
        }

        config.policy.required.extend(self.required.iter().cloned());
        config.policy.allowed.extend(self.allowed.iter().cloned());
        config.policy.forbidden.extend(self.forbidden.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["keyaudit"]).unwrap();
        assert_eq!(cli.format, Format::Json);
        assert!(!cli.check);
        assert!(cli.required.is_empty());

        let mut config = AuditConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, AuditConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "keyaudit",
            "--user",
            "root",
            "--sshd",
            "/usr/sbin/sshd",
            "--allow-backend",
            "files",
            "--allow-backend",
            "sss",
            "--timeout-secs",
            "5",
            "--check",
            "--format",
            "text",
        ])
        .unwrap();

        let mut config = AuditConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.user.as_deref(), Some("root"));
        assert_eq!(config.sshd, PathBuf::from("/usr/sbin/sshd"));
        assert_eq!(config.timeout_secs, 5);
        assert!(config.allowed_backends.contains("sss"));
        assert!(cli.check);
        assert_eq!(cli.format, Format::Text);
    }

    #[test]
    fn test_policy_flags_extend_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[policy]\nallowed = [\"ssh-ed25519 AAAA a\"]").unwrap();
        let path = file.path().display().to_string();

        let cli = Cli::try_parse_from([
            "keyaudit",
            "--config",
            path.as_str(),
            "--allowed",
            "ssh-ed25519 BBBB b",
            "--forbidden",
            "ssh-rsa CCCC c",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(
            config.policy.allowed,
            vec!["ssh-ed25519 AAAA a", "ssh-ed25519 BBBB b"]
        );
        assert_eq!(config.policy.forbidden, vec!["ssh-rsa CCCC c"]);
    }

    #[test]
    fn test_missing_explicit_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml").display().to_string();
        let cli = Cli::try_parse_from(["keyaudit", "--config", path.as_str()]).unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load policy file"));
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["keyaudit", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
