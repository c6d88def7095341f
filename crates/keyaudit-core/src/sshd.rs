// ABOUTME: Per-account authorized_keys locations from sshd's effective configuration.
// ABOUTME: Runs `sshd -C host=,addr=,user=<name> -T` and parses AuthorizedKeysFile/AuthorizedKeysCommand.

use crate::accounts::Account;
use crate::error::{AuditError, Result};
use crate::exec;
use crate::report::Warning;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

const KEYS_FILE_DIRECTIVE: &str = "authorizedkeysfile";
const KEYS_COMMAND_DIRECTIVE: &str = "authorizedkeyscommand";

/// Where sshd looks for an account's authorized keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKeysSource {
    /// Path templates, before token expansion, in sshd's order.
    pub templates: Vec<String>,
    /// Set when the templates come from an explicit override instead of sshd.
    pub overridden: bool,
    /// AuthorizedKeysCommand in effect, if any.
    pub keys_command: Option<String>,
}

impl AuthorizedKeysSource {
    fn from_override(path: &str) -> Self {
        Self {
            templates: vec![path.to_string()],
            overridden: true,
            keys_command: None,
        }
    }
}

/// Parse `sshd -T` output.
///
/// The last AuthorizedKeysFile line wins. An AuthorizedKeysCommand other than
/// `none` is recorded but does not alter the path list.
pub fn parse_effective_config(stdout: &str) -> AuthorizedKeysSource {
    let mut source = AuthorizedKeysSource {
        templates: Vec::new(),
        overridden: false,
        keys_command: None,
    };

    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let Some(directive) = fields.next() else {
            continue;
        };
        match directive {
            KEYS_FILE_DIRECTIVE => {
                source.templates = fields.map(str::to_string).collect();
            }
            KEYS_COMMAND_DIRECTIVE => {
                let command = fields.collect::<Vec<_>>().join(" ");
                source.keys_command = if command.is_empty() || command == "none" {
                    None
                } else {
                    Some(command)
                };
            }
            _ => {}
        }
    }

    source
}

/// Queries sshd's configuration test mode for each account.
#[derive(Debug, Clone)]
pub struct SshdResolver {
    sshd: PathBuf,
    config: PathBuf,
    timeout: Duration,
}

impl SshdResolver {
    pub fn new(sshd: impl Into<PathBuf>, config: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            sshd: sshd.into(),
            config: config.into(),
            timeout,
        }
    }

    /// Resolve where `account`'s keys live.
    ///
    /// With `override_path`, sshd is not consulted and no warnings are produced.
    pub async fn resolve(
        &self,
        account: &Account,
        override_path: Option<&str>,
    ) -> Result<(AuthorizedKeysSource, Vec<Warning>)> {
        if let Some(path) = override_path {
            return Ok((AuthorizedKeysSource::from_override(path), Vec::new()));
        }

        // host and addr must be present, even empty, for some sshd builds to match on user
        let connection = format!("host=,addr=,user={}", account.name);
        let args: [&OsStr; 5] = [
            OsStr::new("-C"),
            OsStr::new(&connection),
            OsStr::new("-T"),
            OsStr::new("-f"),
            self.config.as_os_str(),
        ];

        let output = match exec::run(&self.sshd, args, self.timeout).await {
            Err(AuditError::Timeout { secs, .. }) => {
                return Err(AuditError::Timeout {
                    operation: format!("sshd -T for {}", account.name),
                    secs,
                })
            }
            other => other?,
        };
        if !output.status.success() {
            return Err(AuditError::ConfigurationInvalid {
                account: account.name.clone(),
                detail: exec::describe_failure(&output),
            });
        }

        let source = parse_effective_config(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(
            account = %account.name,
            templates = ?source.templates,
            "Resolved AuthorizedKeysFile"
        );

        let mut warnings = Vec::new();
        if let Some(command) = &source.keys_command {
            tracing::warn!(account = %account.name, command = %command, "AuthorizedKeysCommand in use");
            warnings.push(Warning::KeysCommand {
                account: account.name.clone(),
                command: command.clone(),
            });
        }

        Ok((source, warnings))
    }
}
