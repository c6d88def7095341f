// ABOUTME: Enumeration of local accounts through the name service switch.
// ABOUTME: Reads the passwd routing table, lists allowed backends via getent and warns about the rest.

use crate::error::{AuditError, Result};
use crate::exec;
use crate::report::Warning;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database consulted in the routing table.
const PASSWD_DATABASE: &str = "passwd";

/// Backend glibc falls back to when the routing table has no passwd entry.
const FALLBACK_BACKEND: &str = "files";

/// getent exit status for "key not found or enumeration not supported".
const GETENT_NOT_FOUND: i32 = 2;

/// An account under audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub home: PathBuf,
    /// Name service backend that served this record (e.g. "files", "sss").
    pub backend: String,
}

impl Account {
    /// Parse a colon-delimited passwd record (`name:passwd:uid:gid:gecos:home:shell`).
    pub fn from_passwd_record(record: &str, backend: &str) -> Result<Self> {
        let malformed = || AuditError::MalformedRecord {
            backend: backend.to_string(),
            record: record.to_string(),
        };

        let fields: Vec<&str> = record.split(':').collect();
        if fields.len() != 7 || fields[0].is_empty() {
            return Err(malformed());
        }
        let uid = fields[2].parse::<u32>().map_err(|_| malformed())?;

        Ok(Self {
            name: fields[0].to_string(),
            uid,
            home: PathBuf::from(fields[5]),
            backend: backend.to_string(),
        })
    }
}

/// Accounts selected for a run plus any visibility warnings.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Keyed and ordered by account name.
    pub accounts: BTreeMap<String, Account>,
    pub warnings: Vec<Warning>,
}

/// Extract the ordered backend list for `database` from an nsswitch.conf body.
///
/// `[STATUS=action]` clauses are skipped. Returns `None` when the database
/// has no entry.
pub fn parse_routing_table(content: &str, database: &str) -> Option<Vec<String>> {
    for line in content.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };
        let Some((name, services)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != database {
            continue;
        }

        let mut backends = Vec::new();
        let mut in_action = false;
        for token in services.split_whitespace() {
            if in_action || token.starts_with('[') {
                in_action = !token.ends_with(']');
                continue;
            }
            backends.push(token.to_string());
        }
        return Some(backends);
    }
    None
}

/// Resolves accounts through `getent` against the system's routing table.
#[derive(Debug, Clone)]
pub struct AccountEnumerator {
    getent: PathBuf,
    routing_table: PathBuf,
    timeout: Duration,
}

impl AccountEnumerator {
    pub fn new(getent: impl Into<PathBuf>, routing_table: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            getent: getent.into(),
            routing_table: routing_table.into(),
            timeout,
        }
    }

    /// Backends configured for the passwd database, in lookup order.
    pub async fn active_backends(&self) -> Result<Vec<String>> {
        let content = match read_bounded(&self.routing_table, self.timeout).await {
            Ok(content) => content,
            Err(AuditError::ReadRoutingTable { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(
                    path = %self.routing_table.display(),
                    "Routing table missing, assuming files backend"
                );
                return Ok(vec![FALLBACK_BACKEND.to_string()]);
            }
            Err(e) => return Err(e),
        };

        match parse_routing_table(&content, PASSWD_DATABASE) {
            Some(backends) if !backends.is_empty() => Ok(backends),
            _ => Ok(vec![FALLBACK_BACKEND.to_string()]),
        }
    }

    /// Select the accounts to audit.
    ///
    /// A named account is looked up across every active backend and is always
    /// audited. Without a name, only backends in `allowed_backends` are
    /// enumerated and each excluded backend yields a warning.
    pub async fn enumerate(
        &self,
        name_filter: Option<&str>,
        allowed_backends: &BTreeSet<String>,
    ) -> Result<Enumeration> {
        let backends = self.active_backends().await?;
        let mut enumeration = Enumeration::default();

        if let Some(name) = name_filter {
            for backend in &backends {
                if let Some(account) = self.lookup(backend, name).await? {
                    tracing::debug!(account = %name, backend = %backend, "Resolved named account");
                    enumeration.accounts.insert(account.name.clone(), account);
                    return Ok(enumeration);
                }
            }
            return Err(AuditError::UnknownAccount(name.to_string()));
        }

        let mut seen = BTreeSet::new();
        for backend in &backends {
            if !seen.insert(backend.as_str()) {
                continue;
            }
            if !allowed_backends.contains(backend) {
                tracing::warn!(backend = %backend, "Name service backend excluded from audit");
                enumeration.warnings.push(Warning::ExcludedBackend {
                    backend: backend.clone(),
                });
                continue;
            }

            let accounts = self.list_backend(backend).await?;
            tracing::info!(backend = %backend, count = accounts.len(), "Enumerated accounts");
            for account in accounts {
                // The first backend in lookup order shadows later ones, as in NSS
                enumeration
                    .accounts
                    .entry(account.name.clone())
                    .or_insert(account);
            }
        }

        Ok(enumeration)
    }

    async fn list_backend(&self, backend: &str) -> Result<Vec<Account>> {
        let stdout = match self.getent(backend, None).await? {
            Some(stdout) => stdout,
            None => return Ok(Vec::new()),
        };

        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Account::from_passwd_record(line, backend))
            .collect()
    }

    async fn lookup(&self, backend: &str, name: &str) -> Result<Option<Account>> {
        let Some(stdout) = self.getent(backend, Some(name)).await? else {
            return Ok(None);
        };

        let Some(line) = stdout.lines().find(|line| !line.trim().is_empty()) else {
            return Ok(None);
        };
        let account = Account::from_passwd_record(line, backend)?;
        // getent treats an all-digit key as a uid; only an exact name match counts
        if account.name != name {
            tracing::debug!(
                backend = %backend,
                requested = %name,
                found = %account.name,
                "Lookup matched a different account"
            );
            return Ok(None);
        }
        Ok(Some(account))
    }

    /// Run `getent -s <backend> passwd [name]`; `None` means nothing matched.
    async fn getent(&self, backend: &str, name: Option<&str>) -> Result<Option<String>> {
        let mut args = vec!["-s", backend, PASSWD_DATABASE];
        args.extend(name);

        let output = exec::run(&self.getent, &args, self.timeout).await?;
        if output.status.code() == Some(GETENT_NOT_FOUND) {
            return Ok(None);
        }
        if !output.status.success() {
            return Err(AuditError::BackendQuery {
                backend: backend.to_string(),
                detail: exec::describe_failure(&output),
            });
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

async fn read_bounded(path: &Path, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, tokio::fs::read_to_string(path)).await {
        Ok(result) => result.map_err(|e| AuditError::ReadRoutingTable {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(_) => Err(AuditError::Timeout {
            operation: format!("reading {}", path.display()),
            secs: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passwd_record() {
        let account =
            Account::from_passwd_record("alice:x:1000:1000:Alice,,,:/home/alice:/bin/bash", "files")
                .unwrap();
        assert_eq!(account.name, "alice");
        assert_eq!(account.uid, 1000);
        assert_eq!(account.home, PathBuf::from("/home/alice"));
        assert_eq!(account.backend, "files");
    }

    #[test]
    fn test_parse_passwd_record_rejects_short_record() {
        let result = Account::from_passwd_record("alice:x:1000", "files");
        assert!(matches!(result, Err(AuditError::MalformedRecord { .. })));
    }

    #[test]
    fn test_parse_passwd_record_rejects_bad_uid() {
        let result = Account::from_passwd_record("alice:x:abc:1000::/home/alice:/bin/sh", "sss");
        match result {
            Err(AuditError::MalformedRecord { backend, .. }) => assert_eq!(backend, "sss"),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_routing_table_basic() {
        let content = "passwd: files ldap\ngroup: files\n";
        assert_eq!(
            parse_routing_table(content, "passwd"),
            Some(vec!["files".to_string(), "ldap".to_string()])
        );
    }

    #[test]
    fn test_routing_table_skips_comments_and_actions() {
        let content = "\
# /etc/nsswitch.conf
passwd:     files [NOTFOUND=return] systemd # trailing
shadow:     files
";
        assert_eq!(
            parse_routing_table(content, "passwd"),
            Some(vec!["files".to_string(), "systemd".to_string()])
        );
    }

    #[test]
    fn test_routing_table_multi_token_action() {
        let content = "passwd: sss [ NOTFOUND=return UNAVAIL=continue ] files\n";
        assert_eq!(
            parse_routing_table(content, "passwd"),
            Some(vec!["sss".to_string(), "files".to_string()])
        );
    }

    #[test]
    fn test_routing_table_missing_database() {
        assert_eq!(parse_routing_table("group: files\n", "passwd"), None);
        // "passwd" inside a comment does not count
        assert_eq!(parse_routing_table("# passwd: ldap\n", "passwd"), None);
    }

    #[tokio::test]
    async fn test_active_backends_missing_table_falls_back_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let enumerator = AccountEnumerator::new(
            "getent",
            dir.path().join("nsswitch.conf"),
            Duration::from_secs(5),
        );
        assert_eq!(enumerator.active_backends().await.unwrap(), vec!["files"]);
    }

    #[tokio::test]
    async fn test_active_backends_reads_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("nsswitch.conf");
        std::fs::write(&table, "passwd: compat sss\n").unwrap();
        let enumerator = AccountEnumerator::new("getent", &table, Duration::from_secs(5));
        assert_eq!(
            enumerator.active_backends().await.unwrap(),
            vec!["compat", "sss"]
        );
    }
}
