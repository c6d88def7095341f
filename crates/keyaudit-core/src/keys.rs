// ABOUTME: Loads raw authorized_keys entries from resolved file paths.
// ABOUTME: Skips missing files and comment lines; keeps blank lines, order and duplicates.

use crate::error::{AuditError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Entries read for one account, plus per-file read failures.
#[derive(Debug, Default)]
pub struct LoadedKeys {
    /// Raw lines in file order, then path order.
    pub entries: Vec<String>,
    /// Files that exist but could not be read.
    pub errors: Vec<AuditError>,
}

/// Entry lines of an authorized_keys body: comment lines dropped, everything
/// else kept verbatim. Blank lines are entries too, so a policy can flag them.
pub fn parse_entries(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .filter(|line| !line.trim().starts_with('#'))
}

/// Read every path in order. A missing file contributes nothing.
pub async fn load(paths: &[PathBuf], timeout: Duration) -> LoadedKeys {
    let mut loaded = LoadedKeys::default();

    for path in paths {
        match read_keys_file(path, timeout).await {
            Ok(Some(content)) => {
                let before = loaded.entries.len();
                loaded
                    .entries
                    .extend(parse_entries(&content).map(str::to_string));
                tracing::debug!(
                    path = %path.display(),
                    entries = loaded.entries.len() - before,
                    "Loaded authorized keys"
                );
            }
            Ok(None) => {
                tracing::trace!(path = %path.display(), "No authorized keys file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read authorized keys");
                loaded.errors.push(e);
            }
        }
    }

    loaded
}

async fn read_keys_file(path: &Path, timeout: Duration) -> Result<Option<String>> {
    let read = match tokio::time::timeout(timeout, tokio::fs::read(path)).await {
        Ok(read) => read,
        Err(_) => {
            return Err(AuditError::Timeout {
                operation: format!("reading {}", path.display()),
                secs: timeout.as_secs(),
            })
        }
    };

    match read {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuditError::ReadKeys {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
