// ABOUTME: Bounded execution of external programs (sshd, getent).
// ABOUTME: Captures stdout/status and kills the child when the timeout elapses.

use crate::error::{AuditError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Run `program` with `args`, waiting at most `timeout` for it to exit.
///
/// Stdin is closed and stderr is captured alongside stdout. The child is
/// killed if the timeout elapses or the future is dropped.
pub async fn run<I, S>(program: &Path, args: I, timeout: Duration) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.display().to_string();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AuditError::Spawn {
            program: program_name.clone(),
            source: e,
        })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AuditError::Spawn {
            program: program_name,
            source: e,
        }),
        Err(_) => {
            tracing::error!(program = %program_name, timeout_secs = timeout.as_secs(), "External program timed out");
            Err(AuditError::Timeout {
                operation: program_name,
                secs: timeout.as_secs(),
            })
        }
    }
}

/// Render a failed exit for error messages: status plus the first stderr line.
pub fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    match stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => format!("{}: {}", output.status, line),
        None => output.status.to_string(),
    }
}
