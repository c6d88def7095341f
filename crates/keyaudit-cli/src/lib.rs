// ABOUTME: Library side of the keyaudit CLI: argument parsing and report rendering.
// ABOUTME: Kept out of main.rs so both can be unit tested.

//! # keyaudit-cli
//!
//! The `keyaudit` binary audits the authorized_keys entries sshd would honor
//! for each account against a required/allowed/forbidden policy.
//!
//! ```bash
//! # Audit every local account with the default policy file
//! keyaudit
//!
//! # Dry run for one user, human-readable
//! keyaudit --user root --check --format text
//!
//! # Forbid a key ad hoc and include directory accounts from sssd
//! keyaudit --forbidden 'ssh-rsa AAAA... old@example.org' --allow-backend files --allow-backend sss
//! ```
//!
//! Exit status is 1 when the audit failed: any violation or warning outside
//! `--check`, or any account that could not be audited.

pub mod args;
pub mod output;

/// Version of the keyaudit CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
