// ABOUTME: Expansion of %-tokens in AuthorizedKeysFile path templates.
// ABOUTME: Two-state scanner supporting %%, %u, %U and %h; relative results land under the home dir.

use crate::accounts::Account;
use crate::error::{AuditError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    EscapePending,
}

/// Expand the tokens in `template` for `account`.
///
/// See TOKENS in sshd_config(5). Only the tokens valid for AuthorizedKeysFile
/// that depend on the account alone are supported; anything else fails with
/// `AuditError::UnsupportedToken` so the audit never reads the wrong file.
pub fn expand(template: &str, account: &Account) -> Result<String> {
    let mut resolved = String::with_capacity(template.len());
    let mut state = State::Normal;

    for c in template.chars() {
        state = match (state, c) {
            (State::Normal, '%') => State::EscapePending,
            (State::Normal, c) => {
                resolved.push(c);
                State::Normal
            }
            (State::EscapePending, '%') => {
                resolved.push('%');
                State::Normal
            }
            (State::EscapePending, 'u') => {
                resolved.push_str(&account.name);
                State::Normal
            }
            (State::EscapePending, 'U') => {
                resolved.push_str(&account.uid.to_string());
                State::Normal
            }
            (State::EscapePending, 'h') => {
                resolved.push_str(&account.home.to_string_lossy());
                State::Normal
            }
            (State::EscapePending, other) => {
                return Err(AuditError::UnsupportedToken {
                    token: format!("%{other}"),
                    template: template.to_string(),
                });
            }
        };
    }

    if state == State::EscapePending {
        return Err(AuditError::UnsupportedToken {
            token: "%".to_string(),
            template: template.to_string(),
        });
    }

    Ok(resolved)
}

/// Expand `template` and anchor a relative result under the account's home.
pub fn resolve(template: &str, account: &Account) -> Result<PathBuf> {
    let expanded = PathBuf::from(expand(template, account)?);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(account.home.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Account {
        Account {
            name: "bob".to_string(),
            uid: 1001,
            home: PathBuf::from("/home/bob"),
            backend: "files".to_string(),
        }
    }

    #[test]
    fn test_expand_literal_percent_and_user() {
        assert_eq!(expand("%%/%u/x", &bob()).unwrap(), "%/bob/x");
    }

    #[test]
    fn test_expand_uid_and_home() {
        assert_eq!(
            expand("/etc/ssh/keys/%U", &bob()).unwrap(),
            "/etc/ssh/keys/1001"
        );
        assert_eq!(
            expand("%h/.ssh/authorized_keys", &bob()).unwrap(),
            "/home/bob/.ssh/authorized_keys"
        );
    }

    #[test]
    fn test_expand_without_tokens_is_identity() {
        assert_eq!(
            expand(".ssh/authorized_keys2", &bob()).unwrap(),
            ".ssh/authorized_keys2"
        );
    }

    #[test]
    fn test_expand_is_deterministic() {
        let template = "/srv/%u/%U/%%h/%h";
        assert_eq!(
            expand(template, &bob()).unwrap(),
            expand(template, &bob()).unwrap()
        );
        assert_eq!(expand(template, &bob()).unwrap(), "/srv/bob/1001/%h//home/bob");
    }

    #[test]
    fn test_expand_unknown_token_fails() {
        let err = expand("%z", &bob()).unwrap_err();
        match err {
            AuditError::UnsupportedToken { token, template } => {
                assert_eq!(token, "%z");
                assert_eq!(template, "%z");
            }
            other => panic!("expected UnsupportedToken, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_unknown_token_fails_for_any_account() {
        let root = Account {
            name: "root".to_string(),
            uid: 0,
            home: PathBuf::from("/root"),
            backend: "files".to_string(),
        };
        assert!(expand("%z", &root).is_err());
        // %d and %i are valid in sshd but depend on state we do not audit
        assert!(expand("/keys/%d", &root).is_err());
        assert!(expand("/keys/%i", &root).is_err());
    }

    #[test]
    fn test_expand_trailing_percent_fails() {
        assert!(matches!(
            expand("/keys/%", &bob()),
            Err(AuditError::UnsupportedToken { .. })
        ));
    }

    #[test]
    fn test_resolve_relative_joins_home() {
        assert_eq!(
            resolve(".ssh/authorized_keys", &bob()).unwrap(),
            PathBuf::from("/home/bob/.ssh/authorized_keys")
        );
    }

    #[test]
    fn test_resolve_absolute_kept() {
        assert_eq!(
            resolve("/etc/ssh/authorized_keys/%u", &bob()).unwrap(),
            PathBuf::from("/etc/ssh/authorized_keys/bob")
        );
    }
}
