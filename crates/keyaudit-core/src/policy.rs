// ABOUTME: Three-list key policy (required, allowed, forbidden) and its evaluation.
// ABOUTME: Produces per-account findings by exact string comparison of authorized_keys lines.

use serde::{Deserialize, Serialize};

/// Operator-supplied key policy, shared by every account in a run.
///
/// Empty lists are asymmetric on purpose: an empty `required` is trivially
/// satisfied, while an empty `allowed` or `forbidden` imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Entries every account must have.
    #[serde(default)]
    pub required: Vec<String>,
    /// When non-empty, the only entries an account may have.
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Entries no account may have.
    #[serde(default)]
    pub forbidden: Vec<String>,
}

/// Outcome of auditing one account's keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    /// Required entries absent from the account, in policy order.
    pub missing: Vec<String>,
    /// Present entries not on a non-empty allow-list, in key order.
    pub disallowed: Vec<String>,
    /// Present entries on the forbid-list, in key order.
    pub forbidden: Vec<String>,
}

impl AuditFinding {
    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty() && self.disallowed.is_empty() && self.forbidden.is_empty()
    }

    /// Entries that would have to be added, one per line.
    pub fn additions(&self) -> String {
        join_lines(&self.missing)
    }

    /// Entries that would have to be removed (disallowed, then forbidden), one per line.
    pub fn removals(&self) -> String {
        let mut removals = join_lines(&self.disallowed);
        removals.push_str(&join_lines(&self.forbidden));
        removals
    }
}

fn join_lines(entries: &[String]) -> String {
    entries.iter().map(|e| format!("{e}\n")).collect()
}

impl Policy {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.allowed.is_empty() && self.forbidden.is_empty()
    }

    /// Check `keys` against this policy.
    ///
    /// The three checks are independent: a key may be reported both as
    /// disallowed and as forbidden, and duplicates in `keys` are reported
    /// once per occurrence.
    pub fn audit(&self, keys: &[String]) -> AuditFinding {
        let missing = self
            .required
            .iter()
            .filter(|required| !keys.contains(required))
            .cloned()
            .collect();

        let disallowed = if self.allowed.is_empty() {
            Vec::new()
        } else {
            keys.iter()
                .filter(|key| !self.allowed.contains(key))
                .cloned()
                .collect()
        };

        let forbidden = if self.forbidden.is_empty() {
            Vec::new()
        } else {
            keys.iter()
                .filter(|key| self.forbidden.contains(key))
                .cloned()
                .collect()
        };

        AuditFinding {
            missing,
            disallowed,
            forbidden,
        }
    }
}
