//! Key signatures
//!
//! A signature is the canonical string form of an ordered key list:
//! `field:direction` pairs in declared order joined by `", "`.
//! Two key lists have equal signatures iff they name the same fields in the
//! same order with the same per-field direction. `\`, `:` and `,` inside
//! field names (and non-directional key types) are backslash-escaped so no
//! field name can impersonate a separator.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::IndexKey;

/// Canonical, order-sensitive key signature
///
/// # Examples
///
/// ```rust
/// use index_reconciler::domain::{asc, desc, KeySignature};
///
/// let sig = KeySignature::of(&[asc("user_id"), desc("created_at")]);
/// assert_eq!(sig.as_str(), "user_id:1, created_at:-1");
/// assert_ne!(sig, KeySignature::of(&[desc("created_at"), asc("user_id")]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySignature(String);

impl KeySignature {
    pub fn of(keys: &[IndexKey]) -> Self {
        let parts: Vec<String> = keys
            .iter()
            .map(|key| {
                format!(
                    "{}:{}",
                    escape(&key.field),
                    escape(&key.direction.to_string())
                )
            })
            .collect();
        Self(parts.join(", "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if matches!(c, '\\' | ':' | ',') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
