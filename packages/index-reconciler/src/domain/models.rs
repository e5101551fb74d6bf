//! Index domain models
//!
//! - `IndexSpec`: a desired index, compiled into the desired-state table
//! - `ExistingIndex`: an index observed on the database
//! - `Outcome`: what reconciliation did for one desired index

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::signature::KeySignature;

// ═══════════════════════════════════════════════════════════════════════════
// Keys
// ═══════════════════════════════════════════════════════════════════════════

/// Per-field index direction
///
/// Serializes the way the server spells it: `1`, `-1`, or the key type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    /// `1`
    Ascending,
    /// `-1`
    Descending,
    /// Non-directional key type observed on the server (`text`, `2dsphere`, ...)
    ///
    /// Never valid in a desired spec.
    Other(String),
}

impl KeyDirection {
    pub fn is_directional(&self) -> bool {
        !matches!(self, KeyDirection::Other(_))
    }
}

impl Serialize for KeyDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyDirection::Ascending => serializer.serialize_i32(1),
            KeyDirection::Descending => serializer.serialize_i32(-1),
            KeyDirection::Other(kind) => serializer.serialize_str(kind),
        }
    }
}

impl<'de> Deserialize<'de> for KeyDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Kind(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) if n > 0 => Ok(KeyDirection::Ascending),
            Raw::Number(n) if n < 0 => Ok(KeyDirection::Descending),
            Raw::Number(_) => Err(de::Error::custom("key direction 0")),
            Raw::Kind(kind) => Ok(KeyDirection::Other(kind)),
        }
    }
}

impl fmt::Display for KeyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDirection::Ascending => f.write_str("1"),
            KeyDirection::Descending => f.write_str("-1"),
            KeyDirection::Other(kind) => f.write_str(kind),
        }
    }
}

/// One `(field, direction)` entry of a compound key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub direction: KeyDirection,
}

impl IndexKey {
    pub fn new(field: impl Into<String>, direction: KeyDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Ascending key on `field`
pub fn asc(field: impl Into<String>) -> IndexKey {
    IndexKey::new(field, KeyDirection::Ascending)
}

/// Descending key on `field`
pub fn desc(field: impl Into<String>) -> IndexKey {
    IndexKey::new(field, KeyDirection::Descending)
}

/// Name the server assigns to an unnamed index (`field_1_other_-1`)
pub fn default_index_name(keys: &[IndexKey]) -> String {
    keys.iter()
        .map(|key| format!("{}_{}", key.field, key.direction))
        .collect::<Vec<_>>()
        .join("_")
}

// ═══════════════════════════════════════════════════════════════════════════
// Desired / Observed Indexes
// ═══════════════════════════════════════════════════════════════════════════

/// Desired index declaration
///
/// # Examples
///
/// ```rust
/// use index_reconciler::domain::{asc, IndexSpec};
///
/// let spec = IndexSpec::unique_named("uniq_users_email", [asc("email")]);
/// assert!(spec.unique);
/// assert_eq!(spec.effective_name(), "uniq_users_email");
///
/// let unnamed = IndexSpec::unnamed([asc("organization_id")]);
/// assert_eq!(unnamed.effective_name(), "organization_id_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Preferred name; `None` or empty means "any name is fine"
    pub name: Option<String>,
    /// Ordered compound key
    pub keys: Vec<IndexKey>,
    /// Enforce uniqueness over the combined key values
    pub unique: bool,
}

impl IndexSpec {
    /// Non-unique index with a preferred name
    pub fn named(name: impl Into<String>, keys: impl IntoIterator<Item = IndexKey>) -> Self {
        Self {
            name: Some(name.into()),
            keys: keys.into_iter().collect(),
            unique: false,
        }
    }

    /// Unique index with a preferred name
    pub fn unique_named(name: impl Into<String>, keys: impl IntoIterator<Item = IndexKey>) -> Self {
        Self::named(name, keys).with_unique(true)
    }

    /// Non-unique index whose name does not matter
    pub fn unnamed(keys: impl IntoIterator<Item = IndexKey>) -> Self {
        Self {
            name: None,
            keys: keys.into_iter().collect(),
            unique: false,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn signature(&self) -> KeySignature {
        KeySignature::of(&self.keys)
    }

    /// Declared name, if it is non-empty
    pub fn declared_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Declared name, or the server default name for these keys
    pub fn effective_name(&self) -> String {
        match self.declared_name() {
            Some(name) => name.to_string(),
            None => default_index_name(&self.keys),
        }
    }

    /// Field names in key order
    pub fn fields(&self) -> Vec<&str> {
        self.keys.iter().map(|key| key.field.as_str()).collect()
    }
}

/// Index observed on a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingIndex {
    pub name: String,
    pub keys: Vec<IndexKey>,
    /// An absent unique flag on the server means `false`
    pub unique: bool,
}

impl ExistingIndex {
    pub fn new(name: impl Into<String>, keys: impl IntoIterator<Item = IndexKey>, unique: bool) -> Self {
        Self {
            name: name.into(),
            keys: keys.into_iter().collect(),
            unique,
        }
    }

    pub fn signature(&self) -> KeySignature {
        KeySignature::of(&self.keys)
    }

    /// True when this index already satisfies `spec`
    pub fn satisfies(&self, spec: &IndexSpec) -> bool {
        self.signature() == spec.signature()
            && self.unique == spec.unique
            && spec.declared_name().map_or(true, |name| name == self.name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════════════════════

/// Failure taxonomy for one desired index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Listing failed under the fail-closed policy
    ListFailure,
    /// Create failed for a reason not otherwise classified
    CreateFailure,
    /// Promotion to unique hit existing duplicate values
    DuplicateKey,
    /// Conflict could not be re-resolved with one re-listing
    OptionsConflict,
    /// Drop of the existing index failed; paired create not attempted
    DropFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ListFailure => "list_failure",
            FailureKind::CreateFailure => "create_failure",
            FailureKind::DuplicateKey => "duplicate_key",
            FailureKind::OptionsConflict => "options_conflict",
            FailureKind::DropFailure => "drop_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of reconciling one desired index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// An equivalent index already existed; nothing was changed
    Reused,
    /// Same keys and options under another name; dropped and recreated
    Renamed,
    /// Same keys, different uniqueness; dropped and recreated
    Replaced,
    /// No index on these keys existed; created
    Created,
    /// Reconciliation failed; `message` names collection and index
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Outcome::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Reused => "reused",
            Outcome::Renamed => "renamed",
            Outcome::Replaced => "replaced",
            Outcome::Created => "created",
            Outcome::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed { kind, message } => write!(f, "failed ({}): {}", kind, message),
            other => f.write_str(other.as_str()),
        }
    }
}
