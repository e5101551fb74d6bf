//! Error types for index-reconciler

use std::fmt;
use thiserror::Error;

/// Server code for a duplicate key violation (`E11000`)
pub const CODE_DUPLICATE_KEY: i32 = 11000;
/// Legacy duplicate key code still reported by some servers
pub const CODE_DUPLICATE_KEY_LEGACY: i32 = 11001;
/// Index exists under a different name or with different options
pub const CODE_INDEX_OPTIONS_CONFLICT: i32 = 85;
/// Index with the same name exists with a different key specification
pub const CODE_INDEX_KEY_SPECS_CONFLICT: i32 = 86;
/// Collection does not exist
pub const CODE_NAMESPACE_NOT_FOUND: i32 = 26;
/// Index to drop does not exist
pub const CODE_INDEX_NOT_FOUND: i32 = 27;

/// Reconciliation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic database/driver errors
    Database,
    /// Unique index build hit existing duplicate values
    DuplicateKey,
    /// Same key pattern already exists under other name/options
    OptionsConflict,
    /// Collection does not exist
    NamespaceNotFound,
    /// Named index does not exist
    IndexNotFound,
    /// Desired-state table failed validation
    InvalidDesiredState,
    /// Combined failures of one reconciliation run
    Aggregate,
    /// Configuration errors
    Config,
    /// Boot step exceeded its time budget
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::DuplicateKey => "duplicate_key",
            ErrorKind::OptionsConflict => "options_conflict",
            ErrorKind::NamespaceNotFound => "namespace_not_found",
            ErrorKind::IndexNotFound => "index_not_found",
            ErrorKind::InvalidDesiredState => "invalid_desired_state",
            ErrorKind::Aggregate => "aggregate",
            ErrorKind::Config => "config",
            ErrorKind::Timeout => "timeout",
        }
    }

    /// Map a server error code to a kind
    pub fn from_server_code(code: i32) -> Self {
        match code {
            CODE_DUPLICATE_KEY | CODE_DUPLICATE_KEY_LEGACY => ErrorKind::DuplicateKey,
            CODE_INDEX_OPTIONS_CONFLICT | CODE_INDEX_KEY_SPECS_CONFLICT => {
                ErrorKind::OptionsConflict
            }
            CODE_NAMESPACE_NOT_FOUND => ErrorKind::NamespaceNotFound,
            CODE_INDEX_NOT_FOUND => ErrorKind::IndexNotFound,
            _ => ErrorKind::Database,
        }
    }

    /// Best-effort classification from message text.
    ///
    /// Some MongoDB-compatible servers only surface the condition in the
    /// message, so codes alone are not enough.
    pub fn from_message(message: &str) -> Option<Self> {
        if message.contains("E11000") || message.to_lowercase().contains("duplicate key") {
            return Some(ErrorKind::DuplicateKey);
        }
        if message.contains("IndexOptionsConflict") || message.contains("IndexKeySpecsConflict") {
            return Some(ErrorKind::OptionsConflict);
        }
        None
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ReconcileError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ReconcileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateKey, message)
    }

    pub fn options_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OptionsConflict, message)
    }

    pub fn index_not_found(collection: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::IndexNotFound,
            format!("index not found with name [{}] on {}", name, collection),
        )
    }

    pub fn invalid_desired_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDesiredState, message)
    }

    pub fn aggregate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aggregate, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.kind == ErrorKind::DuplicateKey
    }

    pub fn is_options_conflict(&self) -> bool {
        self.kind == ErrorKind::OptionsConflict
    }
}

impl From<crate::config::ConfigError> for ReconcileError {
    fn from(err: crate::config::ConfigError) -> Self {
        ReconcileError::new(ErrorKind::Config, err.to_string()).with_source(err)
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for ReconcileError {
    fn from(err: mongodb::error::Error) -> Self {
        let message = format!("MongoDB error: {}", err);
        let kind = match server_code(&err) {
            Some(code) => match ErrorKind::from_server_code(code) {
                ErrorKind::Database => ErrorKind::from_message(&message).unwrap_or(ErrorKind::Database),
                kind => kind,
            },
            None => ErrorKind::from_message(&message).unwrap_or(ErrorKind::Database),
        };
        ReconcileError::new(kind, message).with_source(err)
    }
}

#[cfg(feature = "mongodb")]
fn server_code(err: &mongodb::error::Error) -> Option<i32> {
    use mongodb::error::{ErrorKind as DriverKind, WriteFailure};

    match err.kind.as_ref() {
        DriverKind::Command(command) => Some(command.code),
        DriverKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::duplicate_key("E11000 duplicate key error");
        assert_eq!(format!("{}", err), "[duplicate_key] E11000 duplicate key error");
    }

    #[test]
    fn test_index_not_found() {
        let err = ReconcileError::index_not_found("users", "idx_users_org");
        assert_eq!(err.kind, ErrorKind::IndexNotFound);
        assert!(err.message.contains("idx_users_org"));
        assert!(err.message.contains("users"));
    }

    #[test]
    fn test_with_source() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "socket closed");
        let err = ReconcileError::database("listIndexes failed").with_source(io_err);

        let source = err.source().unwrap();
        assert!(source.to_string().contains("socket closed"));
    }

    #[test]
    fn test_kind_from_server_code() {
        assert_eq!(ErrorKind::from_server_code(11000), ErrorKind::DuplicateKey);
        assert_eq!(ErrorKind::from_server_code(11001), ErrorKind::DuplicateKey);
        assert_eq!(ErrorKind::from_server_code(85), ErrorKind::OptionsConflict);
        assert_eq!(ErrorKind::from_server_code(86), ErrorKind::OptionsConflict);
        assert_eq!(ErrorKind::from_server_code(26), ErrorKind::NamespaceNotFound);
        assert_eq!(ErrorKind::from_server_code(27), ErrorKind::IndexNotFound);
        assert_eq!(ErrorKind::from_server_code(13), ErrorKind::Database);
    }

    #[test]
    fn test_kind_from_message() {
        assert_eq!(
            ErrorKind::from_message("E11000 duplicate key error collection: app.users"),
            Some(ErrorKind::DuplicateKey)
        );
        assert_eq!(
            ErrorKind::from_message("Duplicate Key in index"),
            Some(ErrorKind::DuplicateKey)
        );
        assert_eq!(
            ErrorKind::from_message("(IndexOptionsConflict) Index already exists with a different name"),
            Some(ErrorKind::OptionsConflict)
        );
        assert_eq!(ErrorKind::from_message("connection refused"), None);
    }

    #[test]
    fn test_predicates() {
        assert!(ReconcileError::duplicate_key("x").is_duplicate_key());
        assert!(ReconcileError::options_conflict("x").is_options_conflict());
        assert!(!ReconcileError::database("x").is_options_conflict());
    }
}
