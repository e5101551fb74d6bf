//! Index Admin Port (Trait Interface)
//!
//! The only database surface reconciliation needs:
//! - MongoDB: `MongoIndexAdmin` (production)
//! - Testing: `InMemoryIndexAdmin` (emulated server, fault injection)

use async_trait::async_trait;

use super::models::{ExistingIndex, IndexSpec};
use crate::Result;

/// Index administration on one database
///
/// Every call is one blocking round-trip from the caller's point of view;
/// reconciliation awaits each call before issuing the next.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    /// List every index currently on `collection`
    ///
    /// A collection that does not exist yet has no indexes and is not an
    /// error.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<ExistingIndex>>;

    /// Create `spec` on `collection`, returning the created index name
    ///
    /// # Errors
    ///
    /// - `ErrorKind::DuplicateKey` if a unique build hits duplicate values
    /// - `ErrorKind::OptionsConflict` if the key pattern already exists
    ///   under another name or with other options
    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<String>;

    /// Drop the index called `name` from `collection`
    async fn drop_index(&self, collection: &str, name: &str) -> Result<()>;
}
