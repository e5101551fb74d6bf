//! Snapshot loader: the indexes on one collection, keyed by signature

use std::collections::HashMap;

use tracing::warn;

use crate::config::ListingPolicy;
use crate::domain::{ExistingIndex, IndexAdmin, KeySignature};
use crate::error::Result;

/// Observed indexes of one collection at one point in time
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    by_signature: HashMap<KeySignature, ExistingIndex>,
}

impl IndexSnapshot {
    pub fn from_indexes(indexes: impl IntoIterator<Item = ExistingIndex>) -> Self {
        let by_signature = indexes
            .into_iter()
            .map(|index| (index.signature(), index))
            .collect();
        Self { by_signature }
    }

    pub fn get(&self, signature: &KeySignature) -> Option<&ExistingIndex> {
        self.by_signature.get(signature)
    }

    pub fn len(&self) -> usize {
        self.by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }
}

/// List `collection`'s indexes.
///
/// Read-only. Under `ListingPolicy::FailOpen` a listing error yields an
/// empty snapshot, which sends every desired index down the create path.
pub async fn load_snapshot<A: IndexAdmin + ?Sized>(
    admin: &A,
    collection: &str,
    policy: ListingPolicy,
) -> Result<IndexSnapshot> {
    match admin.list_indexes(collection).await {
        Ok(indexes) => Ok(IndexSnapshot::from_indexes(indexes)),
        Err(err) => match policy {
            ListingPolicy::FailOpen => {
                warn!(
                    collection,
                    error = %err,
                    "listing indexes failed; treating collection as having none"
                );
                Ok(IndexSnapshot::default())
            }
            ListingPolicy::FailClosed => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{asc, desc};
    use crate::infrastructure::{Fault, InMemoryIndexAdmin};

    #[tokio::test]
    async fn test_snapshot_keyed_by_signature() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index(
            "login_records",
            ExistingIndex::new("idx_logins_user_created", [asc("user_id"), desc("created_at")], false),
        );

        let snapshot = load_snapshot(&admin, "login_records", ListingPolicy::FailOpen)
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        let sig = KeySignature::of(&[asc("user_id"), desc("created_at")]);
        assert_eq!(snapshot.get(&sig).unwrap().name, "idx_logins_user_created");
        assert!(snapshot
            .get(&KeySignature::of(&[desc("created_at"), asc("user_id")]))
            .is_none());
    }

    #[tokio::test]
    async fn test_fail_open_returns_empty() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index("users", ExistingIndex::new("uniq_users_email", [asc("email")], true));
        admin.inject("users", Fault::ListFails);

        let snapshot = load_snapshot(&admin, "users", ListingPolicy::FailOpen)
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_fail_closed_propagates() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index("users", ExistingIndex::new("uniq_users_email", [asc("email")], true));
        admin.inject("users", Fault::ListFails);

        assert!(load_snapshot(&admin, "users", ListingPolicy::FailClosed).await.is_err());
    }
}
