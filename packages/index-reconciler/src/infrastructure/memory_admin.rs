//! In-Memory Index Admin (for testing)
//!
//! Emulates the index behaviour of a MongoDB server closely enough to
//! exercise every reconciliation branch:
//! - every collection carries the implicit `_id_` index
//! - creating an index that already exists with identical name, keys and
//!   options is a no-op
//! - same key pattern under another name, or same name with other keys or
//!   options, is an options conflict
//! - unique builds fail with a duplicate key error when stored documents
//!   already collide
//!
//! Faults can be queued per collection to simulate transient errors and
//! listing races. NOT for production use.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::domain::{asc, ExistingIndex, IndexAdmin, IndexSpec};
use crate::error::{ReconcileError, Result};

/// Name of the implicit primary key index
pub const ID_INDEX_NAME: &str = "_id_";

/// One-shot fault, consumed by the next matching call on its collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Next listing fails
    ListFails,
    /// Next listing returns nothing, as if it raced an out-of-band create
    StaleListing,
    /// Next create fails with a generic error
    CreateFails(String),
    /// Next create reports an options conflict regardless of state
    CreateConflicts,
    /// Next drop fails
    DropFails(String),
}

impl Fault {
    fn applies_to_list(&self) -> bool {
        matches!(self, Fault::ListFails | Fault::StaleListing)
    }

    fn applies_to_create(&self) -> bool {
        matches!(self, Fault::CreateFails(_) | Fault::CreateConflicts)
    }

    fn applies_to_drop(&self) -> bool {
        matches!(self, Fault::DropFails(_))
    }
}

/// Admin call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminCalls {
    pub list: usize,
    pub create: usize,
    pub drop: usize,
}

impl AdminCalls {
    /// Calls that changed (or tried to change) the index set
    pub fn mutations(&self) -> usize {
        self.create + self.drop
    }
}

#[derive(Debug, Default)]
struct CollectionState {
    indexes: Vec<ExistingIndex>,
    documents: Vec<Value>,
    faults: VecDeque<Fault>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            indexes: vec![ExistingIndex::new(ID_INDEX_NAME, [asc("_id")], false)],
            ..Self::default()
        }
    }

    fn take_fault(&mut self, applies: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let position = self.faults.iter().position(applies)?;
        self.faults.remove(position)
    }

    /// First pair of documents colliding on `spec`'s key tuple
    fn find_duplicate(&self, spec: &IndexSpec) -> Option<String> {
        let mut seen = HashSet::new();
        for doc in &self.documents {
            let tuple: Vec<Value> = spec
                .keys
                .iter()
                .map(|key| doc.get(&key.field).cloned().unwrap_or(Value::Null))
                .collect();
            let encoded = Value::Array(tuple).to_string();
            if !seen.insert(encoded.clone()) {
                return Some(encoded);
            }
        }
        None
    }
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, CollectionState>,
    calls: AdminCalls,
}

impl State {
    fn collection_mut(&mut self, collection: &str) -> &mut CollectionState {
        self.collections
            .entry(collection.to_string())
            .or_insert_with(CollectionState::new)
    }
}

/// HashMap-backed `IndexAdmin`
#[derive(Clone, Default)]
pub struct InMemoryIndexAdmin {
    state: Arc<Mutex<State>>,
}

impl InMemoryIndexAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an index directly, bypassing conflict checks (out-of-band change)
    pub fn add_index(&self, collection: &str, index: ExistingIndex) {
        self.state.lock().collection_mut(collection).indexes.push(index);
    }

    /// Store a document (a JSON object) in `collection`
    pub fn insert_document(&self, collection: &str, document: Value) {
        self.state
            .lock()
            .collection_mut(collection)
            .documents
            .push(document);
    }

    /// Queue a one-shot fault on `collection`
    pub fn inject(&self, collection: &str, fault: Fault) {
        self.state
            .lock()
            .collection_mut(collection)
            .faults
            .push_back(fault);
    }

    /// Current indexes on `collection` (not counted as a call)
    pub fn indexes(&self, collection: &str) -> Vec<ExistingIndex> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    pub fn index_names(&self, collection: &str) -> Vec<String> {
        self.indexes(collection)
            .into_iter()
            .map(|index| index.name)
            .collect()
    }

    pub fn calls(&self) -> AdminCalls {
        self.state.lock().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls = AdminCalls::default();
    }
}

#[async_trait]
impl IndexAdmin for InMemoryIndexAdmin {
    async fn list_indexes(&self, collection: &str) -> Result<Vec<ExistingIndex>> {
        let mut state = self.state.lock();
        state.calls.list += 1;

        let Some(coll) = state.collections.get_mut(collection) else {
            return Ok(Vec::new());
        };

        match coll.take_fault(Fault::applies_to_list) {
            Some(Fault::ListFails) => Err(ReconcileError::database(format!(
                "listIndexes on {} failed: connection reset by peer",
                collection
            ))),
            Some(_) => Ok(Vec::new()),
            None => Ok(coll.indexes.clone()),
        }
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<String> {
        let mut state = self.state.lock();
        state.calls.create += 1;
        let coll = state.collection_mut(collection);

        match coll.take_fault(Fault::applies_to_create) {
            Some(Fault::CreateFails(message)) => return Err(ReconcileError::database(message)),
            Some(_) => {
                return Err(ReconcileError::options_conflict(format!(
                    "(IndexOptionsConflict) index on {} conflicts with a concurrent change",
                    collection
                )))
            }
            None => {}
        }

        let name = spec.effective_name();
        let signature = spec.signature();

        if let Some(existing) = coll.indexes.iter().find(|index| index.name == name) {
            if existing.signature() == signature && existing.unique == spec.unique {
                return Ok(name);
            }
            return Err(ReconcileError::options_conflict(format!(
                "(IndexKeySpecsConflict) An existing index has the same name as the requested index: {}",
                name
            )));
        }
        if let Some(existing) = coll.indexes.iter().find(|index| index.signature() == signature) {
            return Err(ReconcileError::options_conflict(format!(
                "(IndexOptionsConflict) Index already exists with a different name: {}",
                existing.name
            )));
        }
        if spec.unique {
            if let Some(dup) = coll.find_duplicate(spec) {
                return Err(ReconcileError::duplicate_key(format!(
                    "E11000 duplicate key error collection: {} index: {} dup key: {}",
                    collection, name, dup
                )));
            }
        }

        coll.indexes.push(ExistingIndex::new(
            name.clone(),
            spec.keys.clone(),
            spec.unique,
        ));
        Ok(name)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.drop += 1;

        let Some(coll) = state.collections.get_mut(collection) else {
            return Err(ReconcileError::index_not_found(collection, name));
        };
        if let Some(Fault::DropFails(message)) = coll.take_fault(Fault::applies_to_drop) {
            return Err(ReconcileError::database(message));
        }
        if name == ID_INDEX_NAME {
            return Err(ReconcileError::database("cannot drop _id index"));
        }

        let before = coll.indexes.len();
        coll.indexes.retain(|index| index.name != name);
        if coll.indexes.len() == before {
            return Err(ReconcileError::index_not_found(collection, name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::desc;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_missing_collection_is_empty() {
        let admin = InMemoryIndexAdmin::new();
        assert!(admin.list_indexes("users").await.unwrap().is_empty());
        assert_eq!(admin.calls().list, 1);
    }

    #[tokio::test]
    async fn test_create_adds_id_index_and_spec() {
        let admin = InMemoryIndexAdmin::new();
        let spec = IndexSpec::named("idx_logins_created", [desc("created_at")]);

        let name = admin.create_index("login_records", &spec).await.unwrap();

        assert_eq!(name, "idx_logins_created");
        assert_eq!(
            admin.index_names("login_records"),
            vec!["_id_", "idx_logins_created"]
        );
    }

    #[tokio::test]
    async fn test_create_identical_is_noop() {
        let admin = InMemoryIndexAdmin::new();
        let spec = IndexSpec::unique_named("uniq_pages_slug", [asc("slug")]);

        admin.create_index("pages", &spec).await.unwrap();
        admin.create_index("pages", &spec).await.unwrap();

        assert_eq!(admin.indexes("pages").len(), 2);
    }

    #[tokio::test]
    async fn test_create_same_keys_other_name_conflicts() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index("pages", ExistingIndex::new("slug_1", [asc("slug")], true));

        let err = admin
            .create_index("pages", &IndexSpec::unique_named("uniq_pages_slug", [asc("slug")]))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::OptionsConflict);
        assert!(err.message.contains("slug_1"));
    }

    #[tokio::test]
    async fn test_create_unique_over_duplicates() {
        let admin = InMemoryIndexAdmin::new();
        admin.insert_document("users", json!({"email": "a@example.com"}));
        admin.insert_document("users", json!({"email": "a@example.com"}));

        let err = admin
            .create_index("users", &IndexSpec::unique_named("uniq_users_email", [asc("email")]))
            .await
            .unwrap_err();

        assert!(err.is_duplicate_key());
        assert!(err.message.contains("E11000"));
    }

    #[tokio::test]
    async fn test_missing_fields_collide_as_null() {
        let admin = InMemoryIndexAdmin::new();
        admin.insert_document("pages", json!({"title": "About"}));
        admin.insert_document("pages", json!({"title": "Terms"}));

        let err = admin
            .create_index("pages", &IndexSpec::unique_named("uniq_pages_slug", [asc("slug")]))
            .await
            .unwrap_err();

        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_faults_are_one_shot() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index("groups", ExistingIndex::new("idx_groups_org", [asc("organization_id")], false));
        admin.inject("groups", Fault::ListFails);

        assert!(admin.list_indexes("groups").await.is_err());
        assert_eq!(admin.list_indexes("groups").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fault_matching_skips_other_ops() {
        let admin = InMemoryIndexAdmin::new();
        admin.add_index("groups", ExistingIndex::new("idx_groups_org", [asc("organization_id")], false));
        admin.inject("groups", Fault::DropFails("not primary".to_string()));

        // the queued drop fault does not affect listing
        assert_eq!(admin.list_indexes("groups").await.unwrap().len(), 2);

        let err = admin.drop_index("groups", "idx_groups_org").await.unwrap_err();
        assert!(err.message.contains("not primary"));
        admin.drop_index("groups", "idx_groups_org").await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_unknown_and_id_index() {
        let admin = InMemoryIndexAdmin::new();
        admin.insert_document("pages", json!({"slug": "about"}));

        let err = admin.drop_index("pages", "nope").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexNotFound);
        assert!(admin.drop_index("pages", ID_INDEX_NAME).await.is_err());
        assert_eq!(admin.calls().drop, 2);
    }
}
