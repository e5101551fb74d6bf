//! Shared fixtures for integration tests

#![allow(dead_code)]

use index_reconciler::{ExistingIndex, InMemoryIndexAdmin, Outcome, ReconcileReport};

/// Admin with the given legacy indexes already present
pub fn admin_with(indexes: &[(&str, ExistingIndex)]) -> InMemoryIndexAdmin {
    let admin = InMemoryIndexAdmin::new();
    for (collection, index) in indexes {
        admin.add_index(collection, index.clone());
    }
    admin.reset_calls();
    admin
}

/// Outcome of `collection(name)`, panicking with context when absent
pub fn outcome_of(report: &ReconcileReport, collection: &str, name: &str) -> Outcome {
    report
        .outcome(collection, name)
        .unwrap_or_else(|| panic!("no outcome for {}({})", collection, name))
        .outcome
        .clone()
}

/// Indexes on `collection` matching `keys`
pub fn matching(admin: &InMemoryIndexAdmin, collection: &str, signature: &str) -> Vec<ExistingIndex> {
    admin
        .indexes(collection)
        .into_iter()
        .filter(|index| index.signature().as_str() == signature)
        .collect()
}
