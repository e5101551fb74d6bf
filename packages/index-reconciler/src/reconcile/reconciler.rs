//! Reconciler
//!
//! Converges one collection to its desired index list, one desired index at
//! a time. Each desired index starts from a fresh snapshot, since earlier
//! steps on the same collection may have changed the index set.
//!
//! Decision per desired index:
//!
//! | observed (same key signature)       | action                   | outcome    |
//! |-------------------------------------|--------------------------|------------|
//! | none                                | create                   | `Created`  |
//! | same unique flag, same/any name     | nothing                  | `Reused`   |
//! | same unique flag, other name        | drop, create             | `Renamed`  |
//! | other unique flag                   | drop, create             | `Replaced` |
//!
//! A create that reports an options conflict is resolved with exactly one
//! re-listing; the branches reached from there never re-enter conflict
//! handling.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::ListingPolicy;
use crate::domain::{ExistingIndex, FailureKind, IndexAdmin, IndexSpec, Outcome};
use crate::error::ReconcileError;

use super::remediation::duplicate_key_message;
use super::report::{CollectionReport, IndexOutcome};
use super::snapshot::{load_snapshot, IndexSnapshot};

/// Outcome of one branch plus the index name left on the server
struct Step {
    outcome: Outcome,
    index_name: Option<String>,
}

impl Step {
    fn done(outcome: Outcome, index_name: impl Into<String>) -> Self {
        Self {
            outcome,
            index_name: Some(index_name.into()),
        }
    }

    fn failed(kind: FailureKind, message: String) -> Self {
        Self {
            outcome: Outcome::failed(kind, message),
            index_name: None,
        }
    }
}

/// Per-collection reconciler over an `IndexAdmin`
pub struct Reconciler<'a, A: IndexAdmin + ?Sized> {
    admin: &'a A,
    policy: ListingPolicy,
}

impl<'a, A: IndexAdmin + ?Sized> Reconciler<'a, A> {
    pub fn new(admin: &'a A, policy: ListingPolicy) -> Self {
        Self { admin, policy }
    }

    /// Reconcile every desired index of `collection`, in order.
    ///
    /// Never fails as a whole: each desired index gets its own outcome.
    pub async fn reconcile_collection(&self, collection: &str, specs: &[IndexSpec]) -> CollectionReport {
        let mut report = CollectionReport::new(collection);
        for spec in specs {
            report.outcomes.push(self.reconcile_index(collection, spec).await);
        }
        report
    }

    /// Reconcile one desired index against a fresh snapshot
    pub async fn reconcile_index(&self, collection: &str, spec: &IndexSpec) -> IndexOutcome {
        let started = Instant::now();
        let name = spec.effective_name();
        let signature = spec.signature();

        info!(
            collection,
            name = %name,
            keys = %signature,
            unique = spec.unique,
            "ensuring index"
        );

        let step = match load_snapshot(self.admin, collection, self.policy).await {
            Ok(snapshot) => match snapshot.get(&signature) {
                Some(existing) => self.converge(collection, spec, existing).await,
                None => self.create_missing(collection, spec).await,
            },
            Err(err) => Step::failed(
                FailureKind::ListFailure,
                tagged(collection, spec, format!("list indexes failed: {}", err.message)),
            ),
        };

        let elapsed = started.elapsed();
        match &step.outcome {
            Outcome::Reused => info!(
                collection,
                name = step.index_name.as_deref().unwrap_or(&name),
                keys = %signature,
                unique = spec.unique,
                took = ?elapsed,
                "reusing existing index"
            ),
            Outcome::Renamed => info!(
                collection,
                name = %name,
                keys = %signature,
                took = ?elapsed,
                "index renamed"
            ),
            Outcome::Replaced => info!(
                collection,
                name = %name,
                keys = %signature,
                unique = spec.unique,
                took = ?elapsed,
                "index dropped and recreated"
            ),
            Outcome::Created => info!(
                collection,
                name = %name,
                keys = %signature,
                unique = spec.unique,
                took = ?elapsed,
                "index ensured"
            ),
            Outcome::Failed { kind, message } => warn!(
                collection,
                name = %name,
                keys = %signature,
                unique = spec.unique,
                kind = %kind,
                took = ?elapsed,
                error = %message,
                "index ensure failed"
            ),
        }

        IndexOutcome {
            name,
            index_name: step.index_name,
            signature,
            unique: spec.unique,
            outcome: step.outcome,
            elapsed,
        }
    }

    /// An index with the desired key signature exists
    async fn converge(&self, collection: &str, spec: &IndexSpec, existing: &ExistingIndex) -> Step {
        if existing.satisfies(spec) {
            Step::done(Outcome::Reused, existing.name.clone())
        } else if existing.unique != spec.unique {
            self.replace(collection, spec, existing).await
        } else {
            self.rename(collection, spec, existing).await
        }
    }

    /// Same keys and options under another name: drop, then create under the desired name
    async fn rename(&self, collection: &str, spec: &IndexSpec, existing: &ExistingIndex) -> Step {
        info!(
            collection,
            from = %existing.name,
            to = %spec.effective_name(),
            keys = %spec.signature(),
            "renaming index to align with desired name"
        );

        if let Err(err) = self.admin.drop_index(collection, &existing.name).await {
            return Step::failed(
                FailureKind::DropFailure,
                tagged(collection, spec, format!("rename drop failed: {}", err.message)),
            );
        }
        match self.admin.create_index(collection, spec).await {
            Ok(created) => Step::done(Outcome::Renamed, created),
            Err(err) => create_failed(collection, spec, Some("rename create failed"), &err),
        }
    }

    /// Same keys, other uniqueness: drop, then create with the desired options
    async fn replace(&self, collection: &str, spec: &IndexSpec, existing: &ExistingIndex) -> Step {
        debug!(
            collection,
            existing = %existing.name,
            existing_unique = existing.unique,
            unique = spec.unique,
            "index options differ; replacing"
        );

        if let Err(err) = self.admin.drop_index(collection, &existing.name).await {
            return Step::failed(
                FailureKind::DropFailure,
                tagged(collection, spec, format!("drop failed: {}", err.message)),
            );
        }
        match self.admin.create_index(collection, spec).await {
            Ok(created) => Step::done(Outcome::Replaced, created),
            Err(err) if err.is_duplicate_key() && spec.unique => Step::failed(
                FailureKind::DuplicateKey,
                duplicate_key_message(collection, spec),
            ),
            Err(err) => create_failed(collection, spec, None, &err),
        }
    }

    /// No index with the desired key signature exists
    async fn create_missing(&self, collection: &str, spec: &IndexSpec) -> Step {
        match self.admin.create_index(collection, spec).await {
            Ok(created) => Step::done(Outcome::Created, created),
            Err(err) if err.is_options_conflict() => self.resolve_conflict(collection, spec, err).await,
            Err(err) => create_failed(collection, spec, None, &err),
        }
    }

    /// The listing raced another change: re-list once and converge on what is there now
    async fn resolve_conflict(&self, collection: &str, spec: &IndexSpec, conflict: ReconcileError) -> Step {
        debug!(collection, name = %spec.effective_name(), "options conflict; re-listing");

        match self.admin.list_indexes(collection).await {
            Ok(indexes) => {
                let snapshot = IndexSnapshot::from_indexes(indexes);
                if let Some(existing) = snapshot.get(&spec.signature()) {
                    return self.converge(collection, spec, existing).await;
                }
            }
            Err(err) => warn!(
                collection,
                error = %err,
                "re-listing indexes after options conflict failed"
            ),
        }

        Step::failed(
            FailureKind::OptionsConflict,
            tagged(collection, spec, conflict.message),
        )
    }
}

/// `"{collection}({index name}): {detail}"`
fn tagged(collection: &str, spec: &IndexSpec, detail: impl std::fmt::Display) -> String {
    format!("{}({}): {}", collection, spec.effective_name(), detail)
}

fn create_failed(
    collection: &str,
    spec: &IndexSpec,
    context: Option<&str>,
    err: &ReconcileError,
) -> Step {
    let message = match context {
        Some(context) => tagged(collection, spec, format!("{}: {}", context, err.message)),
        None => tagged(collection, spec, &err.message),
    };
    Step::failed(FailureKind::CreateFailure, message)
}
