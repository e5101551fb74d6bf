//! Run reports
//!
//! Produced by one reconciliation run, logged, then reduced by the caller
//! to success/failure plus the aggregate error text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::domain::{KeySignature, Outcome};
use crate::error::{ReconcileError, Result};

/// Outcome of one desired index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexOutcome {
    /// Declared name, or the server default name when none was declared
    pub name: String,
    /// Name of the matching index on the server after this step, if any
    pub index_name: Option<String>,
    pub signature: KeySignature,
    pub unique: bool,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Outcomes for one collection, in desired order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub outcomes: Vec<IndexOutcome>,
}

impl CollectionReport {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failed())
    }

    /// Failure messages, each tagged `collection(index)`
    pub fn errors(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Outcome::Failed { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All failure messages joined, `None` when everything succeeded
    pub fn error_text(&self) -> Option<String> {
        let errors = self.errors();
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        }
    }

    pub fn outcome(&self, name: &str) -> Option<&IndexOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// Outcome counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub reused: usize,
    pub renamed: usize,
    pub replaced: usize,
    pub created: usize,
    pub failed: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.reused + self.renamed + self.replaced + self.created + self.failed
    }
}

/// Aggregate result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub collections: Vec<CollectionReport>,
}

impl ReconcileReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            collections: Vec::new(),
        }
    }

    /// True iff no index failed anywhere
    pub fn is_success(&self) -> bool {
        self.collections.iter().all(CollectionReport::is_success)
    }

    pub fn collection(&self, collection: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    pub fn outcome(&self, collection: &str, name: &str) -> Option<&IndexOutcome> {
        self.collection(collection)?.outcome(name)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &IndexOutcome> {
        self.collections.iter().flat_map(|c| c.outcomes.iter())
    }

    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for outcome in self.outcomes() {
            match outcome.outcome {
                Outcome::Reused => summary.reused += 1,
                Outcome::Renamed => summary.renamed += 1,
                Outcome::Replaced => summary.replaced += 1,
                Outcome::Created => summary.created += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Every failing collection as `collection: error; error`, joined by `"; "`
    pub fn error_message(&self) -> Option<String> {
        let problems: Vec<String> = self
            .collections
            .iter()
            .filter_map(|c| {
                c.error_text()
                    .map(|text| format!("{}: {}", c.collection, text))
            })
            .collect();

        if problems.is_empty() {
            None
        } else {
            Some(problems.join("; "))
        }
    }

    /// `Ok(self)` on full success, otherwise one aggregate error
    pub fn into_result(self) -> Result<Self> {
        match self.error_message() {
            None => Ok(self),
            Some(message) => Err(ReconcileError::aggregate(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{asc, FailureKind};
    use crate::error::ErrorKind;

    fn outcome(name: &str, outcome: Outcome) -> IndexOutcome {
        IndexOutcome {
            name: name.to_string(),
            index_name: None,
            signature: KeySignature::of(&[asc(name)]),
            unique: false,
            outcome,
            elapsed: Duration::from_millis(1),
        }
    }

    fn report() -> ReconcileReport {
        let mut users = CollectionReport::new("users");
        users.outcomes.push(outcome("a", Outcome::Created));
        users.outcomes.push(outcome(
            "b",
            Outcome::failed(FailureKind::DropFailure, "users(b): drop failed: boom"),
        ));

        let mut pages = CollectionReport::new("pages");
        pages.outcomes.push(outcome("c", Outcome::Reused));

        let mut groups = CollectionReport::new("groups");
        groups.outcomes.push(outcome(
            "d",
            Outcome::failed(FailureKind::CreateFailure, "groups(d): timeout"),
        ));
        groups.outcomes.push(outcome(
            "e",
            Outcome::failed(FailureKind::CreateFailure, "groups(e): timeout"),
        ));

        let mut report = ReconcileReport::new(Utc::now());
        report.collections = vec![users, pages, groups];
        report
    }

    #[test]
    fn test_summary() {
        let summary = report().summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn test_error_message_names_every_collection() {
        let message = report().error_message().unwrap();
        assert_eq!(
            message,
            "users: users(b): drop failed: boom; groups: groups(d): timeout; groups(e): timeout"
        );
    }

    #[test]
    fn test_into_result() {
        let err = report().into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aggregate);

        let mut ok = ReconcileReport::new(Utc::now());
        let mut pages = CollectionReport::new("pages");
        pages.outcomes.push(outcome("c", Outcome::Reused));
        ok.collections.push(pages);
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn test_lookup() {
        let report = report();
        assert!(!report.collection("users").unwrap().is_success());
        assert!(report.collection("pages").unwrap().is_success());
        assert_eq!(report.outcome("pages", "c").unwrap().outcome, Outcome::Reused);
        assert!(report.outcome("pages", "zzz").is_none());
    }
}
