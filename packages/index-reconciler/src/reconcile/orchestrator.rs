//! Orchestrator
//!
//! Walks a desired-state table collection by collection and folds every
//! per-index outcome into one report. Only an invalid table stops a run.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::config::ReconcileConfig;
use crate::desired_state::DesiredState;
use crate::domain::IndexAdmin;
use crate::error::Result;

use super::reconciler::Reconciler;
use super::report::ReconcileReport;

/// Runs the reconciler over every collection of a desired-state table
pub struct Orchestrator {
    admin: Arc<dyn IndexAdmin>,
    config: ReconcileConfig,
}

impl Orchestrator {
    pub fn new(admin: Arc<dyn IndexAdmin>, config: ReconcileConfig) -> Self {
        Self { admin, config }
    }

    /// Reconcile every collection in declared order.
    ///
    /// Fails only when the desired table is invalid; per-index failures are
    /// recorded in the report.
    pub async fn run(&self, desired: &DesiredState) -> Result<ReconcileReport> {
        run_with(self.admin.as_ref(), desired, &self.config).await
    }

    /// `run`, reduced to one aggregate error on any failure
    pub async fn ensure_all(&self, desired: &DesiredState) -> Result<ReconcileReport> {
        self.run(desired).await?.into_result()
    }
}

/// Boot entry point: reconcile `desired` and fail if anything failed
pub async fn ensure_all<A: IndexAdmin + ?Sized>(
    admin: &A,
    desired: &DesiredState,
    config: &ReconcileConfig,
) -> Result<ReconcileReport> {
    run_with(admin, desired, config).await?.into_result()
}

async fn run_with<A: IndexAdmin + ?Sized>(
    admin: &A,
    desired: &DesiredState,
    config: &ReconcileConfig,
) -> Result<ReconcileReport> {
    if config.validate_desired_state {
        desired.validate()?;
    }

    let start_time = Instant::now();
    let mut report = ReconcileReport::new(Utc::now());
    let reconciler = Reconciler::new(admin, config.listing_policy);

    info!(
        collections = desired.len(),
        indexes = desired.index_count(),
        listing_policy = %config.listing_policy,
        "reconciling indexes"
    );

    for entry in &desired.collections {
        let collection = reconciler
            .reconcile_collection(&entry.collection, &entry.indexes)
            .await;
        if let Some(text) = collection.error_text() {
            error!(collection = %entry.collection, errors = %text, "collection has index failures");
        }
        report.collections.push(collection);
    }

    let summary = report.summary();
    info!(
        reused = summary.reused,
        renamed = summary.renamed,
        replaced = summary.replaced,
        created = summary.created,
        failed = summary.failed,
        took = ?start_time.elapsed(),
        "index reconciliation finished"
    );

    Ok(report)
}
