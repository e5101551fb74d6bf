//! Reconciliation engine
//!
//! - `snapshot`: what exists on a collection, keyed by key signature
//! - `reconciler`: per-collection reuse / rename / replace / create
//! - `orchestrator`: every collection of a desired table, errors aggregated
//! - `remediation`: operator guidance for blocked unique builds
//! - `report`: outcomes of one run

pub mod orchestrator;
pub mod reconciler;
pub mod remediation;
pub mod report;
pub mod snapshot;

pub use orchestrator::{ensure_all, Orchestrator};
pub use reconciler::Reconciler;
pub use remediation::{duplicate_finder, duplicate_key_message};
pub use report::{CollectionReport, IndexOutcome, OutcomeSummary, ReconcileReport};
pub use snapshot::{load_snapshot, IndexSnapshot};
