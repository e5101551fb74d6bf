//! index-reconciler: declarative MongoDB index reconciliation
//!
//! Compares a compiled-in table of desired indexes against what actually
//! exists on each collection and converges the database, once, at process
//! startup. Safe to re-run on every start: a converged database sees zero
//! create/drop calls.
//!
//! ## Core Rules
//!
//! 1. **Match by key signature**: ordered `field:direction` pairs, never by name
//! 2. **Many satisfied states**: an undeclared name accepts any existing name
//! 3. **Never halt early**: every failure is recorded, every collection visited
//! 4. **One aggregate error**: tagged `collection(index)` for each failure
//!
//! ## Usage
//!
//! ```rust,ignore
//! use index_reconciler::{ensure_all, DesiredState, MongoIndexAdmin, ReconcileConfig};
//!
//! let admin = MongoIndexAdmin::connect("mongodb://localhost:27017", "app").await?;
//! let report = ensure_all(&admin, &DesiredState::standard(), &ReconcileConfig::default()).await?;
//! println!("{:?}", report.summary());
//! ```
//!
//! Rename and replace are drop-then-create, not atomic: if the create fails
//! the collection lacks that index until the next successful start. Two
//! processes starting at once may race each other's drop/create pairs; the
//! next start converges again.

pub mod config;
pub mod desired_state;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod reconcile;
pub mod telemetry;

pub use config::{BootConfig, ConfigError, ListingPolicy, ReconcileConfig};
pub use desired_state::{CollectionIndexes, DesiredState};
pub use domain::{
    asc, desc, ExistingIndex, FailureKind, IndexAdmin, IndexKey, IndexSpec, KeyDirection,
    KeySignature, Outcome,
};
pub use error::{ErrorKind, ReconcileError, Result};
pub use infrastructure::InMemoryIndexAdmin;
#[cfg(feature = "mongodb")]
pub use infrastructure::MongoIndexAdmin;
pub use reconcile::{
    ensure_all, CollectionReport, IndexOutcome, Orchestrator, OutcomeSummary, ReconcileReport,
    Reconciler,
};
