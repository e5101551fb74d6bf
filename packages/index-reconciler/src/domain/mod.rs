//! Domain layer for index reconciliation
//!
//! # Domain Models
//!
//! - `IndexSpec`: desired index (compiled in, immutable)
//! - `ExistingIndex`: observed index (re-read on every run)
//! - `KeySignature`: canonical key used to match the two
//! - `Outcome`: per desired index, per run
//!
//! # Port Trait
//!
//! - `IndexAdmin`: list / create / drop against the database

pub mod models;
pub mod ports;
pub mod signature;

pub use models::{
    asc, default_index_name, desc, ExistingIndex, FailureKind, IndexKey, IndexSpec, KeyDirection,
    Outcome,
};
pub use ports::IndexAdmin;
pub use signature::KeySignature;
