//! Infrastructure layer - IndexAdmin adapters

pub mod memory_admin;
pub use memory_admin::{AdminCalls, Fault, InMemoryIndexAdmin};

#[cfg(feature = "mongodb")]
pub mod mongo_admin;
#[cfg(feature = "mongodb")]
pub use mongo_admin::MongoIndexAdmin;
