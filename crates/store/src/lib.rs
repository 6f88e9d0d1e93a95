//! `store` crate — pure persistence layer.
//!
//! Row structs, the [`Store`] capability trait, and two implementations:
//! an in-memory store for tests and local runs, and a Postgres store for
//! deployments.  No business logic lives here; the engine crate owns the
//! domain types and serialises them into the JSON columns these rows carry.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{
    ExecutionPatch, ExecutionRow, ExecutionStatus, JobRow, JobStatus, UsageRow, WorkflowRow,
};
pub use postgres::{DbPool, PgStore};
pub use traits::Store;
