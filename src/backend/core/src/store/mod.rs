//! Job persistence.
//!
//! [`JobStore`] is the only shared mutable state in the service. Both
//! backends keep writes isolated per token and never expose a half-written
//! record to a concurrent reader.

use async_trait::async_trait;

use crate::error::Result;
use crate::jobs::{Job, JobOutcome, Token};

mod memory;
mod postgres;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

/// Storage backend for route jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. Fails with `DuplicateRecord` if the token exists.
    async fn insert(&self, job: Job) -> Result<()>;

    /// Write the terminal outcome of a pending job.
    ///
    /// Unknown tokens yield `RecordNotFound`; a job that already reached a
    /// terminal state yields `InvalidStateTransition` and is not modified.
    async fn update(&self, token: Token, outcome: &JobOutcome) -> Result<()>;

    /// Fetch a job. Unknown tokens yield `RecordNotFound`.
    async fn get(&self, token: Token) -> Result<Job>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Short backend name for health output.
    fn backend_name(&self) -> &'static str;
}
