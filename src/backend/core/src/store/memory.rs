//! In-memory job store for development and tests.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::JobStore;
use crate::error::{ErrorCode, Result, WaypointError};
use crate::jobs::{Job, JobOutcome, Token};

/// Sharded map of token to job. Each shard lock covers a whole record, so a
/// reader sees either the pending job or the completed one.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Token, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        match self.jobs.entry(job.token) {
            Entry::Occupied(entry) => Err(WaypointError::with_internal(
                ErrorCode::DuplicateRecord,
                "Job token already exists",
                format!("token {} already stored", entry.key()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(job);
                Ok(())
            }
        }
    }

    async fn update(&self, token: Token, outcome: &JobOutcome) -> Result<()> {
        let mut job = self
            .jobs
            .get_mut(&token)
            .ok_or_else(|| WaypointError::not_found("Job", token.to_string()))?;
        job.complete(outcome)
    }

    async fn get(&self, token: Token) -> Result<Job> {
        self.jobs
            .get(&token)
            .map(|job| job.clone())
            .ok_or_else(|| WaypointError::not_found("Job", token.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
