//! Route job lifecycle.
//!
//! ```text
//!  POST /route ──▶ RouteIntake ──▶ JobStore.insert(Pending)
//!                      │
//!                      └──▶ JobPool.spawn ──▶ RouteWorker ──▶ DistanceService
//!                                                  │
//!                                                  └──▶ JobStore.update(Success | Failure)
//!
//!  GET /route/:token ──▶ StatusReporter ──▶ JobStore.get
//! ```
//!
//! Each job is written twice in its life: once pending, once terminal.

pub mod intake;
pub mod job;
pub mod pool;
pub mod status;
pub mod worker;

pub use intake::RouteIntake;
pub use job::{Job, JobOutcome, JobStatus, Token};
pub use pool::{AdmissionTicket, JobPool, JobPoolConfig, JobPoolStats};
pub use status::{RouteStatus, StatusReporter, INVALID_TOKEN};
pub use worker::{aggregate, RouteWorker};
