#![allow(clippy::result_large_err)]
//! # Waypoint Core
//!
//! Asynchronous route distance service: a caller submits a multi-waypoint
//! route, receives a token at once, and polls that token while a background
//! worker asks a distance provider for every leg and stores the totals.
//!
//! ## Architecture
//!
//! - **Route**: validated waypoint paths and their consecutive legs
//! - **Jobs**: intake, the bounded job pool, workers and status reporting
//! - **Store**: PostgreSQL and in-memory job persistence
//! - **Distance**: provider trait and the Google Distance Matrix client
//! - **API**: axum HTTP surface
//! - **Telemetry**: structured logging and Prometheus metrics

pub mod api;
pub mod config;
pub mod distance;
pub mod error;
pub mod jobs;
pub mod route;
pub mod store;
pub mod telemetry;

pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, Result, WaypointError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::distance::{DistanceService, ElementStatus, GoogleDistanceMatrixClient, Leg};
    pub use crate::error::{ErrorCode, Result, WaypointError};
    pub use crate::jobs::{
        Job, JobOutcome, JobPool, JobStatus, RouteIntake, RouteStatus, RouteWorker,
        StatusReporter, Token,
    };
    pub use crate::route::{RoutePath, RoutePoint, WaypointPair};
    pub use crate::store::{InMemoryJobStore, JobStore, PgJobStore};
}
