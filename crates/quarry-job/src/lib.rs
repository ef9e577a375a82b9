//! # quarry-job
//!
//! Asynchronous job lifecycle and reattachment protocol for a cloud
//! warehouse's REST job API.
//!
//! This crate implements the submission side of the warehouse integration,
//! providing:
//!
//! - **Deterministic Identity**: Idempotent job ids derived from the task's
//!   coordinates and a content hash of its configuration
//! - **Submit-Then-Watch**: Non-blocking submission, then either a blocking
//!   wait or a suspended watch for completion
//! - **Reattachment**: Submission conflicts resolve against the existing
//!   job when its state was declared safe to resume
//! - **Cancel on Kill**: Best-effort remote cancellation when the task
//!   instance is killed
//!
//! ## Core Concepts
//!
//! - **Lifecycle**: One execution of submit, conflict resolution, and
//!   completion for a job configuration
//! - **Continuation**: The serializable descriptor a suspended execution
//!   leaves behind; everything needed to resume lives inside it
//! - **Watch**: A registration with an external polling runtime that
//!   delivers exactly one completion event per continuation
//!
//! ## Guarantees
//!
//! - **Idempotent retries**: An unchanged configuration resubmitted for the
//!   same logical date derives the same job id and reattaches instead of
//!   double-submitting
//! - **Strict conflicts**: A collision with a job in an undeclared state
//!   fails loudly rather than silently resuming
//! - **Error fidelity**: Watch error events surface their message verbatim
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quarry_job::client::memory::InMemoryJobClient;
//! use quarry_job::config::JobConfiguration;
//! use quarry_job::context::{InMemoryTaskInstanceStore, TaskContext};
//! use quarry_job::error::Result;
//! use quarry_job::lifecycle::JobLifecycle;
//! use quarry_job::options::LifecycleOptions;
//! use quarry_job::watch::InMemoryWatchRuntime;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let lifecycle = JobLifecycle::new(
//!         Arc::new(InMemoryJobClient::new()),
//!         Arc::new(InMemoryWatchRuntime::new()),
//!         Arc::new(InMemoryTaskInstanceStore::new()),
//!         LifecycleOptions::new("acme-analytics"),
//!     );
//!
//!     let context = TaskContext::new("etl", "load_events", chrono::Utc::now());
//!     let configuration = JobConfiguration::from_value(json!({
//!         "query": {"query": "SELECT 1", "useLegacySql": false}
//!     }))?;
//!
//!     let outcome = lifecycle.execute(&context, configuration).await?;
//!     println!("finished: {outcome:?}");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod context;
pub mod continuation;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod metrics;
pub mod options;
pub mod rows;
pub mod watch;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::memory::InMemoryJobClient;
    pub use crate::client::{
        InsertOutcome, JobClient, JobHandle, JobReference, JobState, RetryPolicy,
    };
    pub use crate::config::{JobConfiguration, JobKind};
    pub use crate::context::{InMemoryTaskInstanceStore, TaskContext, TaskInstanceStore};
    pub use crate::continuation::{Continuation, JobEvent, JobEventStatus};
    pub use crate::error::{Error, Result};
    pub use crate::identity::{JobId, derive_job_id};
    pub use crate::lifecycle::{ExecutionOutcome, JobLifecycle, Resolution};
    pub use crate::metrics::JobMetrics;
    pub use crate::options::{ExecutionMode, LifecycleOptions};
    pub use crate::rows::FetchOptions;
    pub use crate::watch::{InMemoryWatchRuntime, WatchRuntime};
}
