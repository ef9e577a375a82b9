//! Pluggable access to the remote warehouse job API.
//!
//! The [`JobClient`] trait defines the wire surface the lifecycle protocol
//! runs against. Watch registration for deferred waits is handled separately
//! by [`crate::watch::WatchRuntime`].
//!
//! ## Design Principles
//!
//! - **Conflict as a result**: an id collision on insert is an expected
//!   outcome the reattachment protocol consumes, not an error
//! - **Snapshots, not live objects**: a [`JobHandle`] is a point-in-time
//!   view; callers re-fetch rather than mutate
//! - **Testability**: in-memory implementation for tests, an HTTP client in
//!   production deployments

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::JobConfiguration;
use crate::error::{Error, Result};
use crate::identity::JobId;

/// Location assumed when a job reference does not carry one.
pub const DEFAULT_LOCATION: &str = "US";

/// Remote job lifecycle states reported by the warehouse API.
///
/// Jobs move strictly forward: `Pending` to `Running` to `Done`. Success
/// and failure are both `Done`; failure is distinguished by a recorded
/// error result on the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Accepted by the service, not yet scheduled.
    Pending,
    /// Executing remotely.
    Running,
    /// Reached a terminal state, successfully or not.
    Done,
}

impl JobState {
    /// Returns true if the job can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobState::Done)
    }

    /// Returns the state label as the API spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            other => Err(Error::protocol(format!("unknown job state {other:?}"))),
        }
    }
}

/// Fully scoped name of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    /// Project the job is billed to.
    pub project_id: String,
    /// Processing location, when pinned by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The job's identifier, unique within project and location.
    pub job_id: JobId,
}

impl JobReference {
    /// Creates a job reference.
    #[must_use]
    pub fn new(project_id: impl Into<String>, location: Option<String>, job_id: JobId) -> Self {
        Self {
            project_id: project_id.into(),
            location,
            job_id,
        }
    }

    /// Returns the location, falling back to [`DEFAULT_LOCATION`].
    #[must_use]
    pub fn location_or_default(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    /// Formats the reference as the qualified path
    /// `{project}:{location}:{job_id}`.
    ///
    /// This is the form published for cross-attempt correlation and parsed
    /// back at kill time.
    #[must_use]
    pub fn qualified_path(&self) -> String {
        format!(
            "{}:{}:{}",
            self.project_id,
            self.location_or_default(),
            self.job_id
        )
    }

    /// Parses a qualified path back into a reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the path does not have exactly three
    /// `:`-separated segments, or [`Error::InvalidJobId`] if the id segment
    /// is invalid.
    pub fn parse_qualified_path(path: &str) -> Result<Self> {
        let mut segments = path.splitn(3, ':');
        let (Some(project), Some(location), Some(job_id)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(Error::protocol(format!(
                "malformed qualified job path {path:?}, expected project:location:job_id"
            )));
        };
        if project.is_empty() || location.is_empty() {
            return Err(Error::protocol(format!(
                "malformed qualified job path {path:?}, expected project:location:job_id"
            )));
        }
        Ok(Self {
            project_id: project.to_owned(),
            location: Some(location.to_owned()),
            job_id: JobId::new(job_id)?,
        })
    }
}

impl std::fmt::Display for JobReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_path())
    }
}

/// The error payload a failed job carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    /// Machine-readable failure class, when the service provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable failure description.
    pub message: String,
}

impl ErrorResult {
    /// Creates an error result with a message only.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            reason: None,
            message: message.into(),
        }
    }

    /// Creates an error result with a reason code.
    #[must_use]
    pub fn with_reason(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{reason}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A point-in-time snapshot of a remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    /// The job's fully scoped name.
    pub reference: JobReference,
    /// State at the time of the snapshot.
    pub state: JobState,
    /// Recorded failure, present only on jobs that finished with an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_result: Option<ErrorResult>,
}

impl JobHandle {
    /// Returns the job's identifier.
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        &self.reference.job_id
    }

    /// Returns true if the snapshot shows a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Fails with the recorded error result, if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobFailure`] with the message
    /// `job {id} failed: {error_result}` when the handle carries an error.
    pub fn check_error(&self) -> Result<()> {
        match &self.error_result {
            Some(error) => Err(Error::job_failure(format!(
                "job {} failed: {error}",
                self.job_id()
            ))),
            None => Ok(()),
        }
    }
}

/// Result of a non-blocking job insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The job was created and is now tracked remotely.
    Created(JobHandle),
    /// A job with the same reference already exists.
    AlreadyExists,
}

impl InsertOutcome {
    /// Returns true if a new job was created.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Retry policy handed to the client's blocking wait.
///
/// Interpretation is entirely the client's concern; the lifecycle protocol
/// only carries it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum polling attempts before the wait gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: Duration,
    /// Upper bound on the exponential backoff.
    #[serde(default = "default_max_backoff")]
    pub max_backoff: Duration,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// Wire surface of the remote job API.
///
/// Implementations must provide:
/// - Insert-by-id semantics where a duplicate id reports
///   [`InsertOutcome::AlreadyExists`] rather than creating a second job
/// - Read-only snapshots from `get_job`, safe to call at any frequency
/// - Best-effort cancellation that returns without waiting for the job to
///   actually stop
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent lifecycle executions
/// sharing one client.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Creates a job without waiting for it to complete.
    ///
    /// # Returns
    ///
    /// - [`InsertOutcome::Created`] with the initial snapshot
    /// - [`InsertOutcome::AlreadyExists`] when the reference is already
    ///   taken, leaving the existing job untouched
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than an id collision.
    async fn insert_job(
        &self,
        reference: &JobReference,
        configuration: &JobConfiguration,
    ) -> Result<InsertOutcome>;

    /// Fetches the current snapshot of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if no job exists under the reference.
    async fn get_job(&self, reference: &JobReference) -> Result<JobHandle>;

    /// Blocks until the job reaches a terminal state.
    ///
    /// The timeout and retry policy are interpreted by the client; `None`
    /// means wait indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`] when the timeout elapses first. A job
    /// that finished with an error still resolves the wait successfully;
    /// the failure is recorded on the returned handle.
    async fn wait_for_job(
        &self,
        reference: &JobReference,
        timeout: Option<Duration>,
        retry: &RetryPolicy,
    ) -> Result<JobHandle>;

    /// Requests cancellation of a job.
    ///
    /// Fire-and-forget: returns once the service has accepted the request,
    /// without waiting for the job to stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancel request cannot be delivered.
    async fn cancel_job(&self, reference: &JobReference) -> Result<()>;

    /// Fetches result rows of a completed query job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the job does not exist or has not
    /// finished.
    async fn fetch_rows(
        &self,
        reference: &JobReference,
        max_results: Option<u64>,
    ) -> Result<Vec<Value>>;
}
