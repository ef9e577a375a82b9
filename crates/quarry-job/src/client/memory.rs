//! In-memory job client implementation for testing.
//!
//! This module provides [`InMemoryJobClient`], a scriptable implementation of
//! the [`JobClient`] trait backed by a process-local job table.
//!
//! ## Limitations
//!
//! - **NOT a warehouse**: configurations are stored, never executed; results
//!   must be staged by the test
//! - **Single-process only**: state is not shared across process boundaries
//! - **No persistence**: all jobs are lost when the client is dropped

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use super::{ErrorResult, InsertOutcome, JobClient, JobHandle, JobReference, JobState, RetryPolicy};
use crate::config::JobConfiguration;
use crate::error::{Error, Result};

/// Tick between terminal-state checks inside `wait_for_job`.
const WAIT_POLL: Duration = Duration::from_millis(5);

/// Converts a lock poison error to a protocol error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::protocol("job table lock poisoned")
}

#[derive(Debug, Clone)]
struct StoredJob {
    handle: JobHandle,
    configuration: JobConfiguration,
    rows: Option<Vec<Value>>,
    pending_failure: Option<ErrorResult>,
    cancel_requested: bool,
}

/// Scriptable in-memory job client for testing.
///
/// Jobs are created in a configurable initial state and, by default,
/// complete successfully the first time they are awaited. Tests drive other
/// outcomes through [`complete_job`](Self::complete_job),
/// [`stage_failure`](Self::stage_failure), and
/// [`stage_rows`](Self::stage_rows).
///
/// ## Example
///
/// ```rust
/// use quarry_job::client::memory::InMemoryJobClient;
///
/// let client = InMemoryJobClient::new();
/// // Hand the client to a lifecycle under test...
/// ```
#[derive(Debug)]
pub struct InMemoryJobClient {
    jobs: RwLock<HashMap<String, StoredJob>>,
    default_rows: RwLock<Option<Vec<Value>>>,
    insert_attempts: AtomicU64,
    initial_state: JobState,
    initial_failure: Option<ErrorResult>,
    auto_complete: bool,
}

impl Default for InMemoryJobClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobClient {
    /// Creates a client where new jobs start `Running` and complete
    /// successfully on the first wait.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            default_rows: RwLock::new(None),
            insert_attempts: AtomicU64::new(0),
            initial_state: JobState::Running,
            initial_failure: None,
            auto_complete: true,
        }
    }

    /// Creates a client whose new jobs start in the given state.
    #[must_use]
    pub fn with_initial_state(initial_state: JobState) -> Self {
        Self {
            initial_state,
            ..Self::new()
        }
    }

    /// Creates a client that never completes jobs on its own.
    ///
    /// Waits only resolve once the test calls
    /// [`complete_job`](Self::complete_job), or they time out.
    #[must_use]
    pub fn with_manual_completion() -> Self {
        Self {
            auto_complete: false,
            ..Self::new()
        }
    }

    /// Creates a client whose new jobs are born `Done` carrying `error`.
    ///
    /// Models a fast-failing job whose insert response already holds the
    /// terminal error result.
    #[must_use]
    pub fn with_insert_failure(error: ErrorResult) -> Self {
        Self {
            initial_state: JobState::Done,
            initial_failure: Some(error),
            ..Self::new()
        }
    }

    /// Registers a job directly, bypassing `insert_job`.
    ///
    /// Use this to seed a pre-existing job for conflict scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn register_job(&self, handle: JobHandle, configuration: JobConfiguration) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        jobs.insert(
            handle.reference.qualified_path(),
            StoredJob {
                handle,
                configuration,
                rows: None,
                pending_failure: None,
                cancel_requested: false,
            },
        );
        Ok(())
    }

    /// Moves a job to `Done`, recording `error` if one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist or the lock is poisoned.
    pub fn complete_job(&self, reference: &JobReference, error: Option<ErrorResult>) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let job = jobs
            .get_mut(&reference.qualified_path())
            .ok_or_else(|| missing_job(reference))?;
        job.handle.state = JobState::Done;
        job.handle.error_result = error;
        Ok(())
    }

    /// Arranges for the next auto-completed wait on this job to fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist or the lock is poisoned.
    pub fn stage_failure(&self, reference: &JobReference, error: ErrorResult) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let job = jobs
            .get_mut(&reference.qualified_path())
            .ok_or_else(|| missing_job(reference))?;
        job.pending_failure = Some(error);
        Ok(())
    }

    /// Stages the rows `fetch_rows` returns for this job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist or the lock is poisoned.
    pub fn stage_rows(&self, reference: &JobReference, rows: Vec<Value>) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let job = jobs
            .get_mut(&reference.qualified_path())
            .ok_or_else(|| missing_job(reference))?;
        job.rows = Some(rows);
        Ok(())
    }

    /// Stages the rows returned for any job without staged rows of its own.
    ///
    /// Useful when the test cannot predict the derived job id up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn stage_default_rows(&self, rows: Vec<Value>) -> Result<()> {
        let mut defaults = self.default_rows.write().map_err(poison_err)?;
        *defaults = Some(rows);
        Ok(())
    }

    /// Returns the number of `insert_job` calls observed, conflicts
    /// included.
    #[must_use]
    pub fn insert_attempts(&self) -> u64 {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Returns the number of jobs actually created.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn job_count(&self) -> Result<usize> {
        let count = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            jobs.len()
        };
        Ok(count)
    }

    /// Returns the current snapshot of a job, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn job(&self, reference: &JobReference) -> Result<Option<JobHandle>> {
        let handle = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            jobs.get(&reference.qualified_path()).map(|j| j.handle.clone())
        };
        Ok(handle)
    }

    /// Returns the configuration a job was submitted with.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn stored_configuration(
        &self,
        reference: &JobReference,
    ) -> Result<Option<JobConfiguration>> {
        let configuration = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            jobs.get(&reference.qualified_path())
                .map(|j| j.configuration.clone())
        };
        Ok(configuration)
    }

    /// Returns true if cancellation was requested for the job.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn cancel_requested(&self, reference: &JobReference) -> Result<bool> {
        let requested = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            jobs.get(&reference.qualified_path())
                .is_some_and(|j| j.cancel_requested)
        };
        Ok(requested)
    }

    /// Returns the handle if terminal, applying the auto-complete policy.
    fn poll_once(&self, reference: &JobReference) -> Result<Option<JobHandle>> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let job = jobs
            .get_mut(&reference.qualified_path())
            .ok_or_else(|| missing_job(reference))?;

        if !job.handle.is_terminal() && self.auto_complete {
            job.handle.state = JobState::Done;
            job.handle.error_result = job.pending_failure.take();
        }

        let snapshot = job.handle.is_terminal().then(|| job.handle.clone());
        drop(jobs);
        Ok(snapshot)
    }
}

fn missing_job(reference: &JobReference) -> Error {
    Error::protocol(format!(
        "no job exists under {}",
        reference.qualified_path()
    ))
}

#[async_trait]
impl JobClient for InMemoryJobClient {
    async fn insert_job(
        &self,
        reference: &JobReference,
        configuration: &JobConfiguration,
    ) -> Result<InsertOutcome> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);

        let mut jobs = self.jobs.write().map_err(poison_err)?;
        if jobs.contains_key(&reference.qualified_path()) {
            drop(jobs);
            return Ok(InsertOutcome::AlreadyExists);
        }

        let handle = JobHandle {
            reference: reference.clone(),
            state: self.initial_state,
            error_result: self.initial_failure.clone(),
        };
        jobs.insert(
            reference.qualified_path(),
            StoredJob {
                handle: handle.clone(),
                configuration: configuration.clone(),
                rows: None,
                pending_failure: None,
                cancel_requested: false,
            },
        );
        drop(jobs);
        Ok(InsertOutcome::Created(handle))
    }

    async fn get_job(&self, reference: &JobReference) -> Result<JobHandle> {
        let handle = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            jobs.get(&reference.qualified_path()).map(|j| j.handle.clone())
        };
        handle.ok_or_else(|| missing_job(reference))
    }

    async fn wait_for_job(
        &self,
        reference: &JobReference,
        timeout: Option<Duration>,
        _retry: &RetryPolicy,
    ) -> Result<JobHandle> {
        let started = Instant::now();
        loop {
            if let Some(handle) = self.poll_once(reference)? {
                return Ok(handle);
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(Error::WaitTimeout {
                        job_id: reference.job_id.to_string(),
                        timeout: limit,
                    });
                }
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    async fn cancel_job(&self, reference: &JobReference) -> Result<()> {
        let mut jobs = self.jobs.write().map_err(poison_err)?;
        let job = jobs
            .get_mut(&reference.qualified_path())
            .ok_or_else(|| missing_job(reference))?;

        job.cancel_requested = true;
        if !job.handle.is_terminal() {
            job.handle.state = JobState::Done;
            job.handle.error_result = Some(ErrorResult::with_reason("stopped", "job was cancelled"));
        }
        drop(jobs);
        Ok(())
    }

    async fn fetch_rows(
        &self,
        reference: &JobReference,
        max_results: Option<u64>,
    ) -> Result<Vec<Value>> {
        let staged = {
            let jobs = self.jobs.read().map_err(poison_err)?;
            let job = jobs
                .get(&reference.qualified_path())
                .ok_or_else(|| missing_job(reference))?;
            if !job.handle.is_terminal() {
                return Err(Error::protocol(format!(
                    "job {} has not completed, rows are not available",
                    reference.qualified_path()
                )));
            }
            job.rows.clone()
        };

        let mut rows = match staged {
            Some(rows) => rows,
            None => {
                let defaults = self.default_rows.read().map_err(poison_err)?;
                defaults.clone().unwrap_or_default()
            }
        };
        if let Some(limit) = max_results {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }
}
