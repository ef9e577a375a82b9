//! The job lifecycle protocol.
//!
//! One execution covers the full path of a remote job: derive the identity,
//! submit without waiting, absorb an id collision by reattaching, publish
//! the qualified path, then either hold the worker until completion or
//! suspend behind a watch. A suspended execution is resumed through
//! [`JobLifecycle::resume`] once the orchestrator delivers the watch event.
//!
//! The lifecycle owns no capability itself. Client, watch runtime, and task
//! store are passed in at construction, which is also what the tests swap
//! for in-memory implementations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{InsertOutcome, JobClient, JobHandle, JobReference};
use crate::config::{JobConfiguration, JobKind};
use crate::context::{JOB_ID_KEY, JOB_ID_PATH_KEY, TaskContext, TaskInstanceStore};
use crate::continuation::{Continuation, JobEvent};
use crate::error::{Error, Result};
use crate::identity::{JobId, derive_job_id};
use crate::metrics::{JobMetrics, TimingGuard};
use crate::options::{ExecutionMode, LifecycleOptions};
use crate::rows::{FetchOptions, shape_rows};
use crate::watch::WatchRuntime;

/// How an execution left the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The job finished while the worker was still attached.
    Completed(Resolution),
    /// A watch was registered; the orchestrator must later call
    /// [`JobLifecycle::resume`] with this continuation and its event.
    Suspended(Continuation),
}

impl ExecutionOutcome {
    /// Returns true if the execution finished without suspending.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns true if the execution suspended behind a watch.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }
}

/// What a finished execution reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// A single job finished; its id is the result.
    Job {
        /// The finished job.
        job_id: JobId,
    },
    /// Both jobs of a check pair finished.
    JobPair {
        /// The current-period job.
        first_job_id: JobId,
        /// The prior-period job.
        second_job_id: JobId,
    },
    /// A row fetch finished.
    Rows {
        /// The query job that produced the rows.
        job_id: JobId,
        /// The fetched rows, shaped per the fetch options.
        records: Vec<Value>,
    },
}

impl Resolution {
    /// Returns the id of the finished job, the first one for a pair.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        match self {
            Resolution::Job { job_id }
            | Resolution::JobPair {
                first_job_id: job_id,
                ..
            }
            | Resolution::Rows { job_id, .. } => job_id,
        }
    }
}

/// Drives remote jobs through submission, reattachment, and completion.
///
/// Capabilities are explicit constructor arguments rather than anything
/// inherited: the same lifecycle runs against production implementations or
/// the in-memory ones under `client::memory`, `watch`, and `context`.
pub struct JobLifecycle {
    client: Arc<dyn JobClient>,
    watch_runtime: Arc<dyn WatchRuntime>,
    task_store: Arc<dyn TaskInstanceStore>,
    options: LifecycleOptions,
    metrics: JobMetrics,
}

impl JobLifecycle {
    /// Creates a lifecycle over the given capabilities.
    #[must_use]
    pub fn new(
        client: Arc<dyn JobClient>,
        watch_runtime: Arc<dyn WatchRuntime>,
        task_store: Arc<dyn TaskInstanceStore>,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            client,
            watch_runtime,
            task_store,
            options,
            metrics: JobMetrics::new(),
        }
    }

    /// Returns the options this lifecycle runs with.
    #[must_use]
    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Runs the insert flavor: submit one caller-built configuration and
    /// await it.
    ///
    /// The derived identity reuses the caller-supplied id base when the
    /// options carry one. After submission (or reattachment) the qualified
    /// job path is published under [`JOB_ID_PATH_KEY`] for downstream
    /// correlation and kill-time cancellation.
    ///
    /// # Errors
    ///
    /// Fails on identity violations, non-reattachable conflicts, remote job
    /// errors, and wait timeouts.
    #[tracing::instrument(
        skip(self, context, configuration),
        fields(pipeline_id = %context.pipeline_id, task_id = %context.task_id)
    )]
    pub async fn execute(
        &self,
        context: &TaskContext,
        configuration: JobConfiguration,
    ) -> Result<ExecutionOutcome> {
        let handle = self
            .submit_derived(context, self.options.job_id.as_deref(), configuration)
            .await?;
        let reference = handle.reference.clone();

        self.task_store
            .put(JOB_ID_PATH_KEY, Value::String(reference.qualified_path()))
            .await?;
        tracing::info!(path = %reference.qualified_path(), "published qualified job path");

        match self.options.mode {
            ExecutionMode::Blocking => {
                let handle = self.wait_blocking(&reference).await?;
                Ok(ExecutionOutcome::Completed(Resolution::Job {
                    job_id: handle.reference.job_id,
                }))
            }
            ExecutionMode::Deferred => {
                if handle.is_terminal() {
                    tracing::info!(state = %handle.state, "job already finished at submission");
                    if let Err(err) = handle.check_error() {
                        self.metrics.record_completed("error");
                        return Err(err);
                    }
                    self.metrics.record_completed("success");
                    return Ok(ExecutionOutcome::Completed(Resolution::Job {
                        job_id: reference.job_id,
                    }));
                }
                let continuation = Continuation::AwaitJob {
                    reference,
                    poll_interval: self.options.poll_interval,
                    credential_chain: self.options.credential_chain.clone(),
                };
                self.register_watch(continuation).await
            }
        }
    }

    /// Runs the interval-check flavor: submit the current-period and
    /// prior-period check queries and await both.
    ///
    /// The first job's id is published under [`JOB_ID_KEY`] between the two
    /// submissions. In blocking mode both jobs are awaited concurrently; in
    /// deferred mode a single pair watch covers them jointly. Evaluating
    /// the metric ratios against their thresholds happens downstream.
    ///
    /// # Errors
    ///
    /// Fails like [`execute`](Self::execute); an error on either job fails
    /// the pair.
    #[tracing::instrument(
        skip(self, context, first_sql, second_sql),
        fields(pipeline_id = %context.pipeline_id, task_id = %context.task_id)
    )]
    pub async fn execute_interval_check(
        &self,
        context: &TaskContext,
        first_sql: &str,
        second_sql: &str,
        use_legacy_sql: bool,
    ) -> Result<ExecutionOutcome> {
        tracing::info!(sql = first_sql, "executing first check query");
        let first = self
            .submit_derived(
                context,
                None,
                JobConfiguration::for_query(first_sql, use_legacy_sql),
            )
            .await?;
        self.task_store
            .put(JOB_ID_KEY, Value::String(first.reference.job_id.to_string()))
            .await?;

        tracing::info!(sql = second_sql, "executing second check query");
        let second = self
            .submit_derived(
                context,
                None,
                JobConfiguration::for_query(second_sql, use_legacy_sql),
            )
            .await?;

        match self.options.mode {
            ExecutionMode::Blocking => {
                let _timing = TimingGuard::new(|elapsed| self.metrics.observe_wait_duration(elapsed));
                let waits = futures::future::try_join(
                    self.client.wait_for_job(
                        &first.reference,
                        self.options.result_timeout,
                        &self.options.result_retry,
                    ),
                    self.client.wait_for_job(
                        &second.reference,
                        self.options.result_timeout,
                        &self.options.result_retry,
                    ),
                );
                let (first_done, second_done) = match waits.await {
                    Ok(handles) => handles,
                    Err(err) => {
                        self.metrics.record_completed("error");
                        return Err(err);
                    }
                };
                if let Err(err) = first_done.check_error().and_then(|()| second_done.check_error()) {
                    self.metrics.record_completed("error");
                    return Err(err);
                }
                self.metrics.record_completed("success");
                Ok(ExecutionOutcome::Completed(Resolution::JobPair {
                    first_job_id: first_done.reference.job_id,
                    second_job_id: second_done.reference.job_id,
                }))
            }
            ExecutionMode::Deferred => {
                let continuation = Continuation::AwaitJobPair {
                    first: first.reference,
                    second: second.reference,
                    poll_interval: self.options.poll_interval,
                    credential_chain: self.options.credential_chain.clone(),
                };
                self.register_watch(continuation).await
            }
        }
    }

    /// Runs the fetch flavor: read a bounded slice of a table through a
    /// generated query job.
    ///
    /// The query job's id is published under [`JOB_ID_KEY`]. Blocking mode
    /// waits for the job and fetches its rows through the client; deferred
    /// mode suspends behind a row watch whose success event carries the
    /// records.
    ///
    /// # Errors
    ///
    /// Fails like [`execute`](Self::execute), plus when rows cannot be
    /// fetched from the finished job.
    #[tracing::instrument(
        skip(self, context, fetch),
        fields(
            pipeline_id = %context.pipeline_id,
            task_id = %context.task_id,
            dataset_id = %fetch.dataset_id,
            table_id = %fetch.table_id
        )
    )]
    pub async fn execute_fetch(
        &self,
        context: &TaskContext,
        fetch: &FetchOptions,
    ) -> Result<ExecutionOutcome> {
        tracing::info!(
            project_id = fetch
                .table_project_id
                .as_deref()
                .unwrap_or(&self.options.project_id),
            max_results = fetch.max_results,
            "fetching table data"
        );
        let configuration = fetch.to_configuration(&self.options.project_id);
        let handle = self.submit_derived(context, None, configuration).await?;
        let reference = handle.reference.clone();

        self.task_store
            .put(JOB_ID_KEY, Value::String(reference.job_id.to_string()))
            .await?;

        match self.options.mode {
            ExecutionMode::Blocking => {
                self.wait_blocking(&reference).await?;
                let rows = self
                    .client
                    .fetch_rows(&reference, Some(fetch.max_results))
                    .await?;
                tracing::info!(row_count = rows.len(), "extracted rows");
                Ok(ExecutionOutcome::Completed(Resolution::Rows {
                    job_id: reference.job_id,
                    records: shape_rows(rows, fetch.as_mappings),
                }))
            }
            ExecutionMode::Deferred => {
                let continuation = Continuation::AwaitRows {
                    reference,
                    poll_interval: self.options.poll_interval,
                    credential_chain: self.options.credential_chain.clone(),
                    max_results: Some(fetch.max_results),
                    as_mappings: fetch.as_mappings,
                };
                self.register_watch(continuation).await
            }
        }
    }

    /// Resumes a suspended execution with the event its watch delivered.
    ///
    /// An error event is authoritative: it fails the execution with the
    /// event's message verbatim, regardless of the job's last known state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobFailure`] for error events, and
    /// [`Error::Protocol`] when a row watch resolves without records.
    #[tracing::instrument(skip(self, continuation, event), fields(kind = continuation.kind()))]
    pub fn resume(&self, continuation: Continuation, event: JobEvent) -> Result<Resolution> {
        if event.is_error() {
            self.metrics.record_completed("error");
            return Err(Error::job_failure(event.message));
        }

        let resolution = match continuation {
            Continuation::AwaitJob { reference, .. } => Resolution::Job {
                job_id: reference.job_id,
            },
            Continuation::AwaitJobPair { first, second, .. } => Resolution::JobPair {
                first_job_id: first.job_id,
                second_job_id: second.job_id,
            },
            Continuation::AwaitRows { reference, .. } => {
                let records = event.records.ok_or_else(|| {
                    Error::protocol("success event for a row watch carried no records")
                })?;
                Resolution::Rows {
                    job_id: reference.job_id,
                    records,
                }
            }
        };
        self.metrics.record_completed("success");
        tracing::info!(message = %event.message, "resumed after deferred wait");
        Ok(resolution)
    }

    /// Handles a kill signal for this task instance.
    ///
    /// Reads the qualified path published under [`JOB_ID_PATH_KEY`] and,
    /// when `cancel_on_kill` is set, issues a best-effort cancel request.
    /// Every failure on this path is logged and swallowed; a kill handler
    /// never escalates.
    pub async fn handle_kill(&self) {
        let stored = match self.task_store.get(JOB_ID_PATH_KEY).await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "could not read the stored job path, skipping cancellation");
                return;
            }
        };
        let Some(path) = stored.as_ref().and_then(Value::as_str) else {
            tracing::info!("no active job recorded, nothing to cancel");
            return;
        };
        let reference = match JobReference::parse_qualified_path(path) {
            Ok(reference) => reference,
            Err(err) => {
                tracing::warn!(error = %err, path, "stored job path is malformed, skipping cancellation");
                return;
            }
        };

        if !self.options.cancel_on_kill {
            tracing::info!(
                "Skipping to cancel job: {}:{}.{}",
                reference.project_id,
                reference.location_or_default(),
                reference.job_id
            );
            self.metrics.record_cancelled("skipped");
            return;
        }

        match self.client.cancel_job(&reference).await {
            Ok(()) => {
                tracing::info!(job_id = %reference.job_id, "requested job cancellation");
                self.metrics.record_cancelled("cancelled");
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    job_id = %reference.job_id,
                    "cancel request failed, the remote job may still be running"
                );
                self.metrics.record_cancelled("failed");
            }
        }
    }

    /// Derives an identity, submits, and reattaches on collision.
    async fn submit_derived(
        &self,
        context: &TaskContext,
        caller_job_id: Option<&str>,
        mut configuration: JobConfiguration,
    ) -> Result<JobHandle> {
        let job_id = derive_job_id(
            caller_job_id,
            &context.pipeline_id,
            &context.task_id,
            context.logical_date,
            &configuration,
            self.options.force_rerun,
        )?;
        let reference = JobReference::new(
            self.options.project_id.clone(),
            self.options.location.clone(),
            job_id,
        );

        configuration.inject_standard_labels(&context.pipeline_id, &context.task_id);
        for table in configuration.table_references() {
            tracing::debug!(table = %table, "job touches table");
        }
        tracing::info!(job_id = %reference.job_id, configuration = ?configuration, "submitting job");

        match self.client.insert_job(&reference, &configuration).await? {
            InsertOutcome::Created(handle) => {
                let kind = configuration.kind().map_or("unknown", JobKind::as_str);
                self.metrics.record_submitted(kind);
                Ok(handle)
            }
            InsertOutcome::AlreadyExists => self.reattach(&reference).await,
        }
    }

    /// Resolves an insert collision against the existing job.
    async fn reattach(&self, reference: &JobReference) -> Result<JobHandle> {
        let existing = self.client.get_job(reference).await?;
        if !self.options.reattach_states.contains(&existing.state) {
            return Err(Error::NotReattachable {
                job_id: existing.reference.job_id.to_string(),
                state: existing.state,
            });
        }

        tracing::info!(job_id = %reference.job_id, state = %existing.state, "reattaching to existing job");
        self.metrics.record_reattached(existing.state.as_str());

        // Resume tracking with a fresh snapshot. The remote API's begin
        // call is treated as refresh-only; any error already recorded on
        // the job fails the execution here.
        let refreshed = self.client.get_job(reference).await?;
        refreshed.check_error()?;
        Ok(refreshed)
    }

    /// Blocks on the client wait and turns a recorded error into a failure.
    async fn wait_blocking(&self, reference: &JobReference) -> Result<JobHandle> {
        let _timing = TimingGuard::new(|elapsed| self.metrics.observe_wait_duration(elapsed));
        let handle = match self
            .client
            .wait_for_job(
                reference,
                self.options.result_timeout,
                &self.options.result_retry,
            )
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                self.metrics.record_completed("error");
                return Err(err);
            }
        };
        if let Err(err) = handle.check_error() {
            self.metrics.record_completed("error");
            return Err(err);
        }
        self.metrics.record_completed("success");
        Ok(handle)
    }

    /// Registers the watch and hands the continuation back for storage.
    async fn register_watch(&self, continuation: Continuation) -> Result<ExecutionOutcome> {
        self.watch_runtime.register_watch(&continuation).await?;
        self.metrics.record_watch_registered();
        tracing::info!(kind = continuation.kind(), "registered watch, releasing worker");
        Ok(ExecutionOutcome::Suspended(continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::InMemoryJobClient;
    use crate::client::{ErrorResult, JobState};
    use crate::context::InMemoryTaskInstanceStore;
    use crate::watch::InMemoryWatchRuntime;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct Harness {
        lifecycle: JobLifecycle,
        client: Arc<InMemoryJobClient>,
        watch_runtime: Arc<InMemoryWatchRuntime>,
        task_store: Arc<InMemoryTaskInstanceStore>,
    }

    fn harness(client: InMemoryJobClient, options: LifecycleOptions) -> Harness {
        let client = Arc::new(client);
        let watch_runtime = Arc::new(InMemoryWatchRuntime::new());
        let task_store = Arc::new(InMemoryTaskInstanceStore::new());
        let lifecycle = JobLifecycle::new(
            Arc::clone(&client) as Arc<dyn JobClient>,
            Arc::clone(&watch_runtime) as Arc<dyn WatchRuntime>,
            Arc::clone(&task_store) as Arc<dyn TaskInstanceStore>,
            options,
        );
        Harness {
            lifecycle,
            client,
            watch_runtime,
            task_store,
        }
    }

    fn context() -> TaskContext {
        TaskContext::new(
            "etl",
            "load_events",
            Utc.with_ymd_and_hms(2025, 1, 15, 6, 30, 0).single().unwrap(),
        )
    }

    fn configuration() -> JobConfiguration {
        JobConfiguration::from_value(json!({"query": {"query": "SELECT 1"}})).unwrap()
    }

    #[tokio::test]
    async fn blocking_execute_returns_the_job_id() -> Result<()> {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        let ExecutionOutcome::Completed(Resolution::Job { job_id }) = &outcome else {
            panic!("expected a completed job, got {outcome:?}");
        };
        assert!(job_id.as_str().starts_with("quarry_etl_load_events_"));

        let stored = h.task_store.get(JOB_ID_PATH_KEY).await?.unwrap();
        assert_eq!(stored, json!(format!("proj:US:{job_id}")));
        assert_eq!(h.client.insert_attempts(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn submission_injects_standard_labels() -> Result<()> {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        let job_id = match outcome {
            ExecutionOutcome::Completed(resolution) => resolution.job_id().clone(),
            ExecutionOutcome::Suspended(_) => panic!("blocking mode cannot suspend"),
        };

        let reference = JobReference::new("proj", None, job_id);
        let stored = h.client.stored_configuration(&reference)?.unwrap();
        let labels = stored.labels().unwrap();
        assert_eq!(labels["quarry-pipeline"], "etl");
        assert_eq!(labels["quarry-task"], "load_events");
        Ok(())
    }

    #[tokio::test]
    async fn conflict_reattaches_when_the_state_is_declared() -> Result<()> {
        let client = InMemoryJobClient::new();
        let options = LifecycleOptions::new("proj").with_reattach_state(JobState::Done);
        let h = harness(client, options);

        let first = h.lifecycle.execute(&context(), configuration()).await?;
        let second = h.lifecycle.execute(&context(), configuration()).await?;

        assert!(first.is_completed(), "got {first:?}");
        assert!(second.is_completed(), "got {second:?}");
        assert_eq!(h.client.insert_attempts(), 2, "both executions attempted an insert");
        assert_eq!(h.client.job_count()?, 1, "no second remote job was created");
        Ok(())
    }

    #[tokio::test]
    async fn conflict_fails_when_the_state_is_not_declared() -> Result<()> {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));

        h.lifecycle.execute(&context(), configuration()).await?;
        let err = h
            .lifecycle
            .execute(&context(), configuration())
            .await
            .unwrap_err();

        assert!(err.is_not_reattachable(), "got {err}");
        assert!(err.to_string().contains("already exists and is in DONE state"));
        assert_eq!(h.client.job_count()?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn reattachment_propagates_a_recorded_error() -> Result<()> {
        let client = InMemoryJobClient::new();
        let options = LifecycleOptions::new("proj").with_reattach_state(JobState::Done);
        let h = harness(client, options);

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        let job_id = match outcome {
            ExecutionOutcome::Completed(resolution) => resolution.job_id().clone(),
            ExecutionOutcome::Suspended(_) => panic!("blocking mode cannot suspend"),
        };
        let reference = JobReference::new("proj", None, job_id);
        h.client
            .complete_job(&reference, Some(ErrorResult::new("out of slots")))?;

        let err = h
            .lifecycle
            .execute(&context(), configuration())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of slots"), "got {err}");
        Ok(())
    }

    #[tokio::test]
    async fn deferred_execute_suspends_behind_a_watch() -> Result<()> {
        let client = InMemoryJobClient::with_manual_completion();
        let options = LifecycleOptions::new("proj")
            .with_mode(ExecutionMode::Deferred)
            .with_credential_chain(["sa@proj.example".to_owned()]);
        let h = harness(client, options);

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        let ExecutionOutcome::Suspended(continuation) = &outcome else {
            panic!("expected a suspension, got {outcome:?}");
        };

        assert_eq!(h.watch_runtime.watch_count()?, 1);
        assert_eq!(continuation.kind(), "await_job");
        assert_eq!(
            continuation.credential_chain(),
            Some(&["sa@proj.example".to_owned()][..])
        );
        assert!(h.task_store.get(JOB_ID_PATH_KEY).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn deferred_execute_short_circuits_a_finished_job() -> Result<()> {
        let client = InMemoryJobClient::with_initial_state(JobState::Done);
        let options = LifecycleOptions::new("proj").with_mode(ExecutionMode::Deferred);
        let h = harness(client, options);

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        assert!(outcome.is_completed(), "got {outcome:?}");
        assert_eq!(h.watch_runtime.watch_count()?, 0, "no watch for a finished job");
        Ok(())
    }

    #[tokio::test]
    async fn deferred_short_circuit_propagates_a_born_failure() -> Result<()> {
        let client = InMemoryJobClient::with_insert_failure(ErrorResult::new("quota exceeded"));
        let options = LifecycleOptions::new("proj").with_mode(ExecutionMode::Deferred);
        let h = harness(client, options);

        let err = h
            .lifecycle
            .execute(&context(), configuration())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"), "got {err}");
        assert_eq!(h.watch_runtime.watch_count()?, 0, "failed jobs must not suspend");
        Ok(())
    }

    #[test]
    fn resume_surfaces_error_events_verbatim() {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));
        let continuation = Continuation::AwaitJob {
            reference: JobReference::new("proj", None, JobId::new_unchecked("job_1")),
            poll_interval: std::time::Duration::from_secs(4),
            credential_chain: None,
        };

        let err = h
            .lifecycle
            .resume(continuation, JobEvent::error("quota exceeded"))
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn resume_returns_the_job_id_on_success() -> Result<()> {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));
        let continuation = Continuation::AwaitJob {
            reference: JobReference::new("proj", None, JobId::new_unchecked("job_1")),
            poll_interval: std::time::Duration::from_secs(4),
            credential_chain: None,
        };

        let resolution = h
            .lifecycle
            .resume(continuation, JobEvent::success("Job completed"))?;
        assert_eq!(resolution.job_id().as_str(), "job_1");
        Ok(())
    }

    #[tokio::test]
    async fn kill_cancels_the_recorded_job() -> Result<()> {
        let client = InMemoryJobClient::with_manual_completion();
        let options = LifecycleOptions::new("proj").with_mode(ExecutionMode::Deferred);
        let h = harness(client, options);

        let outcome = h.lifecycle.execute(&context(), configuration()).await?;
        assert!(outcome.is_suspended());

        h.lifecycle.handle_kill().await;

        let path = h.task_store.get(JOB_ID_PATH_KEY).await?.unwrap();
        let reference = JobReference::parse_qualified_path(path.as_str().unwrap())?;
        assert!(h.client.cancel_requested(&reference)?);
        Ok(())
    }

    #[tokio::test]
    async fn kill_is_skipped_when_cancel_on_kill_is_off() -> Result<()> {
        let client = InMemoryJobClient::with_manual_completion();
        let options = LifecycleOptions::new("proj")
            .with_mode(ExecutionMode::Deferred)
            .with_cancel_on_kill(false);
        let h = harness(client, options);

        h.lifecycle.execute(&context(), configuration()).await?;
        h.lifecycle.handle_kill().await;

        let path = h.task_store.get(JOB_ID_PATH_KEY).await?.unwrap();
        let reference = JobReference::parse_qualified_path(path.as_str().unwrap())?;
        assert!(!h.client.cancel_requested(&reference)?);
        Ok(())
    }

    #[tokio::test]
    async fn kill_without_a_recorded_job_is_a_no_op() {
        let h = harness(InMemoryJobClient::new(), LifecycleOptions::new("proj"));
        h.lifecycle.handle_kill().await;
        assert_eq!(h.client.insert_attempts(), 0);
    }
}
