//! Observability metrics for the job lifecycle.
//!
//! This module provides Prometheus-compatible metrics for monitoring
//! job submission, reattachment, and completion.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `quarry_jobs_submitted_total` | Counter | `kind` | Jobs created remotely |
//! | `quarry_jobs_reattached_total` | Counter | `state` | Conflicts resolved by reattaching |
//! | `quarry_jobs_completed_total` | Counter | `outcome` | Terminal job outcomes |
//! | `quarry_jobs_cancelled_total` | Counter | `result` | Best-effort cancel attempts |
//! | `quarry_watches_registered_total` | Counter | - | Deferred watches handed off |
//! | `quarry_job_wait_duration_seconds` | Histogram | - | Blocking wait duration |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quarry_job::metrics::JobMetrics;
//!
//! let metrics = JobMetrics::new();
//! metrics.record_submitted("query");
//! metrics.record_completed("success");
//! ```
//!
//! ## Integration
//!
//! Metrics are exposed via the `metrics` crate facade; install a recorder
//! (for example a Prometheus exporter) in the embedding binary.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Jobs created remotely.
    pub const JOBS_SUBMITTED_TOTAL: &str = "quarry_jobs_submitted_total";
    /// Counter: Conflicts resolved by reattaching to an existing job.
    pub const JOBS_REATTACHED_TOTAL: &str = "quarry_jobs_reattached_total";
    /// Counter: Terminal job outcomes observed by the lifecycle.
    pub const JOBS_COMPLETED_TOTAL: &str = "quarry_jobs_completed_total";
    /// Counter: Best-effort cancel attempts on kill.
    pub const JOBS_CANCELLED_TOTAL: &str = "quarry_jobs_cancelled_total";
    /// Counter: Deferred watches handed off to the polling runtime.
    pub const WATCHES_REGISTERED_TOTAL: &str = "quarry_watches_registered_total";
    /// Histogram: Blocking wait duration in seconds.
    pub const JOB_WAIT_DURATION_SECONDS: &str = "quarry_job_wait_duration_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Job kind (query, load, copy, extract).
    pub const KIND: &str = "kind";
    /// Job state at the time of the observation.
    pub const STATE: &str = "state";
    /// Terminal outcome (success, error).
    pub const OUTCOME: &str = "outcome";
    /// Result of an attempted operation (cancelled, failed, skipped).
    pub const RESULT: &str = "result";
}

/// High-level interface for recording job lifecycle metrics.
///
/// Cheap to clone and share across tasks.
#[derive(Debug, Clone, Default)]
pub struct JobMetrics {
    _private: (),
}

impl JobMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a job created remotely.
    pub fn record_submitted(&self, kind: &str) {
        counter!(
            names::JOBS_SUBMITTED_TOTAL,
            labels::KIND => kind.to_string(),
        )
        .increment(1);
    }

    /// Records a conflict resolved by reattaching to an existing job.
    pub fn record_reattached(&self, state: &str) {
        counter!(
            names::JOBS_REATTACHED_TOTAL,
            labels::STATE => state.to_string(),
        )
        .increment(1);
    }

    /// Records a terminal job outcome.
    pub fn record_completed(&self, outcome: &str) {
        counter!(
            names::JOBS_COMPLETED_TOTAL,
            labels::OUTCOME => outcome.to_string(),
        )
        .increment(1);
    }

    /// Records a best-effort cancel attempt.
    pub fn record_cancelled(&self, result: &str) {
        counter!(
            names::JOBS_CANCELLED_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records a deferred watch handed off to the polling runtime.
    pub fn record_watch_registered(&self) {
        counter!(names::WATCHES_REGISTERED_TOTAL).increment(1);
    }

    /// Records the duration of a blocking wait.
    pub fn observe_wait_duration(&self, duration: Duration) {
        histogram!(names::JOB_WAIT_DURATION_SECONDS).record(duration.as_secs_f64());
    }
}

/// RAII guard for timing operations.
///
/// Automatically records duration when dropped.
///
/// ## Example
///
/// ```rust,no_run
/// use quarry_job::metrics::{JobMetrics, TimingGuard};
///
/// let metrics = JobMetrics::new();
///
/// {
///     let _guard = TimingGuard::new(|duration| {
///         metrics.observe_wait_duration(duration);
///     });
///
///     // Await the job...
/// } // Duration recorded automatically on drop
/// ```
pub struct TimingGuard<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> TimingGuard<F>
where
    F: FnOnce(Duration),
{
    /// Creates a new timing guard that will call `on_drop` with the elapsed duration.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<F> Drop for TimingGuard<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_metrics_can_record_counters() {
        let metrics = JobMetrics::new();

        // These calls should not panic even without a metrics recorder installed
        metrics.record_submitted("query");
        metrics.record_reattached("RUNNING");
        metrics.record_completed("success");
        metrics.record_cancelled("skipped");
        metrics.record_watch_registered();
    }

    #[test]
    fn job_metrics_can_observe_durations() {
        let metrics = JobMetrics::new();
        metrics.observe_wait_duration(Duration::from_millis(100));
    }

    #[test]
    fn timing_guard_measures_duration() {
        let mut recorded_duration = None;

        {
            let _guard = TimingGuard::new(|d| {
                recorded_duration = Some(d);
            });
            std::thread::sleep(Duration::from_millis(10));
        }

        // Duration should have been recorded
        assert!(recorded_duration.is_some());
        assert!(recorded_duration.is_some_and(|d| d >= Duration::from_millis(10)));
    }

    #[test]
    fn timing_guard_elapsed_works() {
        let guard = TimingGuard::new(|_| {});
        std::thread::sleep(Duration::from_millis(5));
        let elapsed = guard.elapsed();
        assert!(elapsed >= Duration::from_millis(5));
    }
}
