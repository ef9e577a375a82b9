//! Serializable continuations for deferred waits.
//!
//! When a lifecycle suspends, everything needed to resume after a full
//! process teardown is captured in a [`Continuation`]: which jobs to watch,
//! how often to poll, and which credentials to poll with. The orchestrator
//! stores the descriptor, hands it to the watch runtime, and later resumes
//! the lifecycle by matching the descriptor variant to its handler together
//! with the delivered [`JobEvent`]. No in-memory state survives the
//! suspension.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::JobReference;

/// Resume points of a suspended lifecycle.
///
/// Each variant corresponds to one watch registered with the external
/// polling runtime and to exactly one [`JobEvent`] delivered later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Continuation {
    /// Awaiting a single job submitted by the insert flavor.
    AwaitJob {
        /// The job being watched.
        reference: JobReference,
        /// Interval between remote state polls.
        poll_interval: Duration,
        /// Impersonation chain the poller authenticates with.
        #[serde(skip_serializing_if = "Option::is_none")]
        credential_chain: Option<Vec<String>>,
    },

    /// Awaiting both jobs of an interval-check pair under one watch.
    ///
    /// The jobs complete in arbitrary order remotely; the runtime delivers
    /// a single joint event once both are terminal.
    AwaitJobPair {
        /// The current-period job.
        first: JobReference,
        /// The prior-period job.
        second: JobReference,
        /// Interval between remote state polls.
        poll_interval: Duration,
        /// Impersonation chain the poller authenticates with.
        #[serde(skip_serializing_if = "Option::is_none")]
        credential_chain: Option<Vec<String>>,
    },

    /// Awaiting a row-producing query job whose success event carries the
    /// fetched records.
    AwaitRows {
        /// The query job being watched.
        reference: JobReference,
        /// Interval between remote state polls.
        poll_interval: Duration,
        /// Impersonation chain the poller authenticates with.
        #[serde(skip_serializing_if = "Option::is_none")]
        credential_chain: Option<Vec<String>>,
        /// Cap on the number of records the event may carry.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_results: Option<u64>,
        /// Return records as field-keyed mappings instead of value tuples.
        #[serde(default)]
        as_mappings: bool,
    },
}

impl Continuation {
    /// Returns every job reference covered by this watch.
    #[must_use]
    pub fn references(&self) -> Vec<&JobReference> {
        match self {
            Continuation::AwaitJob { reference, .. }
            | Continuation::AwaitRows { reference, .. } => vec![reference],
            Continuation::AwaitJobPair { first, second, .. } => vec![first, second],
        }
    }

    /// Returns the interval between remote state polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        match self {
            Continuation::AwaitJob { poll_interval, .. }
            | Continuation::AwaitJobPair { poll_interval, .. }
            | Continuation::AwaitRows { poll_interval, .. } => *poll_interval,
        }
    }

    /// Returns the impersonation chain, if one was configured.
    #[must_use]
    pub fn credential_chain(&self) -> Option<&[String]> {
        match self {
            Continuation::AwaitJob {
                credential_chain, ..
            }
            | Continuation::AwaitJobPair {
                credential_chain, ..
            }
            | Continuation::AwaitRows {
                credential_chain, ..
            } => credential_chain.as_deref(),
        }
    }

    /// Returns the variant name as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Continuation::AwaitJob { .. } => "await_job",
            Continuation::AwaitJobPair { .. } => "await_job_pair",
            Continuation::AwaitRows { .. } => "await_rows",
        }
    }
}

/// Terminal status carried by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventStatus {
    /// Every watched job finished without an error result.
    Success,
    /// A watched job failed, or the watch itself gave up.
    Error,
}

/// The single notification delivered when a watch resolves.
///
/// On error the message is authoritative: it is surfaced verbatim without
/// re-validation against the job's last known state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Terminal status of the watch.
    pub status: JobEventStatus,
    /// Human-readable completion or failure detail.
    pub message: String,
    /// Identifier of the finished job, when the watch covered exactly one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Fetched records, present only for row watches that succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Value>>,
}

impl JobEvent {
    /// Creates a success event.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: JobEventStatus::Success,
            message: message.into(),
            job_id: None,
            records: None,
        }
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobEventStatus::Error,
            message: message.into(),
            job_id: None,
            records: None,
        }
    }

    /// Sets the finished job's identifier.
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Attaches fetched records.
    #[must_use]
    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.records = Some(records);
        self
    }

    /// Returns true for error events.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, JobEventStatus::Error)
    }
}
