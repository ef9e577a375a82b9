//! Error types for the job lifecycle protocol.

use std::time::Duration;

use crate::client::JobState;

/// The result type used throughout quarry-job.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a remote job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A derived or caller-supplied job identifier violates the charset or
    /// length constraint.
    #[error("invalid job id: {message}")]
    InvalidJobId {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// A job configuration could not be interpreted.
    #[error("invalid job configuration: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A submission conflicted with an existing job whose state the caller
    /// has not declared safe to resume.
    #[error(
        "job with id {job_id} already exists and is in {state} state; \
         set force_rerun to submit a fresh job, or add {state} to the \
         reattach states to resume it"
    )]
    NotReattachable {
        /// The identifier of the conflicting job.
        job_id: String,
        /// The state the existing job was found in.
        state: JobState,
    },

    /// The remote job reported an error result. The message is passed
    /// through from the service or watch event verbatim.
    #[error("{message}")]
    JobFailure {
        /// The failure detail as reported remotely.
        message: String,
    },

    /// A blocking wait ran out of time before the job finished.
    #[error("job {job_id} did not complete within {timeout:?}")]
    WaitTimeout {
        /// The identifier of the job being awaited.
        job_id: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// A watch event or persisted value violated the resume contract.
    #[error("protocol violation: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },

    /// A call to an external collaborator failed at the transport level.
    #[error("service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An error from quarry-core.
    #[error("core error: {0}")]
    Core(#[from] quarry_core::Error),
}

impl Error {
    /// Creates a new invalid-job-id error.
    #[must_use]
    pub fn invalid_job_id(message: impl Into<String>) -> Self {
        Self::InvalidJobId {
            message: message.into(),
        }
    }

    /// Creates a new invalid-configuration error.
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates a job-failure error carrying the remote message verbatim.
    #[must_use]
    pub fn job_failure(message: impl Into<String>) -> Self {
        Self::JobFailure {
            message: message.into(),
        }
    }

    /// Creates a new protocol-violation error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a new service error.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new service error with a source.
    #[must_use]
    pub fn service_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Service {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if this error is the strict-reattach refusal.
    #[must_use]
    pub const fn is_not_reattachable(&self) -> bool {
        matches!(self, Self::NotReattachable { .. })
    }
}
