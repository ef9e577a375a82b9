//! Lifecycle options and their environment-derived defaults.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{JobState, RetryPolicy};
use crate::error::{Error, Result};

/// Default interval between remote state polls in deferred mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Environment variables consulted by [`LifecycleOptions::from_env`].
pub mod env_vars {
    /// Project jobs are billed to. Required by `from_env`.
    pub const PROJECT: &str = "QUARRY_JOB_PROJECT";
    /// Default processing location for new jobs.
    pub const LOCATION: &str = "QUARRY_JOB_LOCATION";
    /// Await completion in deferred mode (boolean).
    pub const DEFERRABLE: &str = "QUARRY_JOB_DEFERRABLE";
    /// Seconds between deferred-mode polls (non-negative integer).
    pub const POLL_INTERVAL_SECS: &str = "QUARRY_JOB_POLL_INTERVAL_SECS";
    /// Cancel the remote job when the task is killed (boolean).
    pub const CANCEL_ON_KILL: &str = "QUARRY_JOB_CANCEL_ON_KILL";
}

/// How a lifecycle awaits job completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Hold the worker and block on the client's synchronous wait.
    #[default]
    Blocking,
    /// Register a watch and release the worker until the event arrives.
    Deferred,
}

/// Configuration for one job lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleOptions {
    /// Project jobs are billed to.
    pub project_id: String,
    /// Processing location pinned for new jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Caller-supplied job id base, used verbatim when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// How completion is awaited.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// States safe to resume on a submission conflict. Empty by default:
    /// every unlisted state fails the conflict instead of resuming it.
    #[serde(default)]
    pub reattach_states: BTreeSet<JobState>,
    /// Derive a fresh identity on every attempt instead of the idempotent
    /// content hash.
    #[serde(default)]
    pub force_rerun: bool,
    /// Cancel the remote job when the task is killed.
    #[serde(default = "default_cancel_on_kill")]
    pub cancel_on_kill: bool,
    /// Timeout for the blocking wait. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_timeout: Option<Duration>,
    /// Retry policy handed to the client's blocking wait.
    #[serde(default)]
    pub result_retry: RetryPolicy,
    /// Interval between remote state polls in deferred mode.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Impersonation chain the watch runtime authenticates with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_chain: Option<Vec<String>>,
}

fn default_cancel_on_kill() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl LifecycleOptions {
    /// Creates options for a project with everything else at defaults:
    /// blocking mode, empty reattach set, cancel on kill.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: None,
            job_id: None,
            mode: ExecutionMode::default(),
            reattach_states: BTreeSet::new(),
            force_rerun: false,
            cancel_on_kill: default_cancel_on_kill(),
            result_timeout: None,
            result_retry: RetryPolicy::default(),
            poll_interval: default_poll_interval(),
            credential_chain: None,
        }
    }

    /// Builds options from `QUARRY_JOB_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the project variable is
    /// missing or any variable fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| {
            std::env::var(name).ok().and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_owned())
                }
            })
        })
    }

    /// Builds options from an injectable variable lookup.
    ///
    /// The lookup receives names from [`env_vars`] and returns the raw
    /// value, or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the project variable is
    /// missing or any variable fails to parse.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let project_id = lookup(env_vars::PROJECT).ok_or_else(|| {
            Error::invalid_configuration(format!("{} is required", env_vars::PROJECT))
        })?;

        let mut options = Self::new(project_id);
        options.location = lookup(env_vars::LOCATION);

        if let Some(value) = lookup(env_vars::DEFERRABLE) {
            options.mode = if parse_bool(env_vars::DEFERRABLE, &value)? {
                ExecutionMode::Deferred
            } else {
                ExecutionMode::Blocking
            };
        }
        if let Some(value) = lookup(env_vars::POLL_INTERVAL_SECS) {
            let secs: u64 = value.trim().parse().map_err(|_| {
                Error::invalid_configuration(format!(
                    "{} must be a non-negative integer (got {value:?})",
                    env_vars::POLL_INTERVAL_SECS
                ))
            })?;
            options.poll_interval = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(env_vars::CANCEL_ON_KILL) {
            options.cancel_on_kill = parse_bool(env_vars::CANCEL_ON_KILL, &value)?;
        }

        Ok(options)
    }

    /// Pins the processing location for new jobs.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the caller-supplied job id base.
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Selects how completion is awaited.
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Declares one state safe to resume on a submission conflict.
    #[must_use]
    pub fn with_reattach_state(mut self, state: JobState) -> Self {
        self.reattach_states.insert(state);
        self
    }

    /// Replaces the set of states safe to resume on a submission conflict.
    #[must_use]
    pub fn with_reattach_states(mut self, states: impl IntoIterator<Item = JobState>) -> Self {
        self.reattach_states = states.into_iter().collect();
        self
    }

    /// Sets whether every attempt derives a fresh identity.
    #[must_use]
    pub const fn with_force_rerun(mut self, force_rerun: bool) -> Self {
        self.force_rerun = force_rerun;
        self
    }

    /// Sets whether a kill signal cancels the remote job.
    #[must_use]
    pub const fn with_cancel_on_kill(mut self, cancel_on_kill: bool) -> Self {
        self.cancel_on_kill = cancel_on_kill;
        self
    }

    /// Bounds the blocking wait.
    #[must_use]
    pub const fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy handed to the blocking wait.
    #[must_use]
    pub fn with_result_retry(mut self, retry: RetryPolicy) -> Self {
        self.result_retry = retry;
        self
    }

    /// Sets the interval between deferred-mode polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the impersonation chain for the watch runtime.
    #[must_use]
    pub fn with_credential_chain(mut self, chain: impl IntoIterator<Item = String>) -> Self {
        self.credential_chain = Some(chain.into_iter().collect());
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::invalid_configuration(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| map.get(name).map(|v| (*v).to_owned())
    }

    #[test]
    fn defaults_are_blocking_and_strict() {
        let options = LifecycleOptions::new("proj");
        assert_eq!(options.mode, ExecutionMode::Blocking);
        assert!(options.reattach_states.is_empty());
        assert!(!options.force_rerun);
        assert!(options.cancel_on_kill);
        assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn builders_layer_onto_defaults() {
        let options = LifecycleOptions::new("proj")
            .with_location("EU")
            .with_mode(ExecutionMode::Deferred)
            .with_reattach_state(JobState::Running)
            .with_reattach_state(JobState::Pending)
            .with_force_rerun(true)
            .with_poll_interval(Duration::from_secs(10))
            .with_credential_chain(["sa@proj.example".to_owned()]);

        assert_eq!(options.location.as_deref(), Some("EU"));
        assert_eq!(options.mode, ExecutionMode::Deferred);
        assert!(options.reattach_states.contains(&JobState::Running));
        assert!(options.reattach_states.contains(&JobState::Pending));
        assert!(options.force_rerun);
        assert_eq!(options.poll_interval, Duration::from_secs(10));
        assert_eq!(
            options.credential_chain.as_deref(),
            Some(&["sa@proj.example".to_owned()][..])
        );
    }

    #[test]
    fn from_env_requires_the_project() {
        let err = LifecycleOptions::from_env_with(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains(env_vars::PROJECT));
    }

    #[test]
    fn from_env_parses_every_variable() -> Result<()> {
        let options = LifecycleOptions::from_env_with(lookup_from(&[
            (env_vars::PROJECT, "acme-analytics"),
            (env_vars::LOCATION, "EU"),
            (env_vars::DEFERRABLE, "true"),
            (env_vars::POLL_INTERVAL_SECS, "15"),
            (env_vars::CANCEL_ON_KILL, "no"),
        ]))?;

        assert_eq!(options.project_id, "acme-analytics");
        assert_eq!(options.location.as_deref(), Some("EU"));
        assert_eq!(options.mode, ExecutionMode::Deferred);
        assert_eq!(options.poll_interval, Duration::from_secs(15));
        assert!(!options.cancel_on_kill);
        Ok(())
    }

    #[test]
    fn from_env_rejects_malformed_values() {
        let err = LifecycleOptions::from_env_with(lookup_from(&[
            (env_vars::PROJECT, "proj"),
            (env_vars::DEFERRABLE, "sometimes"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(env_vars::DEFERRABLE));

        let err = LifecycleOptions::from_env_with(lookup_from(&[
            (env_vars::PROJECT, "proj"),
            (env_vars::POLL_INTERVAL_SECS, "4.5"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(env_vars::POLL_INTERVAL_SECS));
    }

    #[test]
    fn minimal_json_applies_serde_defaults() {
        let options: LifecycleOptions =
            serde_json::from_str(r#"{"project_id": "proj"}"#).unwrap();
        assert_eq!(options.mode, ExecutionMode::Blocking);
        assert!(options.cancel_on_kill);
        assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(options.reattach_states.is_empty());
    }
}
