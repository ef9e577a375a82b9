//! Registration of deferred waits with the external polling runtime.
//!
//! The lifecycle never polls remote jobs itself in deferred mode. It hands
//! a [`Continuation`] to a [`WatchRuntime`] and releases its worker slot;
//! the runtime polls on its own schedule and delivers exactly one
//! [`crate::continuation::JobEvent`] per registered watch, through whatever
//! channel the orchestrator provides.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::continuation::Continuation;
use crate::error::{Error, Result};

/// External polling runtime accepting watch registrations.
///
/// ## Delivery Contract
///
/// - Exactly one event per registered watch
/// - A watch over several jobs resolves once all of them are terminal
/// - A timeout in the runtime is delivered as an error event, not silence
#[async_trait]
pub trait WatchRuntime: Send + Sync {
    /// Registers a watch described by the continuation.
    ///
    /// Returns once the registration is durable; the wait itself happens
    /// entirely outside the calling task.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration cannot be recorded.
    async fn register_watch(&self, continuation: &Continuation) -> Result<()>;
}

/// Converts a lock poison error to a protocol error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::protocol("watch registry lock poisoned")
}

/// In-memory watch runtime for testing.
///
/// Records registrations without ever polling; tests deliver events by
/// calling the lifecycle's resume entry point directly.
#[derive(Debug, Default)]
pub struct InMemoryWatchRuntime {
    watches: RwLock<Vec<Continuation>>,
}

impl InMemoryWatchRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every continuation registered so far, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn registered(&self) -> Result<Vec<Continuation>> {
        let watches = {
            let watches = self.watches.read().map_err(poison_err)?;
            watches.clone()
        };
        Ok(watches)
    }

    /// Returns the number of watches registered so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn watch_count(&self) -> Result<usize> {
        let count = {
            let watches = self.watches.read().map_err(poison_err)?;
            watches.len()
        };
        Ok(count)
    }
}

#[async_trait]
impl WatchRuntime for InMemoryWatchRuntime {
    async fn register_watch(&self, continuation: &Continuation) -> Result<()> {
        {
            let mut watches = self.watches.write().map_err(poison_err)?;
            watches.push(continuation.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::JobReference;
    use crate::identity::JobId;
    use std::time::Duration;

    fn continuation(id: &str) -> Continuation {
        Continuation::AwaitJob {
            reference: JobReference::new("proj", None, JobId::new_unchecked(id)),
            poll_interval: Duration::from_secs(4),
            credential_chain: None,
        }
    }

    #[tokio::test]
    async fn registrations_are_recorded_in_order() -> Result<()> {
        let runtime = InMemoryWatchRuntime::new();
        runtime.register_watch(&continuation("job_1")).await?;
        runtime.register_watch(&continuation("job_2")).await?;

        assert_eq!(runtime.watch_count()?, 2);
        let ids: Vec<String> = runtime
            .registered()?
            .iter()
            .map(|c| c.references()[0].job_id.to_string())
            .collect();
        assert_eq!(ids, ["job_1", "job_2"]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_runtime_reports_no_watches() -> Result<()> {
        let runtime = InMemoryWatchRuntime::new();
        assert_eq!(runtime.watch_count()?, 0);
        assert!(runtime.registered()?.is_empty());
        Ok(())
    }
}
