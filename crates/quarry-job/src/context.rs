//! Task execution context and the cross-attempt key/value store.
//!
//! A lifecycle runs on behalf of one task instance of one pipeline run. The
//! orchestrator scopes a small key/value store to that instance; values
//! written there survive worker teardown, which is how the active job's
//! qualified path reaches a later kill signal or a downstream task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};

/// Store key under which the first submitted job id is published.
pub const JOB_ID_KEY: &str = "job_id";

/// Store key under which the qualified job path is published.
pub const JOB_ID_PATH_KEY: &str = "job_id_path";

/// Identity of the task execution a lifecycle runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    /// Pipeline the task belongs to.
    pub pipeline_id: String,
    /// The task within the pipeline.
    pub task_id: String,
    /// Logical timestamp of the pipeline run.
    pub logical_date: DateTime<Utc>,
}

impl TaskContext {
    /// Creates a task context.
    #[must_use]
    pub fn new(
        pipeline_id: impl Into<String>,
        task_id: impl Into<String>,
        logical_date: DateTime<Utc>,
    ) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            task_id: task_id.into(),
            logical_date,
        }
    }
}

/// Key/value store scoped to one task instance.
///
/// Implementations are already keyed by task-instance identity; keys passed
/// here are plain names like [`JOB_ID_PATH_KEY`]. Writes must be readable
/// by later attempts of the same instance and by its kill handler.
#[async_trait]
pub trait TaskInstanceStore: Send + Sync {
    /// Stores a value under a key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Reads the value stored under a key.
    ///
    /// Returns `None` if the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn get(&self, key: &str) -> Result<Option<Value>>;
}

/// Converts a lock poison error to a protocol error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::protocol("task store lock poisoned")
}

/// In-memory task instance store for testing.
#[derive(Debug, Default)]
pub struct InMemoryTaskInstanceStore {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemoryTaskInstanceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys written.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let count = {
            let values = self.values.read().map_err(poison_err)?;
            values.len()
        };
        Ok(count)
    }

    /// Returns true if nothing was written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl TaskInstanceStore for InMemoryTaskInstanceStore {
    async fn put(&self, key: &str, value: Value) -> Result<()> {
        {
            let mut values = self.values.write().map_err(poison_err)?;
            values.insert(key.to_owned(), value);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = {
            let values = self.values.read().map_err(poison_err)?;
            values.get(key).cloned()
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() -> Result<()> {
        let store = InMemoryTaskInstanceStore::new();
        assert!(store.is_empty()?);

        store.put(JOB_ID_PATH_KEY, json!("proj:US:job_1")).await?;
        assert_eq!(store.get(JOB_ID_PATH_KEY).await?, Some(json!("proj:US:job_1")));
        assert_eq!(store.get("unset").await?, None);
        assert_eq!(store.len()?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn put_replaces_previous_values() -> Result<()> {
        let store = InMemoryTaskInstanceStore::new();
        store.put(JOB_ID_KEY, json!("first")).await?;
        store.put(JOB_ID_KEY, json!("second")).await?;
        assert_eq!(store.get(JOB_ID_KEY).await?, Some(json!("second")));
        Ok(())
    }
}
