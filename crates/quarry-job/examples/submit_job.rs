//! Walkthrough of the job lifecycle against the in-memory client.
//!
//! Run with: `cargo run -p quarry-job --example submit_job`

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use quarry_job::error::Result;
use quarry_job::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let client: Arc<dyn JobClient> = Arc::new(InMemoryJobClient::new());
    let watches: Arc<dyn WatchRuntime> = Arc::new(InMemoryWatchRuntime::new());
    let store: Arc<dyn TaskInstanceStore> = Arc::new(InMemoryTaskInstanceStore::new());

    let context = TaskContext::new("nightly_etl", "load_events", Utc::now());

    // Submit and hold the worker until the job finishes.
    let blocking = JobLifecycle::new(
        Arc::clone(&client),
        Arc::clone(&watches),
        Arc::clone(&store),
        LifecycleOptions::new("acme-analytics").with_location("EU"),
    );
    let configuration = JobConfiguration::from_value(json!({
        "query": {"query": "SELECT 1", "useLegacySql": false}
    }))?;
    let outcome = blocking.execute(&context, configuration).await?;
    if let ExecutionOutcome::Completed(resolution) = outcome {
        println!("Blocking run finished: job {}", resolution.job_id());
    }

    // Submit, release the worker, and resume from the stored descriptor
    // when the completion event arrives.
    let deferred = JobLifecycle::new(
        client,
        watches,
        store,
        LifecycleOptions::new("acme-analytics")
            .with_location("EU")
            .with_mode(ExecutionMode::Deferred),
    );
    let configuration = JobConfiguration::from_value(json!({
        "query": {"query": "SELECT 2", "useLegacySql": false}
    }))?;
    let outcome = deferred.execute(&context, configuration).await?;
    if let ExecutionOutcome::Suspended(continuation) = outcome {
        println!(
            "Deferred run suspended behind a {} watch, polling every {:?}",
            continuation.kind(),
            continuation.poll_interval()
        );
        let resolution = deferred.resume(continuation, JobEvent::success("job finished"))?;
        println!("Deferred run resumed: job {}", resolution.job_id());
    }

    Ok(())
}
