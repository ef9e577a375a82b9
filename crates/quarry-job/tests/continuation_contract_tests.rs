//! Wire contract tests for the continuation descriptor and watch events.
//!
//! The serialized continuation is the resume contract between worker slots:
//! the orchestrator persists these documents across process boundaries, so
//! their shapes must stay stable.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use serde_json::json;

use quarry_job::client::JobReference;
use quarry_job::continuation::{Continuation, JobEvent, JobEventStatus};
use quarry_job::identity::JobId;
use quarry_job::lifecycle::Resolution;

fn reference(id: &str) -> JobReference {
    JobReference::new(
        "acme-analytics",
        Some("EU".to_owned()),
        JobId::new_unchecked(id),
    )
}

#[test]
fn await_job_wire_shape_is_stable() {
    let continuation = Continuation::AwaitJob {
        reference: reference("job_1"),
        poll_interval: Duration::from_secs(4),
        credential_chain: Some(vec!["sa@acme.example".to_owned()]),
    };

    let value = serde_json::to_value(&continuation).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "await_job",
            "reference": {
                "projectId": "acme-analytics",
                "location": "EU",
                "jobId": "job_1"
            },
            "poll_interval": {"secs": 4, "nanos": 0},
            "credential_chain": ["sa@acme.example"]
        })
    );
}

#[test]
fn optional_fields_are_omitted_from_the_wire() {
    let continuation = Continuation::AwaitJob {
        reference: JobReference::new("acme-analytics", None, JobId::new_unchecked("job_1")),
        poll_interval: Duration::from_secs(4),
        credential_chain: None,
    };

    let value = serde_json::to_value(&continuation).unwrap();
    assert!(value.get("credential_chain").is_none());
    assert!(value["reference"].get("location").is_none());
}

#[test]
fn every_variant_round_trips() {
    let continuations = vec![
        Continuation::AwaitJob {
            reference: reference("job_1"),
            poll_interval: Duration::from_secs(4),
            credential_chain: None,
        },
        Continuation::AwaitJobPair {
            first: reference("job_1"),
            second: reference("job_2"),
            poll_interval: Duration::from_secs(10),
            credential_chain: Some(vec!["sa@acme.example".to_owned()]),
        },
        Continuation::AwaitRows {
            reference: reference("job_1"),
            poll_interval: Duration::from_secs(4),
            credential_chain: None,
            max_results: Some(100),
            as_mappings: true,
        },
    ];

    for continuation in continuations {
        let encoded = serde_json::to_string(&continuation).unwrap();
        let restored: Continuation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(restored, continuation);
    }
}

#[test]
fn unknown_descriptor_types_are_rejected() {
    let result: Result<Continuation, _> = serde_json::from_value(json!({
        "type": "await_shards",
        "reference": {"projectId": "acme-analytics", "jobId": "job_1"},
        "poll_interval": {"secs": 4, "nanos": 0}
    }));
    assert!(result.is_err());
}

#[test]
fn await_rows_defaults_the_shaping_flag() {
    let continuation: Continuation = serde_json::from_value(json!({
        "type": "await_rows",
        "reference": {"projectId": "acme-analytics", "jobId": "job_1"},
        "poll_interval": {"secs": 4, "nanos": 0}
    }))
    .unwrap();

    let Continuation::AwaitRows {
        max_results,
        as_mappings,
        credential_chain,
        ..
    } = &continuation
    else {
        panic!("expected a row watch, got {continuation:?}");
    };
    assert_eq!(*max_results, None);
    assert!(!*as_mappings);
    assert_eq!(*credential_chain, None);
}

#[test]
fn events_distinguish_success_from_error() {
    let success: JobEvent = serde_json::from_value(json!({
        "status": "success",
        "message": "Job completed",
        "job_id": "job_1"
    }))
    .unwrap();
    assert_eq!(success.status, JobEventStatus::Success);
    assert!(!success.is_error());
    assert_eq!(success.records, None);

    let error: JobEvent = serde_json::from_value(json!({
        "status": "error",
        "message": "quota exceeded"
    }))
    .unwrap();
    assert!(error.is_error());
    assert_eq!(error.job_id, None);
}

#[test]
fn event_builders_mirror_the_wire_shape() {
    let event = JobEvent::success("Job completed")
        .with_job_id("job_1")
        .with_records(vec![json!([1, "a"])]);

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        json!({
            "status": "success",
            "message": "Job completed",
            "job_id": "job_1",
            "records": [[1, "a"]]
        })
    );
}

#[test]
fn resolutions_serialize_with_a_type_tag() {
    let pair = Resolution::JobPair {
        first_job_id: JobId::new_unchecked("job_1"),
        second_job_id: JobId::new_unchecked("job_2"),
    };
    let value = serde_json::to_value(&pair).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "job_pair",
            "first_job_id": "job_1",
            "second_job_id": "job_2"
        })
    );

    let rows = Resolution::Rows {
        job_id: JobId::new_unchecked("job_1"),
        records: vec![json!({"name": "a"})],
    };
    let restored: Resolution =
        serde_json::from_value(serde_json::to_value(&rows).unwrap()).unwrap();
    assert_eq!(restored, rows);
}
