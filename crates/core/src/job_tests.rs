// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::circuit::{CircuitId, Curve};
use crate::FakeClock;
use std::time::Duration;

fn cubic() -> CircuitId {
    CircuitId::new(Curve::Bn256, "cubic")
}

#[test]
fn job_id_text_roundtrip() {
    let id = JobId::new();
    let parsed = JobId::parse(&id.to_string()).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn job_id_binary_roundtrip() {
    let id = JobId::new();
    let parsed = JobId::from_bytes(*id.as_bytes());
    assert_eq!(parsed, id);
}

#[test]
fn job_id_rejects_garbage() {
    let err = JobId::parse("not-a-uuid").unwrap_err();
    assert_eq!(err, JobIdError::Malformed("not-a-uuid".to_string()));
}

#[test]
fn job_id_serde_uses_canonical_text() {
    let id = JobId::parse("936da01f-9abd-4d9d-80c7-02af85c822a8").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"936da01f-9abd-4d9d-80c7-02af85c822a8\"");

    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn job_ids_are_unique() {
    // Uniqueness comes from the 122 random bits of a v4 UUID; a large
    // sample catches any accidental reuse of generator state.
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1_000_000 {
        assert!(seen.insert(JobId::new()));
    }
}

#[yare::parameterized(
    waiting_witness = { JobStatus::WaitingWitness, 0 },
    queued = { JobStatus::Queued, 1 },
    running = { JobStatus::Running, 2 },
    completed = { JobStatus::Completed, 3 },
    errored = { JobStatus::Errored, 4 },
    cancelled = { JobStatus::Cancelled, 5 },
)]
fn status_wire_values(status: JobStatus, value: u8) {
    assert_eq!(status.wire_value(), value);
    assert_eq!(JobStatus::from_wire(value), Some(status));
}

#[test]
fn status_from_wire_rejects_unknown() {
    assert_eq!(JobStatus::from_wire(6), None);
}

#[yare::parameterized(
    witness_to_queued = { JobStatus::WaitingWitness, JobStatus::Queued, true },
    witness_to_cancelled = { JobStatus::WaitingWitness, JobStatus::Cancelled, true },
    queued_to_running = { JobStatus::Queued, JobStatus::Running, true },
    queued_to_cancelled = { JobStatus::Queued, JobStatus::Cancelled, true },
    running_to_completed = { JobStatus::Running, JobStatus::Completed, true },
    running_to_errored = { JobStatus::Running, JobStatus::Errored, true },
    witness_to_running = { JobStatus::WaitingWitness, JobStatus::Running, false },
    running_to_cancelled = { JobStatus::Running, JobStatus::Cancelled, false },
    backward_running_to_queued = { JobStatus::Running, JobStatus::Queued, false },
    completed_is_final = { JobStatus::Completed, JobStatus::Running, false },
    errored_is_final = { JobStatus::Errored, JobStatus::Queued, false },
    cancelled_is_final = { JobStatus::Cancelled, JobStatus::Queued, false },
)]
fn transition_edges(from: JobStatus, to: JobStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn terminal_statuses() {
    assert!(!JobStatus::WaitingWitness.is_terminal());
    assert!(!JobStatus::Queued.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Errored.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
}

#[test]
fn new_job_waits_for_witness() {
    let clock = FakeClock::new();
    let job = Job::new(cubic(), None, &clock);

    assert_eq!(job.status, JobStatus::WaitingWitness);
    assert!(job.witness.is_none());
    assert!(job.proof.is_none());
    assert!(job.err.is_none());
    assert_eq!(job.created_at, job.updated_at);
}

#[test]
fn inline_witness_starts_queued() {
    let clock = FakeClock::new();
    let job = Job::new(cubic(), Some(vec![1, 2, 3]), &clock);

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.witness.as_deref(), Some(&[1, 2, 3][..]));
}

#[test]
fn transition_stamps_updated_at() {
    let clock = FakeClock::new();
    let mut job = Job::new(cubic(), None, &clock);

    clock.advance(Duration::from_secs(2));
    job.transition(JobStatus::Queued, &clock).unwrap();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.updated_at - job.created_at, Duration::from_secs(2));
}

#[test]
fn illegal_transition_is_rejected_and_leaves_job_untouched() {
    let clock = FakeClock::new();
    let mut job = Job::new(cubic(), None, &clock);

    let err = job.transition(JobStatus::Completed, &clock).unwrap_err();

    assert_eq!(err, TransitionError { from: JobStatus::WaitingWitness, to: JobStatus::Completed });
    assert_eq!(err.to_string(), "illegal job transition waiting_witness -> completed");
    assert_eq!(job.status, JobStatus::WaitingWitness);
}

#[test]
fn update_reflects_current_fields() {
    let clock = FakeClock::new();
    let mut job = Job::new(cubic(), Some(vec![9]), &clock);
    job.transition(JobStatus::Running, &clock).unwrap();
    job.proof = Some(vec![0xAB]);
    job.transition(JobStatus::Completed, &clock).unwrap();

    let update = job.update();
    assert_eq!(update.job_id, job.id);
    assert_eq!(update.status, JobStatus::Completed);
    assert_eq!(update.proof, Some(vec![0xAB]));
    assert_eq!(update.err, None);
}
