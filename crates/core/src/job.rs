// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, status machine, and the job record.

use crate::circuit::CircuitId;
use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Byte length of a job id in RFC 4122 binary form.
pub const JOB_ID_LEN: usize = 16;

/// Unique identifier for a proof job.
///
/// A 128-bit v4 UUID. The canonical hyphenated text form travels in RPC
/// messages; the 16-byte big-endian binary form prefixes witness socket
/// uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the canonical text form.
    pub fn parse(s: &str) -> Result<Self, JobIdError> {
        Uuid::parse_str(s).map(Self).map_err(|_| JobIdError::Malformed(s.to_string()))
    }

    /// Reconstruct an id from its binary wire form.
    pub fn from_bytes(bytes: [u8; JOB_ID_LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Binary wire form (RFC 4122 byte order).
    pub fn as_bytes(&self) -> &[u8; JOB_ID_LEN] {
        self.0.as_bytes()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Error parsing a textual job id.
#[derive(Debug, Error, PartialEq)]
pub enum JobIdError {
    #[error("malformed job id: {0:?}")]
    Malformed(String),
}

/// Lifecycle status of a job.
///
/// Terminal statuses are final; `can_transition` encodes the full edge
/// set of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    WaitingWitness,
    Queued,
    Running,
    Completed,
    Errored,
    Cancelled,
}

impl JobStatus {
    /// Check if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Errored | JobStatus::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (WaitingWitness, Queued)
                | (WaitingWitness, Cancelled)
                | (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Completed)
                | (Running, Errored)
        )
    }

    /// Fixed integer value on the RPC wire.
    pub fn wire_value(&self) -> u8 {
        match self {
            JobStatus::WaitingWitness => 0,
            JobStatus::Queued => 1,
            JobStatus::Running => 2,
            JobStatus::Completed => 3,
            JobStatus::Errored => 4,
            JobStatus::Cancelled => 5,
        }
    }

    /// Inverse of [`wire_value`](Self::wire_value).
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(JobStatus::WaitingWitness),
            1 => Some(JobStatus::Queued),
            2 => Some(JobStatus::Running),
            3 => Some(JobStatus::Completed),
            4 => Some(JobStatus::Errored),
            5 => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

crate::simple_display! {
    JobStatus {
        WaitingWitness => "waiting_witness",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Errored => "errored",
        Cancelled => "cancelled",
    }
}

/// Attempted edge not present in the state machine.
#[derive(Debug, Error, PartialEq)]
#[error("illegal job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One proof task tracked by the registry.
///
/// Field presence follows the status: `witness` is set exactly once
/// before leaving `WaitingWitness`, `proof` only on `Completed`, `err`
/// only on `Errored`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub circuit_id: CircuitId,
    pub status: JobStatus,
    pub witness: Option<Vec<u8>>,
    pub proof: Option<Vec<u8>>,
    pub err: Option<String>,
    pub created_at: Instant,
    pub updated_at: Instant,
}

impl Job {
    /// Create a new job. An inline witness skips `WaitingWitness` and
    /// starts the job directly in `Queued`.
    pub fn new(circuit_id: CircuitId, witness: Option<Vec<u8>>, clock: &impl Clock) -> Self {
        let now = clock.now();
        let status =
            if witness.is_some() { JobStatus::Queued } else { JobStatus::WaitingWitness };
        Self {
            id: JobId::new(),
            circuit_id,
            status,
            witness,
            proof: None,
            err: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the job to `next`, stamping `updated_at`.
    pub fn transition(
        &mut self,
        next: JobStatus,
        clock: &impl Clock,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition(next) {
            return Err(TransitionError { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = clock.now();
        Ok(())
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Snapshot of the job as seen by subscribers.
    pub fn update(&self) -> JobUpdate {
        JobUpdate {
            job_id: self.id,
            status: self.status,
            proof: self.proof.clone(),
            err: self.err.clone(),
        }
    }
}

/// A status event published to a job's subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    pub proof: Option<Vec<u8>>,
    pub err: Option<String>,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
