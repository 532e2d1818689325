// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTO types shared by requests and responses.

use proofd_core::{JobStatus, JobUpdate};
use serde::{Deserialize, Serialize};

/// One status event for a proof job.
///
/// `status` uses the fixed integer wire values
/// (`waiting_witness=0 .. cancelled=5`); `proof` is present only with
/// `completed`, `err` only with `errored`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProveJobResult {
    #[serde(with = "status_wire")]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl From<&JobUpdate> for ProveJobResult {
    fn from(update: &JobUpdate) -> Self {
        Self { status: update.status, proof: update.proof.clone(), err: update.err.clone() }
    }
}

mod status_wire {
    use proofd_core::JobStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &JobStatus, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(status.wire_value())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JobStatus, D::Error> {
        let value = u8::deserialize(deserializer)?;
        JobStatus::from_wire(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status wire value {value}")))
    }
}

/// Classification of an error response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown circuit or job id
    NotFound,
    /// Operation illegal in the job's current state
    WrongState,
    /// Subscriber outran its event queue; only that stream terminates
    Lagged,
    /// Witness read or request deadline elapsed
    DeadlineExceeded,
    /// Inflight job cap reached
    ResourceExhausted,
    /// Prover, verifier, or daemon fault
    Internal,
    /// Job or daemon shut down while the request was in flight
    Cancelled,
    /// Malformed id or payload
    InvalidArgument,
}

proofd_core::simple_display! {
    ErrorKind {
        NotFound => "not_found",
        WrongState => "wrong_state",
        Lagged => "lagged",
        DeadlineExceeded => "deadline_exceeded",
        ResourceExhausted => "resource_exhausted",
        Internal => "internal",
        Cancelled => "cancelled",
        InvalidArgument => "invalid_argument",
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
