// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Request from a client to the daemon.
///
/// Circuit and job ids travel as text; a job id is the canonical
/// hyphenated form of a 128-bit UUID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Synchronous end-to-end proof over an inline witness
    Prove { circuit_id: String, witness: Vec<u8> },

    /// Stateless proof verification
    Verify { circuit_id: String, public_witness: Vec<u8>, proof: Vec<u8> },

    /// Allocate an async proof job; the witness arrives later on the
    /// witness socket
    CreateProveJob { circuit_id: String },

    /// Stream status events for a job until it reaches a terminal state
    SubscribeToProveJob { job_id: String },

    /// Cancel a job that has not started running
    CancelProveJob { job_id: String },

    /// Request daemon shutdown
    Shutdown,
}

impl Request {
    /// Method name for logging; payloads (witnesses) stay out of logs.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::Prove { .. } => "Prove",
            Request::Verify { .. } => "Verify",
            Request::CreateProveJob { .. } => "CreateProveJob",
            Request::SubscribeToProveJob { .. } => "SubscribeToProveJob",
            Request::CancelProveJob { .. } => "CancelProveJob",
            Request::Shutdown => "Shutdown",
        }
    }
}
