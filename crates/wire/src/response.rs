// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::types::{ErrorKind, ProveJobResult};

/// Response from the daemon to a client.
///
/// `SubscribeToProveJob` produces a sequence of `JobEvent` frames on one
/// connection; the daemon closes the connection after the terminal frame.
/// Every other request gets exactly one response frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Health check response
    Pong,

    /// Synchronous proof result
    ProveResult { proof: Vec<u8> },

    /// Verification verdict
    VerifyResult { ok: bool },

    /// Async job allocated
    JobCreated { job_id: String },

    /// One status event on a subscription stream; also the response to
    /// `CancelProveJob`
    JobEvent { result: ProveJobResult },

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error { kind: ErrorKind, message: String },
}
