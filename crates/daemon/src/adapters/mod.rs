// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External capability adapters.
//!
//! The proof backend is a collaborator, not part of the daemon: workers
//! and RPC handlers only ever see the [`Prover`] trait. The production
//! binary binds it to an external executable ([`ExecProver`]); tests
//! bind it to the in-process [`FakeProver`].

mod exec;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use exec::ExecProver;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProver;

use async_trait::async_trait;
use proofd_core::Circuit;
use thiserror::Error;

/// Black-box proof generation and verification over a catalog entry.
#[async_trait]
pub trait Prover: Send + Sync {
    /// Produce a proof for `witness` over `circuit`.
    async fn prove(&self, circuit: &Circuit, witness: &[u8]) -> Result<Vec<u8>, ProverError>;

    /// Check `proof` against the public part of a witness.
    async fn verify(
        &self,
        circuit: &Circuit,
        public_witness: &[u8],
        proof: &[u8],
    ) -> Result<bool, ProverError>;
}

/// Prover faults. Both kinds surface to callers as the job's (or
/// request's) error message.
#[derive(Debug, Error, PartialEq)]
pub enum ProverError {
    /// The backend rejected the input (e.g. the witness does not satisfy
    /// the circuit).
    #[error("{0}")]
    Failed(String),

    /// The backend itself broke.
    #[error("prover backend: {0}")]
    Backend(String),
}
