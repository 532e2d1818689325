// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process prover for tests.
//!
//! Implements the cubic relation x³ + x + 5 = y regardless of the
//! catalog artifacts. The witness is two big-endian u64 words (x, then
//! y); the public witness is the trailing y word alone. Proofs are a
//! tagged copy of the public input, which is enough to make the
//! prove-then-verify law observable.

use std::time::Duration;

use async_trait::async_trait;
use proofd_core::Circuit;

use super::{Prover, ProverError};

const PROOF_TAG: &[u8] = b"cubic-proof-v1:";

/// Deterministic cubic-circuit prover with optional artificial latency.
#[derive(Default)]
pub struct FakeProver {
    delay: Option<Duration>,
}

impl FakeProver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every answer, so tests can observe running jobs.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    /// Full witness encoding: x then y, big-endian.
    pub fn encode_witness(x: u64, y: u64) -> Vec<u8> {
        let mut witness = x.to_be_bytes().to_vec();
        witness.extend_from_slice(&y.to_be_bytes());
        witness
    }

    /// Public witness encoding: just y.
    pub fn encode_public_witness(y: u64) -> Vec<u8> {
        y.to_be_bytes().to_vec()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn proof_for(y: u64) -> Vec<u8> {
    let mut proof = PROOF_TAG.to_vec();
    proof.extend_from_slice(&y.to_be_bytes());
    proof
}

fn word(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

#[async_trait]
impl Prover for FakeProver {
    async fn prove(&self, _circuit: &Circuit, witness: &[u8]) -> Result<Vec<u8>, ProverError> {
        self.pause().await;
        if witness.len() != 16 {
            return Err(ProverError::Failed(format!(
                "malformed witness of {} bytes",
                witness.len()
            )));
        }
        let (x, y) = match (word(&witness[..8]), word(&witness[8..])) {
            (Some(x), Some(y)) => (u128::from(x), y),
            _ => return Err(ProverError::Failed("malformed witness".to_string())),
        };
        // x³ can overflow u128 for adversarial x; that never equals a u64 y
        let lhs = x
            .checked_mul(x)
            .and_then(|xx| xx.checked_mul(x))
            .and_then(|xxx| xxx.checked_add(x + 5));
        if lhs != Some(u128::from(y)) {
            return Err(ProverError::Failed("witness does not satisfy the circuit".to_string()));
        }
        Ok(proof_for(y))
    }

    async fn verify(
        &self,
        _circuit: &Circuit,
        public_witness: &[u8],
        proof: &[u8],
    ) -> Result<bool, ProverError> {
        self.pause().await;
        let Some(y) = word(public_witness) else {
            return Err(ProverError::Failed("malformed public witness".to_string()));
        };
        Ok(proof == proof_for(y))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
