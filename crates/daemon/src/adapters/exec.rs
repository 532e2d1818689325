// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess prover adapter.
//!
//! Invokes the configured executable as `<cmd> prove <circuit-id>` or
//! `<cmd> verify <circuit-id>` with every input as a length-prefixed
//! section on stdin (4-byte big-endian length, then the bytes):
//!
//! - `prove`: constraint system, proving key, witness; stdout is the proof.
//! - `verify`: verifying key, public witness, proof; exit 0 means valid,
//!   exit 1 means invalid.
//!
//! Any other exit status is a fault carrying the child's stderr.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use proofd_core::Circuit;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Prover, ProverError};

/// Prover bound to an external executable.
pub struct ExecProver {
    cmd: PathBuf,
}

impl ExecProver {
    pub fn new(cmd: impl Into<PathBuf>) -> Self {
        Self { cmd: cmd.into() }
    }

    async fn run(
        &self,
        subcommand: &str,
        circuit: &Circuit,
        sections: [&[u8]; 3],
    ) -> Result<std::process::Output, ProverError> {
        let backend = |e: std::io::Error| ProverError::Backend(e.to_string());

        let mut child = Command::new(&self.cmd)
            .arg(subcommand)
            .arg(circuit.id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProverError::Backend(format!("spawn {:?}: {e}", self.cmd)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProverError::Backend("child stdin unavailable".to_string()))?;
        for section in sections {
            stdin.write_all(&(section.len() as u32).to_be_bytes()).await.map_err(backend)?;
            stdin.write_all(section).await.map_err(backend)?;
        }
        // Close stdin so the child sees EOF after the last section
        drop(stdin);

        let output = child.wait_with_output().await.map_err(backend)?;
        debug!(cmd = ?self.cmd, subcommand, status = ?output.status, "prover exited");
        Ok(output)
    }
}

#[async_trait]
impl Prover for ExecProver {
    async fn prove(&self, circuit: &Circuit, witness: &[u8]) -> Result<Vec<u8>, ProverError> {
        let output = self
            .run("prove", circuit, [&circuit.constraint_system, &circuit.proving_key, witness])
            .await?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(ProverError::Failed(stderr_message(&output)))
        }
    }

    async fn verify(
        &self,
        circuit: &Circuit,
        public_witness: &[u8],
        proof: &[u8],
    ) -> Result<bool, ProverError> {
        let output = self
            .run("verify", circuit, [&circuit.verifying_key, public_witness, proof])
            .await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ProverError::Failed(stderr_message(&output))),
        }
    }
}

fn stderr_message(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("prover exited with {}", output.status)
    } else {
        trimmed.to_string()
    }
}

#[cfg(all(test, unix))]
#[path = "exec_tests.rs"]
mod tests;
