// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Witness listener: bulk witness ingestion over a raw byte stream.
//!
//! Per-connection protocol: 16 bytes of job id (RFC 4122 binary form),
//! then the witness payload until the peer half-closes. There is no
//! framing and no response; the daemon closes the connection after
//! attaching, and closes it silently on any mismatch or error so a
//! client can retry while the job still waits.

use std::sync::Arc;
use std::time::Duration;

use proofd_core::{Clock, JobId, JobStatus, JOB_ID_LEN};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::registry::JobRegistry;

/// Listener task for the witness socket.
pub(crate) struct WitnessListener<C: Clock> {
    tcp: TcpListener,
    registry: Arc<JobRegistry<C>>,
    deadline: Duration,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> WitnessListener<C> {
    pub(crate) fn new(
        tcp: TcpListener,
        registry: Arc<JobRegistry<C>>,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self { tcp, registry, deadline, cancel }
    }

    /// Accept connections until shutdown, one task per upload.
    pub(crate) async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.tcp.accept() => match result {
                    Ok((stream, addr)) => {
                        debug!(%addr, "witness connection");
                        let registry = Arc::clone(&self.registry);
                        let deadline = self.deadline;
                        tokio::spawn(handle_upload(stream, registry, deadline));
                    }
                    Err(e) => error!("witness accept error: {}", e),
                },
            }
        }
        debug!("witness listener stopped");
    }
}

async fn handle_upload<C: Clock>(
    mut stream: TcpStream,
    registry: Arc<JobRegistry<C>>,
    deadline: Duration,
) {
    match tokio::time::timeout(deadline, read_upload(&mut stream, &registry)).await {
        Ok(Ok(Some((id, witness)))) => {
            if let Err(e) = registry.attach_witness(id, witness) {
                // A concurrent uploader won the race, or the job was
                // cancelled mid-read; this upload is dropped.
                debug!(job = %id, "witness rejected: {}", e);
            }
        }
        Ok(Ok(None)) => {}
        Ok(Err(e)) => debug!("witness read error: {}", e),
        Err(_) => debug!("witness read deadline exceeded"),
    }
    // The connection closes on drop, with no response either way. A job
    // whose upload failed stays in WAITING_WITNESS for a retry.
}

/// Read the id prefix, validate the job, then buffer the payload until
/// EOF. `None` means the job is unknown or not awaiting a witness.
async fn read_upload<C: Clock>(
    stream: &mut TcpStream,
    registry: &JobRegistry<C>,
) -> std::io::Result<Option<(JobId, Vec<u8>)>> {
    let mut id_buf = [0u8; JOB_ID_LEN];
    stream.read_exact(&mut id_buf).await?;
    let id = JobId::from_bytes(id_buf);

    // Early check so a bogus upload is dropped before buffering its
    // payload; attach_witness re-validates under the job lock.
    match registry.get(id) {
        Ok(job) if job.status == JobStatus::WaitingWitness => {}
        Ok(job) => {
            debug!(job = %id, status = %job.status, "witness for job not awaiting one");
            return Ok(None);
        }
        Err(_) => {
            debug!(job = %id, "witness for unknown job");
            return Ok(None);
        }
    }

    let mut witness = Vec::new();
    stream.read_to_end(&mut witness).await?;
    Ok(Some((id, witness)))
}

#[cfg(test)]
#[path = "witness_tests.rs"]
mod tests;
