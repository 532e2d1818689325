// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! proofd-client: async client for the proofd daemon.
//!
//! Every RPC opens one connection, sends one request, and reads the
//! response(s); `subscribe_to_prove_job` keeps the connection as an
//! event stream. Witness uploads go to the separate witness socket via
//! [`Client::send_witness`].

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use proofd_core::{JobId, JobIdError};
use proofd_wire::{
    decode, encode, read_message, write_message, ErrorKind, ProtocolError, ProveJobResult,
    Request, Response,
};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Client for the daemon's RPC endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    rpc_addr: String,
    timeout: Duration,
}

impl Client {
    pub fn new(rpc_addr: impl Into<String>) -> Self {
        Self { rpc_addr: rpc_addr.into(), timeout: Duration::from_secs(10) }
    }

    /// Override the per-message timeout (default 10s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Health check.
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.call(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Synchronous end-to-end proof.
    pub async fn prove(&self, circuit_id: &str, witness: &[u8]) -> Result<Vec<u8>, ClientError> {
        let request = Request::Prove {
            circuit_id: circuit_id.to_string(),
            witness: witness.to_vec(),
        };
        match self.call(&request).await? {
            Response::ProveResult { proof } => Ok(proof),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Synchronous proof verification.
    pub async fn verify(
        &self,
        circuit_id: &str,
        public_witness: &[u8],
        proof: &[u8],
    ) -> Result<bool, ClientError> {
        let request = Request::Verify {
            circuit_id: circuit_id.to_string(),
            public_witness: public_witness.to_vec(),
            proof: proof.to_vec(),
        };
        match self.call(&request).await? {
            Response::VerifyResult { ok } => Ok(ok),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Allocate an async proof job; returns the job id in canonical
    /// UUID text form.
    pub async fn create_prove_job(&self, circuit_id: &str) -> Result<String, ClientError> {
        let request = Request::CreateProveJob { circuit_id: circuit_id.to_string() };
        match self.call(&request).await? {
            Response::JobCreated { job_id } => Ok(job_id),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Cancel a job; terminal jobs report their current status.
    pub async fn cancel_prove_job(&self, job_id: &str) -> Result<ProveJobResult, ClientError> {
        let request = Request::CancelProveJob { job_id: job_id.to_string() };
        match self.call(&request).await? {
            Response::JobEvent { result } => Ok(result),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Subscribe to a job's status events. The stream yields every
    /// transition from the current state to the terminal one.
    pub async fn subscribe_to_prove_job(&self, job_id: &str) -> Result<JobStream, ClientError> {
        let mut stream = self.connect().await?;
        let request = Request::SubscribeToProveJob { job_id: job_id.to_string() };
        write_message(&mut stream, &encode(&request)?).await?;
        Ok(JobStream { stream, timeout: self.timeout })
    }

    /// Ask the daemon to shut down.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.call(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(ClientError::unexpected(&other)),
        }
    }

    /// Upload a witness for `job_id` over the witness socket: 16 bytes
    /// of binary job id, the payload, then a write-side close. Returns
    /// once the daemon closed the connection.
    ///
    /// The protocol carries no acknowledgment: a daemon that rejects
    /// the upload just closes, so only connect failures and a bad id
    /// are reported as errors. Whether the witness landed shows up on
    /// the job's event stream.
    pub async fn send_witness(
        witness_addr: &str,
        job_id: &str,
        witness: &[u8],
    ) -> Result<(), ClientError> {
        let id = JobId::parse(job_id)?;
        let mut stream = TcpStream::connect(witness_addr).await?;

        let written: std::io::Result<()> = async {
            stream.write_all(id.as_bytes()).await?;
            stream.write_all(witness).await?;
            stream.shutdown().await
        }
        .await;

        // A write error means the daemon already closed on us; either
        // way, wait out the close so the upload is settled on return.
        if written.is_ok() {
            let mut buf = [0u8; 1];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
        Ok(())
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        Ok(TcpStream::connect(&self.rpc_addr).await?)
    }

    async fn call(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = self.connect().await?;
        write_message(&mut stream, &encode(request)?).await?;
        let payload = tokio::time::timeout(self.timeout, read_message(&mut stream))
            .await
            .map_err(|_| ClientError::Timeout)??;
        match decode(&payload)? {
            Response::Error { kind, message } => Err(ClientError::Server { kind, message }),
            response => Ok(response),
        }
    }
}

/// Streaming side of `SubscribeToProveJob`.
pub struct JobStream {
    stream: TcpStream,
    timeout: Duration,
}

impl JobStream {
    /// Next status event; `None` once the daemon closed the stream
    /// after the terminal event.
    pub async fn next(&mut self) -> Result<Option<ProveJobResult>, ClientError> {
        match read_message(&mut self.stream).await {
            Ok(payload) => match decode(&payload)? {
                Response::JobEvent { result } => Ok(Some(result)),
                Response::Error { kind, message } => Err(ClientError::Server { kind, message }),
                other => Err(ClientError::unexpected(&other)),
            },
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Drain the stream and return every observed event.
    pub async fn collect(mut self) -> Result<Vec<ProveJobResult>, ClientError> {
        let mut events = Vec::new();
        loop {
            let next = tokio::time::timeout(self.timeout, self.next())
                .await
                .map_err(|_| ClientError::Timeout)??;
            match next {
                Some(event) => events.push(event),
                None => return Ok(events),
            }
        }
    }
}

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidJobId(#[from] JobIdError),

    #[error("daemon error ({kind}): {message}")]
    Server { kind: ErrorKind, message: String },

    #[error("timed out waiting for the daemon")]
    Timeout,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    fn unexpected(response: &Response) -> Self {
        ClientError::UnexpectedResponse(format!("{response:?}"))
    }

    /// The daemon-reported error kind, if this is a server error.
    pub fn server_kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
