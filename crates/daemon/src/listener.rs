// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC listener: accepts control connections and dispatches requests.
//!
//! One request per connection. `SubscribeToProveJob` upgrades the
//! connection into a one-way event stream that the daemon closes after
//! the terminal event; every other request gets exactly one response.
//! Handlers race against client disconnect so an abandoned call stops
//! consuming work.

use std::sync::Arc;
use std::time::Duration;

use proofd_core::{Circuit, CircuitId, Clock, JobId};
use proofd_wire::{
    read_request, write_response, ErrorKind, ProtocolError, ProveJobResult, Request, Response,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::Prover;
use crate::catalog::CircuitCatalog;
use crate::hub::SubscriptionError;
use crate::registry::{JobRegistry, RegistryError};

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx<C: Clock> {
    pub registry: Arc<JobRegistry<C>>,
    pub catalog: Arc<CircuitCatalog>,
    pub prover: Arc<dyn Prover>,
    pub shutdown: Arc<Notify>,
    pub timeout: Duration,
}

/// Listener task for accepting RPC connections.
pub(crate) struct Listener<C: Clock> {
    tcp: TcpListener,
    ctx: Arc<ListenCtx<C>>,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> Listener<C> {
    pub(crate) fn new(tcp: TcpListener, ctx: Arc<ListenCtx<C>>, cancel: CancellationToken) -> Self {
        Self { tcp, ctx, cancel }
    }

    /// Run the accept loop until shutdown, spawning a task per connection.
    pub(crate) async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.tcp.accept() => match result {
                    Ok((stream, addr)) => {
                        debug!(%addr, "rpc connection");
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("rpc accept error: {}", e),
                },
            }
        }
        debug!("rpc listener stopped");
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timeout"),
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// Generic over reader/writer so tests can drive it over in-memory
/// pipes.
async fn handle_connection<R, W, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    C: Clock,
{
    let request = read_request(&mut reader, ctx.timeout).await?;
    debug!(method = request.method(), "received request");

    // Subscribe upgrades the connection into an event stream; handle it
    // before the plain request/response dispatch.
    if let Request::SubscribeToProveJob { ref job_id } = request {
        return handle_subscribe(job_id, reader, writer, ctx).await;
    }

    // Race the handler against client disconnect so abandoned calls are
    // dropped instead of running to completion.
    let response = tokio::select! {
        response = handle_request(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("client disconnected, dropping handler");
            return Ok(());
        }
    };

    write_response(&mut writer, &response, ctx.timeout).await
}

/// Detect client disconnect by reading from the socket after the request.
///
/// The client sends one request then waits; a read completing here means
/// EOF (or protocol misuse), either way the handler's work is moot.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Prove { circuit_id, witness } => handle_prove(&circuit_id, &witness, ctx).await,

        Request::Verify { circuit_id, public_witness, proof } => {
            handle_verify(&circuit_id, &public_witness, &proof, ctx).await
        }

        Request::CreateProveJob { circuit_id } => handle_create(&circuit_id, ctx),

        Request::CancelProveJob { job_id } => handle_cancel(&job_id, ctx),

        Request::Shutdown => {
            info!("shutdown requested over rpc");
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        // Intercepted in handle_connection before reaching handle_request
        Request::SubscribeToProveJob { .. } => unreachable!(),
    }
}

/// Synchronous prove. Bypasses the registry: the proof travels back on
/// this connection and a failed attempt leaves no job behind.
async fn handle_prove<C: Clock>(circuit_id: &str, witness: &[u8], ctx: &ListenCtx<C>) -> Response {
    let circuit = match lookup_circuit(circuit_id, ctx) {
        Ok(circuit) => circuit,
        Err(response) => return response,
    };
    match ctx.prover.prove(&circuit, witness).await {
        Ok(proof) => Response::ProveResult { proof },
        Err(e) => Response::Error { kind: ErrorKind::Internal, message: e.to_string() },
    }
}

async fn handle_verify<C: Clock>(
    circuit_id: &str,
    public_witness: &[u8],
    proof: &[u8],
    ctx: &ListenCtx<C>,
) -> Response {
    let circuit = match lookup_circuit(circuit_id, ctx) {
        Ok(circuit) => circuit,
        Err(response) => return response,
    };
    match ctx.prover.verify(&circuit, public_witness, proof).await {
        Ok(ok) => Response::VerifyResult { ok },
        Err(e) => Response::Error { kind: ErrorKind::Internal, message: e.to_string() },
    }
}

fn handle_create<C: Clock>(circuit_id: &str, ctx: &ListenCtx<C>) -> Response {
    let circuit_id = match CircuitId::parse(circuit_id) {
        Ok(id) => id,
        Err(e) => {
            return Response::Error { kind: ErrorKind::InvalidArgument, message: e.to_string() }
        }
    };
    match ctx.registry.create(circuit_id, None) {
        Ok(id) => Response::JobCreated { job_id: id.to_string() },
        Err(e) => registry_error(e),
    }
}

fn handle_cancel<C: Clock>(job_id: &str, ctx: &ListenCtx<C>) -> Response {
    let id = match JobId::parse(job_id) {
        Ok(id) => id,
        Err(e) => {
            return Response::Error { kind: ErrorKind::InvalidArgument, message: e.to_string() }
        }
    };
    match ctx.registry.cancel(id) {
        Ok(_) | Err(RegistryError::Terminal { .. }) => {
            // Idempotent: report the current (terminal) state
            match ctx.registry.get(id) {
                Ok(job) => Response::JobEvent { result: ProveJobResult::from(&job.update()) },
                Err(e) => registry_error(e),
            }
        }
        Err(e) => registry_error(e),
    }
}

/// Stream job events until terminal, lag, or client disconnect.
async fn handle_subscribe<R, W, C>(
    job_id: &str,
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    C: Clock,
{
    let id = match JobId::parse(job_id) {
        Ok(id) => id,
        Err(e) => {
            let response =
                Response::Error { kind: ErrorKind::InvalidArgument, message: e.to_string() };
            return write_response(&mut writer, &response, ctx.timeout).await;
        }
    };
    let mut sub = match ctx.registry.subscribe(id) {
        Ok(sub) => sub,
        Err(e) => return write_response(&mut writer, &registry_error(e), ctx.timeout).await,
    };
    debug!(job = %id, "subscriber attached");

    loop {
        tokio::select! {
            next = sub.next() => match next {
                Ok(Some(update)) => {
                    let response = Response::JobEvent { result: ProveJobResult::from(&update) };
                    write_response(&mut writer, &response, ctx.timeout).await?;
                }
                Ok(None) => break,
                Err(e @ SubscriptionError::Lagged) => {
                    warn!(job = %id, "subscriber lagged, closing stream");
                    let response =
                        Response::Error { kind: ErrorKind::Lagged, message: e.to_string() };
                    let _ = write_response(&mut writer, &response, ctx.timeout).await;
                    break;
                }
            },
            // Dropping the subscription detaches this sink only; the job
            // itself is cancelled solely by CancelProveJob.
            _ = detect_client_disconnect(&mut reader) => {
                debug!(job = %id, "subscriber disconnected");
                break;
            }
        }
    }
    Ok(())
}

fn lookup_circuit<C: Clock>(
    circuit_id: &str,
    ctx: &ListenCtx<C>,
) -> Result<Arc<Circuit>, Response> {
    let id = CircuitId::parse(circuit_id)
        .map_err(|e| Response::Error { kind: ErrorKind::InvalidArgument, message: e.to_string() })?;
    ctx.catalog.lookup(&id).ok_or_else(|| Response::Error {
        kind: ErrorKind::NotFound,
        message: format!("unknown circuit {id}"),
    })
}

fn registry_error(e: RegistryError) -> Response {
    let kind = match e {
        RegistryError::UnknownCircuit(_) | RegistryError::NotFound(_) => ErrorKind::NotFound,
        RegistryError::WrongState { .. } | RegistryError::Terminal { .. } => ErrorKind::WrongState,
        RegistryError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
    };
    Response::Error { kind, message: e.to_string() }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
