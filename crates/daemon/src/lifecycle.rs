// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, serving, shutdown.
//!
//! Startup order matters: the catalog loads first (every failure there
//! is fatal), then both listeners bind, then the registry, sweeper, and
//! worker pool come up. Shutdown cancels the root token, cancels every
//! job that never started running, drains in-flight workers under a
//! timeout, and closes any remaining subscriber streams.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use proofd_core::{Clock, SystemClock};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::Prover;
use crate::catalog::{CatalogError, CircuitCatalog};
use crate::config::{Config, ConfigError};
use crate::dispatch::WorkerPool;
use crate::env;
use crate::listener::{ListenCtx, Listener};
use crate::registry::{JobRegistry, RegistryConfig};
use crate::witness::WitnessListener;

/// A running daemon. Dropping the handle leaves the spawned tasks
/// running; call [`shutdown`](Self::shutdown) for an orderly stop.
pub struct ServerHandle<C: Clock = SystemClock> {
    /// Bound RPC address (useful with an ephemeral port in tests).
    pub rpc_addr: SocketAddr,
    /// Bound witness socket address.
    pub witness_addr: SocketAddr,
    registry: Arc<JobRegistry<C>>,
    shutdown: Arc<Notify>,
    cancel: CancellationToken,
    pool: WorkerPool,
    listener_tasks: Vec<JoinHandle<()>>,
    drain: Duration,
}

/// Start the daemon: load the catalog, bind both listeners, spawn the
/// sweeper and the worker pool.
pub async fn startup<C: Clock + 'static>(
    config: &Config,
    prover: Arc<dyn Prover>,
    clock: C,
) -> Result<ServerHandle<C>, LifecycleError> {
    let catalog = Arc::new(CircuitCatalog::load(&config.circuits_root)?);
    info!(circuits = catalog.len(), root = ?config.circuits_root, "circuit catalog loaded");

    let rpc = bind(&config.rpc_address).await?;
    let witness = bind(&config.witness_address).await?;
    let rpc_addr = rpc.local_addr()?;
    let witness_addr = witness.local_addr()?;

    let registry_config = RegistryConfig {
        queue_depth: config.subscriber_queue_depth,
        ttl: config.job_ttl(),
        max_inflight: config.max_inflight_jobs,
    };
    let (registry, ready) = JobRegistry::new(Arc::clone(&catalog), clock, registry_config);

    let cancel = CancellationToken::new();
    let shutdown = Arc::new(Notify::new());
    let ctx = Arc::new(ListenCtx {
        registry: Arc::clone(&registry),
        catalog,
        prover: Arc::clone(&prover),
        shutdown: Arc::clone(&shutdown),
        timeout: env::rpc_timeout(),
    });

    let workers = config.worker_count();
    let listener_tasks = vec![
        tokio::spawn(Listener::new(rpc, ctx, cancel.child_token()).run()),
        tokio::spawn(
            WitnessListener::new(
                witness,
                Arc::clone(&registry),
                config.witness_read_deadline(),
                cancel.child_token(),
            )
            .run(),
        ),
        tokio::spawn(sweeper(Arc::clone(&registry), config.job_ttl(), cancel.child_token())),
    ];
    let pool = WorkerPool::spawn(Arc::clone(&registry), prover, ready, workers, cancel.child_token());

    info!(rpc = %rpc_addr, witness = %witness_addr, workers, "proofd listening");
    Ok(ServerHandle {
        rpc_addr,
        witness_addr,
        registry,
        shutdown,
        cancel,
        pool,
        listener_tasks,
        drain: env::drain_timeout(),
    })
}

impl<C: Clock + 'static> ServerHandle<C> {
    /// The job registry, shared with the running components.
    pub fn registry(&self) -> &Arc<JobRegistry<C>> {
        &self.registry
    }

    /// Resolves once a client asked the daemon to stop.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    /// Orderly stop: no new connections or jobs, pending jobs cancelled
    /// with a published terminal event, in-flight proofs drained.
    pub async fn shutdown(self) {
        info!("shutting down");
        self.cancel.cancel();

        let cancelled = self.registry.cancel_pending();
        if cancelled > 0 {
            info!(jobs = cancelled, "cancelled pending jobs");
        }
        if tokio::time::timeout(self.drain, self.pool.join()).await.is_err() {
            warn!("worker pool drain timed out");
        }
        self.registry.close_subscribers();
        for task in self.listener_tasks {
            let _ = task.await;
        }
        info!("daemon stopped");
    }
}

/// Periodically evict expired terminal jobs. The cadence is bounded so
/// a terminal job never outlives twice its TTL.
async fn sweeper<C: Clock>(registry: Arc<JobRegistry<C>>, ttl: Duration, cancel: CancellationToken) {
    let interval = ttl.min(Duration::from_secs(60)).max(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                registry.sweep();
            }
        }
    }
}

async fn bind(address: &str) -> Result<TcpListener, LifecycleError> {
    TcpListener::bind(address)
        .await
        .map_err(|e| LifecycleError::BindFailed(address.to_string(), e))
}

/// Lifecycle errors. Any of these at startup exits the process non-zero.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("prover_cmd is not configured")]
    MissingProverCmd,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
