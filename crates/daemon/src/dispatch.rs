// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker dispatcher: a fixed pool of tasks draining the ready queue.
//!
//! Workers pop job ids in FIFO order, claim the job (which publishes
//! RUNNING), invoke the prover, and record the outcome. Cancellation is
//! only observed between jobs: an in-flight proof always finishes and
//! publishes its terminal event.

use std::sync::Arc;

use proofd_core::Clock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapters::Prover;
use crate::registry::{JobRegistry, ReadyQueue};

/// Handle over the spawned worker tasks.
pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn<C: Clock + 'static>(
        registry: Arc<JobRegistry<C>>,
        prover: Arc<dyn Prover>,
        ready: ReadyQueue,
        workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        let ready = Arc::new(tokio::sync::Mutex::new(ready));
        let handles = (0..workers.max(1))
            .map(|worker| {
                let registry = Arc::clone(&registry);
                let prover = Arc::clone(&prover);
                let ready = Arc::clone(&ready);
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(worker, registry, prover, ready, cancel))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to finish its in-flight job and stop.
    pub(crate) async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop<C: Clock>(
    worker: usize,
    registry: Arc<JobRegistry<C>>,
    prover: Arc<dyn Prover>,
    ready: Arc<tokio::sync::Mutex<ReadyQueue>>,
    cancel: CancellationToken,
) {
    loop {
        let id = tokio::select! {
            _ = cancel.cancelled() => break,
            id = next_ready(&ready) => match id {
                Some(id) => id,
                None => break,
            },
        };
        // Cancelled between queueing and pickup: nothing to do
        let Some(run) = registry.begin_run(id) else { continue };
        debug!(worker, job = %id, "job picked up");
        let result = prover.prove(&run.circuit, &run.witness).await.map_err(|e| e.to_string());
        registry.complete(id, result);
    }
    debug!(worker, "worker stopped");
}

async fn next_ready(ready: &tokio::sync::Mutex<ReadyQueue>) -> Option<proofd_core::JobId> {
    ready.lock().await.recv().await
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
