// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job registry: the concurrent id→job map and its state machine.
//!
//! The registry is the rendezvous point of the two ingest paths: RPC
//! handlers allocate jobs and the witness listener attaches payloads,
//! correlated only by job id. Every state transition happens under the
//! job's own lock and publishes to the job's hub before the lock is
//! released, so subscribers observe one total order per job.
//!
//! Lock order: jobs map → job → subscriber list. No lock is held across
//! a prover invocation or a network send.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use proofd_core::{Circuit, CircuitId, Clock, Job, JobId, JobStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::catalog::CircuitCatalog;
use crate::hub::{Hub, Subscription};

/// Registry tuning knobs, extracted from [`crate::Config`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Bounded event queue depth per subscriber.
    pub queue_depth: usize,
    /// Retention of terminal jobs before eviction.
    pub ttl: Duration,
    /// Cap on non-terminal jobs; 0 disables the cap.
    pub max_inflight: usize,
}

/// One tracked job plus its broadcast hub and resolved circuit.
struct JobEntry {
    job: Mutex<Job>,
    hub: Hub,
    circuit: Arc<Circuit>,
}

/// Everything a worker needs to run one job.
pub(crate) struct RunnableJob {
    pub id: JobId,
    pub circuit: Arc<Circuit>,
    pub witness: Vec<u8>,
}

/// Receiver half of the FIFO ready queue, consumed by the dispatcher.
pub struct ReadyQueue {
    rx: mpsc::UnboundedReceiver<JobId>,
}

impl ReadyQueue {
    pub(crate) async fn recv(&mut self) -> Option<JobId> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<JobId> {
        self.rx.try_recv().ok()
    }
}

/// Concurrent job store.
pub struct JobRegistry<C: Clock> {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    catalog: Arc<CircuitCatalog>,
    clock: C,
    config: RegistryConfig,
    ready_tx: mpsc::UnboundedSender<JobId>,
    inflight: AtomicUsize,
}

impl<C: Clock> JobRegistry<C> {
    /// Build a registry and the ready queue its dispatcher drains.
    pub fn new(
        catalog: Arc<CircuitCatalog>,
        clock: C,
        config: RegistryConfig,
    ) -> (Arc<Self>, ReadyQueue) {
        let (ready_tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            catalog,
            clock,
            config,
            ready_tx,
            inflight: AtomicUsize::new(0),
        });
        (registry, ReadyQueue { rx })
    }

    /// Allocate a job. An inline witness starts it directly in `Queued`;
    /// otherwise it waits for the witness socket.
    pub fn create(
        &self,
        circuit_id: CircuitId,
        witness: Option<Vec<u8>>,
    ) -> Result<JobId, RegistryError> {
        let Some(circuit) = self.catalog.lookup(&circuit_id) else {
            return Err(RegistryError::UnknownCircuit(circuit_id));
        };
        let cap = self.config.max_inflight;
        if cap > 0 && self.inflight.load(Ordering::Relaxed) >= cap {
            return Err(RegistryError::ResourceExhausted(cap));
        }

        let job = Job::new(circuit_id, witness, &self.clock);
        let id = job.id;
        let status = job.status;
        let entry = Arc::new(JobEntry { job: Mutex::new(job), hub: Hub::new(), circuit });
        self.jobs.write().insert(id, entry);
        self.inflight.fetch_add(1, Ordering::Relaxed);

        info!(job = %id, status = %status, "job created");
        if status == JobStatus::Queued {
            let _ = self.ready_tx.send(id);
        }
        Ok(id)
    }

    /// Attach the witness payload, exactly once, and queue the job.
    pub fn attach_witness(&self, id: JobId, witness: Vec<u8>) -> Result<(), RegistryError> {
        let entry = self.entry(id)?;
        let mut job = entry.job.lock();
        if job.status != JobStatus::WaitingWitness {
            return Err(RegistryError::WrongState { id, status: job.status });
        }
        job.witness = Some(witness);
        self.advance(&mut job, JobStatus::Queued, &entry.hub);
        // Still under the job lock: the queue entry is ordered after the
        // QUEUED event, so no subscriber can see RUNNING first.
        let _ = self.ready_tx.send(id);
        Ok(())
    }

    /// Cancel a job that has not started running.
    ///
    /// Terminal jobs report [`RegistryError::Terminal`]; the RPC layer
    /// maps that to an idempotent success carrying the current status.
    pub fn cancel(&self, id: JobId) -> Result<JobStatus, RegistryError> {
        let entry = self.entry(id)?;
        let mut job = entry.job.lock();
        match job.status {
            JobStatus::WaitingWitness | JobStatus::Queued => {
                self.advance(&mut job, JobStatus::Cancelled, &entry.hub);
                Ok(JobStatus::Cancelled)
            }
            JobStatus::Running => {
                Err(RegistryError::WrongState { id, status: JobStatus::Running })
            }
            status => Err(RegistryError::Terminal { id, status }),
        }
    }

    /// Snapshot of one job.
    pub fn get(&self, id: JobId) -> Result<Job, RegistryError> {
        let entry = self.entry(id)?;
        let job = entry.job.lock();
        Ok(job.clone())
    }

    /// Subscribe to a job's status events.
    ///
    /// The snapshot is captured and the sink installed under the job
    /// lock, so the first event reflects the state at subscribe time and
    /// every later transition follows it in order.
    pub fn subscribe(&self, id: JobId) -> Result<Subscription, RegistryError> {
        let entry = self.entry(id)?;
        let job = entry.job.lock();
        Ok(entry.hub.subscribe(self.config.queue_depth, job.update()))
    }

    /// Claim a queued job for a worker. `None` when the job was
    /// cancelled (or evicted) between queueing and pickup.
    pub(crate) fn begin_run(&self, id: JobId) -> Option<RunnableJob> {
        let entry = self.jobs.read().get(&id).cloned()?;
        let mut job = entry.job.lock();
        if job.status != JobStatus::Queued {
            debug!(job = %id, status = %job.status, "skipping job no longer queued");
            return None;
        }
        let witness = job.witness.clone()?;
        self.advance(&mut job, JobStatus::Running, &entry.hub);
        Some(RunnableJob { id, circuit: Arc::clone(&entry.circuit), witness })
    }

    /// Record a prover outcome for a running job.
    pub(crate) fn complete(&self, id: JobId, result: Result<Vec<u8>, String>) {
        let Ok(entry) = self.entry(id) else {
            debug!(job = %id, "finished job no longer tracked");
            return;
        };
        let mut job = entry.job.lock();
        if job.status != JobStatus::Running {
            debug!(job = %id, status = %job.status, "dropping result for non-running job");
            return;
        }
        match result {
            Ok(proof) => {
                job.proof = Some(proof);
                self.advance(&mut job, JobStatus::Completed, &entry.hub);
            }
            Err(message) => {
                warn!(job = %id, error = %message, "prover failed");
                job.err = Some(message);
                self.advance(&mut job, JobStatus::Errored, &entry.hub);
            }
        }
    }

    /// Cancel every job that has not started running (shutdown drain).
    pub fn cancel_pending(&self) -> usize {
        let entries: Vec<_> = self.jobs.read().values().cloned().collect();
        let mut cancelled = 0;
        for entry in entries {
            let mut job = entry.job.lock();
            if matches!(job.status, JobStatus::WaitingWitness | JobStatus::Queued) {
                self.advance(&mut job, JobStatus::Cancelled, &entry.hub);
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Drop every subscriber sink (shutdown).
    pub fn close_subscribers(&self) {
        for entry in self.jobs.read().values() {
            entry.hub.close();
        }
    }

    /// Evict terminal jobs older than the TTL. Their hubs are closed, so
    /// a subscription that somehow outlived the terminal event ends too.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<JobId> = self
            .jobs
            .read()
            .iter()
            .filter_map(|(id, entry)| {
                let job = entry.job.lock();
                let done = job.is_terminal()
                    && now.duration_since(job.updated_at) >= self.config.ttl;
                done.then_some(*id)
            })
            .collect();
        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write();
        let mut evicted = 0;
        for id in expired {
            if let Some(entry) = jobs.remove(&id) {
                entry.hub.close();
                evicted += 1;
            }
        }
        info!(evicted, "evicted expired terminal jobs");
        evicted
    }

    /// Number of tracked jobs (terminal ones included until eviction).
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    fn entry(&self, id: JobId) -> Result<Arc<JobEntry>, RegistryError> {
        self.jobs.read().get(&id).cloned().ok_or(RegistryError::NotFound(id))
    }

    /// Transition + publish under the caller's job lock. Callers verify
    /// the edge beforehand; a refused transition here is a bug.
    fn advance(&self, job: &mut Job, next: JobStatus, hub: &Hub) {
        if let Err(e) = job.transition(next, &self.clock) {
            error!(job = %job.id, "{e}");
            return;
        }
        if next.is_terminal() {
            self.inflight.fetch_sub(1, Ordering::Relaxed);
        }
        debug!(job = %job.id, status = %next, "job transition");
        hub.publish(&job.update());
    }
}

/// Registry operation failures.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown circuit {0}")]
    UnknownCircuit(CircuitId),

    #[error("unknown job {0}")]
    NotFound(JobId),

    #[error("job {id} is {status}")]
    WrongState { id: JobId, status: JobStatus },

    #[error("job {id} already reached terminal state {status}")]
    Terminal { id: JobId, status: JobStatus },

    #[error("inflight job limit of {0} reached")]
    ResourceExhausted(usize),
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
