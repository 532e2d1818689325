// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::FakeProver;
use crate::catalog::CircuitCatalog;
use crate::registry::RegistryConfig;
use proofd_core::{CircuitId, Curve, FakeClock, JobStatus};
use std::time::Duration;
use tempfile::TempDir;

fn cubic() -> CircuitId {
    CircuitId::new(Curve::Bn256, "cubic")
}

struct Fixture {
    _root: TempDir,
    registry: Arc<JobRegistry<FakeClock>>,
    ready: Option<ReadyQueue>,
}

fn fixture() -> Fixture {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("bn256/cubic");
    std::fs::create_dir_all(&dir).unwrap();
    for file in ["r1cs.bin", "pk.bin", "vk.bin"] {
        std::fs::write(dir.join(file), file).unwrap();
    }
    let catalog = Arc::new(CircuitCatalog::load(root.path()).unwrap());
    let config =
        RegistryConfig { queue_depth: 8, ttl: Duration::from_secs(3600), max_inflight: 0 };
    let (registry, ready) = JobRegistry::new(catalog, FakeClock::new(), config);
    Fixture { _root: root, registry, ready: Some(ready) }
}

impl Fixture {
    fn spawn_pool(&mut self, prover: FakeProver, workers: usize) -> (WorkerPool, CancellationToken) {
        let cancel = CancellationToken::new();
        let ready = self.ready.take().unwrap();
        let pool = WorkerPool::spawn(
            Arc::clone(&self.registry),
            Arc::new(prover),
            ready,
            workers,
            cancel.clone(),
        );
        (pool, cancel)
    }
}

#[tokio::test]
async fn pool_runs_queued_jobs_to_completion() {
    let mut f = fixture();
    let (_pool, _cancel) = f.spawn_pool(FakeProver::new(), 2);

    let id = f.registry.create(cubic(), Some(FakeProver::encode_witness(3, 35))).unwrap();
    let mut sub = f.registry.subscribe(id).unwrap();

    let mut statuses = Vec::new();
    while let Some(update) = sub.next().await.unwrap() {
        statuses.push(update.status);
    }
    assert_eq!(statuses.last(), Some(&JobStatus::Completed));
    assert!(f.registry.get(id).unwrap().proof.is_some());
}

#[tokio::test]
async fn prover_rejection_marks_the_job_errored() {
    let mut f = fixture();
    let (_pool, _cancel) = f.spawn_pool(FakeProver::new(), 1);

    let id = f.registry.create(cubic(), Some(FakeProver::encode_witness(4, 42))).unwrap();
    let mut sub = f.registry.subscribe(id).unwrap();

    let mut last = None;
    while let Some(update) = sub.next().await.unwrap() {
        last = Some(update);
    }
    let last = last.unwrap();
    assert_eq!(last.status, JobStatus::Errored);
    assert_eq!(last.err.as_deref(), Some("witness does not satisfy the circuit"));
    assert!(last.proof.is_none());
}

#[tokio::test]
async fn many_jobs_drain_across_workers() {
    let mut f = fixture();
    let (_pool, _cancel) = f.spawn_pool(FakeProver::new(), 4);

    let mut subs = Vec::new();
    for _ in 0..16 {
        let id = f.registry.create(cubic(), Some(FakeProver::encode_witness(2, 15))).unwrap();
        subs.push(f.registry.subscribe(id).unwrap());
    }

    for mut sub in subs {
        let mut last = None;
        while let Some(update) = sub.next().await.unwrap() {
            last = Some(update.status);
        }
        assert_eq!(last, Some(JobStatus::Completed));
    }
}

#[tokio::test]
async fn drain_finishes_inflight_work_and_skips_cancelled_jobs() {
    let mut f = fixture();
    let (pool, cancel) = f.spawn_pool(FakeProver::with_delay(Duration::from_millis(200)), 1);

    let running = f.registry.create(cubic(), Some(FakeProver::encode_witness(3, 35))).unwrap();
    let mut sub = f.registry.subscribe(running).unwrap();

    // Wait until the single worker has picked the first job up
    loop {
        let update = sub.next().await.unwrap().unwrap();
        if update.status == JobStatus::Running {
            break;
        }
    }

    let queued = f.registry.create(cubic(), Some(FakeProver::encode_witness(3, 35))).unwrap();

    // Shutdown: stop pulling new work, cancel what never started
    cancel.cancel();
    f.registry.cancel_pending();
    tokio::time::timeout(Duration::from_secs(5), pool.join()).await.unwrap();

    assert_eq!(f.registry.get(running).unwrap().status, JobStatus::Completed);
    assert_eq!(f.registry.get(queued).unwrap().status, JobStatus::Cancelled);
}
