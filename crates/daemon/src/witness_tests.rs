// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::catalog::CircuitCatalog;
use crate::registry::RegistryConfig;
use proofd_core::{CircuitId, Curve, FakeClock};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

struct Fixture {
    _root: TempDir,
    registry: Arc<JobRegistry<FakeClock>>,
    addr: std::net::SocketAddr,
    cancel: CancellationToken,
}

async fn fixture(deadline: Duration) -> Fixture {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("bn256/cubic");
    std::fs::create_dir_all(&dir).unwrap();
    for file in ["r1cs.bin", "pk.bin", "vk.bin"] {
        std::fs::write(dir.join(file), file).unwrap();
    }
    let catalog = Arc::new(CircuitCatalog::load(root.path()).unwrap());
    let config =
        RegistryConfig { queue_depth: 8, ttl: Duration::from_secs(3600), max_inflight: 0 };
    let (registry, _ready) = JobRegistry::new(catalog, FakeClock::new(), config);

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let listener =
        WitnessListener::new(tcp, Arc::clone(&registry), deadline, cancel.child_token());
    tokio::spawn(listener.run());

    Fixture { _root: root, registry, addr, cancel }
}

fn cubic() -> CircuitId {
    CircuitId::new(Curve::Bn256, "cubic")
}

/// Write an upload and wait for the daemon to close the connection, so
/// assertions run after the attach (or rejection) happened. Rejected
/// uploads may be closed mid-write; that is part of the protocol.
async fn upload(addr: std::net::SocketAddr, id_bytes: &[u8], payload: &[u8]) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let written: std::io::Result<()> = async {
        stream.write_all(id_bytes).await?;
        stream.write_all(payload).await?;
        stream.shutdown().await
    }
    .await;

    if written.is_ok() {
        let mut buf = [0u8; 1];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}

#[tokio::test]
async fn upload_attaches_the_witness_and_queues_the_job() {
    let f = fixture(Duration::from_secs(5)).await;
    let id = f.registry.create(cubic(), None).unwrap();

    upload(f.addr, id.as_bytes(), b"witness-bytes").await;

    let job = f.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.witness.as_deref(), Some(&b"witness-bytes"[..]));
}

#[tokio::test]
async fn empty_payload_attaches_an_empty_witness() {
    let f = fixture(Duration::from_secs(5)).await;
    let id = f.registry.create(cubic(), None).unwrap();

    upload(f.addr, id.as_bytes(), b"").await;

    let job = f.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.witness.as_deref(), Some(&b""[..]));
}

#[tokio::test]
async fn unknown_job_id_closes_without_state_changes() {
    let f = fixture(Duration::from_secs(5)).await;
    let tracked = f.registry.create(cubic(), None).unwrap();

    upload(f.addr, JobId::new().as_bytes(), b"stray payload").await;

    assert_eq!(f.registry.len(), 1);
    assert_eq!(f.registry.get(tracked).unwrap().status, JobStatus::WaitingWitness);
}

#[tokio::test]
async fn second_upload_is_rejected() {
    let f = fixture(Duration::from_secs(5)).await;
    let id = f.registry.create(cubic(), None).unwrap();

    upload(f.addr, id.as_bytes(), b"first").await;
    upload(f.addr, id.as_bytes(), b"second").await;

    assert_eq!(f.registry.get(id).unwrap().witness.as_deref(), Some(&b"first"[..]));
}

#[tokio::test]
async fn upload_for_cancelled_job_is_rejected() {
    let f = fixture(Duration::from_secs(5)).await;
    let id = f.registry.create(cubic(), None).unwrap();
    f.registry.cancel(id).unwrap();

    upload(f.addr, id.as_bytes(), b"late").await;

    let job = f.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.witness.is_none());
}

#[tokio::test]
async fn truncated_id_prefix_is_dropped() {
    let f = fixture(Duration::from_secs(5)).await;
    let id = f.registry.create(cubic(), None).unwrap();

    upload(f.addr, &id.as_bytes()[..8], b"").await;

    assert_eq!(f.registry.get(id).unwrap().status, JobStatus::WaitingWitness);
}

#[tokio::test]
async fn stalled_upload_hits_the_deadline_and_the_job_can_retry() {
    let f = fixture(Duration::from_millis(100)).await;
    let id = f.registry.create(cubic(), None).unwrap();

    // Send the id but never the payload or EOF
    let mut stream = TcpStream::connect(f.addr).await.unwrap();
    stream.write_all(id.as_bytes()).await.unwrap();

    // The daemon drops the connection at the deadline
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await.unwrap();
    assert_eq!(n.unwrap(), 0);
    assert_eq!(f.registry.get(id).unwrap().status, JobStatus::WaitingWitness);

    // A retry still lands
    upload(f.addr, id.as_bytes(), b"retry").await;
    assert_eq!(f.registry.get(id).unwrap().status, JobStatus::Queued);

    f.cancel.cancel();
}
