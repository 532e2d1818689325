// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::FakeProver;
use proofd_core::{CircuitId, Curve, JobStatus};
use tempfile::TempDir;

fn write_circuit(root: &std::path::Path) {
    let dir = root.join("bn256/cubic");
    std::fs::create_dir_all(&dir).unwrap();
    for file in ["r1cs.bin", "pk.bin", "vk.bin"] {
        std::fs::write(dir.join(file), file).unwrap();
    }
}

fn test_config(circuits_root: &std::path::Path) -> Config {
    Config {
        rpc_address: "127.0.0.1:0".to_string(),
        witness_address: "127.0.0.1:0".to_string(),
        circuits_root: circuits_root.to_path_buf(),
        workers: 2,
        ..Config::default()
    }
}

async fn start(config: &Config) -> ServerHandle {
    startup(config, Arc::new(FakeProver::new()), SystemClock).await.unwrap()
}

#[tokio::test]
async fn startup_fails_on_a_bad_circuits_root() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root.path().join("missing"));

    let result = startup(&config, Arc::new(FakeProver::new()), SystemClock).await;
    assert!(matches!(result, Err(LifecycleError::Catalog(_))));
}

#[tokio::test]
async fn startup_fails_on_an_unbindable_address() {
    let root = TempDir::new().unwrap();
    write_circuit(root.path());

    // Occupy a port, then ask the daemon to bind it
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        rpc_address: taken.local_addr().unwrap().to_string(),
        ..test_config(root.path())
    };

    let result = startup(&config, Arc::new(FakeProver::new()), SystemClock).await;
    assert!(matches!(result, Err(LifecycleError::BindFailed(_, _))));
}

#[tokio::test]
async fn startup_binds_ephemeral_ports_and_stops_cleanly() {
    let root = TempDir::new().unwrap();
    write_circuit(root.path());
    let server = start(&test_config(root.path())).await;

    assert_ne!(server.rpc_addr.port(), 0);
    assert_ne!(server.witness_addr.port(), 0);

    tokio::time::timeout(Duration::from_secs(5), server.shutdown()).await.unwrap();
}

#[tokio::test]
async fn shutdown_cancels_waiting_jobs_and_closes_their_streams() {
    let root = TempDir::new().unwrap();
    write_circuit(root.path());
    let server = start(&test_config(root.path())).await;

    let id = server
        .registry()
        .create(CircuitId::new(Curve::Bn256, "cubic"), None)
        .unwrap();
    let mut sub = server.registry().subscribe(id).unwrap();

    tokio::time::timeout(Duration::from_secs(5), server.shutdown()).await.unwrap();

    // The stream delivers the snapshot and the CANCELLED terminal, then
    // closes within a bounded time.
    let drain = async {
        let mut last = None;
        while let Some(update) = sub.next().await.unwrap() {
            last = Some(update.status);
        }
        last
    };
    let last = tokio::time::timeout(Duration::from_secs(1), drain).await.unwrap();
    assert_eq!(last, Some(JobStatus::Cancelled));
}
