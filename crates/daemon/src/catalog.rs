// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit catalog: loads precomputed artifacts from disk exactly once.
//!
//! The catalog scans `<root>/<curve>/<name>/` directories at startup and
//! eagerly reads the three artifacts of each circuit. Any problem with
//! the tree is a startup failure; after `load` returns the catalog is
//! immutable and lookups are plain reads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proofd_core::{Circuit, CircuitId, Curve};
use thiserror::Error;
use tracing::info;

/// Artifact file names expected inside every circuit directory.
const CONSTRAINT_SYSTEM_FILE: &str = "r1cs.bin";
const PROVING_KEY_FILE: &str = "pk.bin";
const VERIFYING_KEY_FILE: &str = "vk.bin";

/// Immutable in-memory circuit store.
#[derive(Debug)]
pub struct CircuitCatalog {
    entries: HashMap<CircuitId, Arc<Circuit>>,
}

impl CircuitCatalog {
    /// Scan `root` and load every circuit. Fails on the first offending
    /// path: unreadable directory, unrecognized curve tag, or a missing
    /// or unreadable artifact.
    pub fn load(root: &Path) -> Result<Self, CatalogError> {
        let mut entries = HashMap::new();

        for curve_dir in list_dirs(root)? {
            let tag = dir_name(&curve_dir);
            let curve =
                Curve::parse(&tag).ok_or_else(|| CatalogError::UnknownCurve(curve_dir.clone()))?;

            for circuit_dir in list_dirs(&curve_dir)? {
                let id = CircuitId::new(curve, dir_name(&circuit_dir));
                let circuit = Circuit {
                    id: id.clone(),
                    constraint_system: read_artifact(&circuit_dir, CONSTRAINT_SYSTEM_FILE)?,
                    proving_key: read_artifact(&circuit_dir, PROVING_KEY_FILE)?,
                    verifying_key: read_artifact(&circuit_dir, VERIFYING_KEY_FILE)?,
                };
                info!(circuit = %id, "loaded circuit");
                if entries.insert(id.clone(), Arc::new(circuit)).is_some() {
                    return Err(CatalogError::Duplicate(id));
                }
            }
        }

        Ok(Self { entries })
    }

    /// Look up a circuit by id.
    pub fn lookup(&self, id: &CircuitId) -> Option<Arc<Circuit>> {
        self.entries.get(id).cloned()
    }

    /// All circuit ids, sorted.
    pub fn list(&self) -> Vec<CircuitId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort_by_key(CircuitId::to_string);
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Subdirectories of `dir`, sorted by name. Plain files are ignored.
fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let read = |e: std::io::Error| CatalogError::Unreadable(dir.to_path_buf(), e);
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read)? {
        let entry = entry.map_err(read)?;
        if entry.file_type().map_err(read)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

fn read_artifact(dir: &Path, file: &str) -> Result<Vec<u8>, CatalogError> {
    let path = dir.join(file);
    std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CatalogError::MissingArtifact(path.clone()),
        _ => CatalogError::Unreadable(path.clone(), e),
    })
}

/// Catalog initialization failures; all carry the offending path.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unrecognized curve directory {0:?}")]
    UnknownCurve(PathBuf),

    #[error("missing circuit artifact {0:?}")]
    MissingArtifact(PathBuf),

    #[error("unreadable path {0:?}: {1}")]
    Unreadable(PathBuf, std::io::Error),

    #[error("duplicate circuit id {0}")]
    Duplicate(CircuitId),
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
