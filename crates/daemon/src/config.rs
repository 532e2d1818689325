// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Options load from a TOML file (explicit path, else `PROOFD_CONFIG`),
//! with per-option `PROOFD_*` environment overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env;

/// Daemon configuration with documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// RPC listener address.
    pub rpc_address: String,
    /// Witness socket listener address.
    pub witness_address: String,
    /// Root of the circuit artifact tree.
    pub circuits_root: PathBuf,
    /// Worker pool size; 0 means the number of available hardware threads.
    pub workers: usize,
    /// Cap on non-terminal jobs; 0 disables the cap.
    pub max_inflight_jobs: usize,
    /// Retention of terminal jobs before eviction.
    pub job_ttl_seconds: u64,
    /// Bound on the total read time of one witness upload.
    pub witness_read_deadline_seconds: u64,
    /// Bounded event queue depth per subscriber.
    pub subscriber_queue_depth: usize,
    /// External prover executable. Required to run the daemon binary;
    /// library embedders inject a `Prover` directly.
    pub prover_cmd: Option<PathBuf>,
    /// Log file; stderr only when unset.
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_address: "0.0.0.0:9000".to_string(),
            witness_address: "0.0.0.0:9001".to_string(),
            circuits_root: PathBuf::from("circuits"),
            workers: 0,
            max_inflight_jobs: 1024,
            job_ttl_seconds: 3600,
            witness_read_deadline_seconds: 30,
            subscriber_queue_depth: 4,
            prover_cmd: None,
            log_path: None,
        }
    }
}

impl Config {
    /// Load configuration: explicit path > `PROOFD_CONFIG` > defaults,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(env::config_path);
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Read(path.clone(), e))?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse(path, e))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env::string_var("PROOFD_RPC_ADDRESS") {
            self.rpc_address = v;
        }
        if let Some(v) = env::string_var("PROOFD_WITNESS_ADDRESS") {
            self.witness_address = v;
        }
        if let Some(v) = env::string_var("PROOFD_CIRCUITS_ROOT") {
            self.circuits_root = PathBuf::from(v);
        }
        if let Some(v) = env::u64_var("PROOFD_WORKERS") {
            self.workers = v as usize;
        }
        if let Some(v) = env::u64_var("PROOFD_MAX_INFLIGHT_JOBS") {
            self.max_inflight_jobs = v as usize;
        }
        if let Some(v) = env::u64_var("PROOFD_JOB_TTL_SECONDS") {
            self.job_ttl_seconds = v;
        }
        if let Some(v) = env::u64_var("PROOFD_WITNESS_READ_DEADLINE_SECONDS") {
            self.witness_read_deadline_seconds = v;
        }
        if let Some(v) = env::u64_var("PROOFD_SUBSCRIBER_QUEUE_DEPTH") {
            self.subscriber_queue_depth = v as usize;
        }
        if let Some(v) = env::string_var("PROOFD_PROVER_CMD") {
            self.prover_cmd = Some(PathBuf::from(v));
        }
        if let Some(v) = env::string_var("PROOFD_LOG_PATH") {
            self.log_path = Some(PathBuf::from(v));
        }
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map(usize::from).unwrap_or(4)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_seconds)
    }

    pub fn witness_read_deadline(&self) -> Duration {
        Duration::from_secs(self.witness_read_deadline_seconds)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("failed to parse config {0:?}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
