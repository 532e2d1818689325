// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Config file path override: `PROOFD_CONFIG`.
pub fn config_path() -> Option<PathBuf> {
    std::env::var("PROOFD_CONFIG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Per-request RPC read/write timeout (default 10s, `PROOFD_RPC_TIMEOUT_MS`).
pub fn rpc_timeout() -> Duration {
    millis_var("PROOFD_RPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Shutdown drain timeout (default 5s, `PROOFD_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    millis_var("PROOFD_DRAIN_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// String-valued config override, e.g. `PROOFD_RPC_ADDRESS`.
pub(crate) fn string_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Integer-valued config override, e.g. `PROOFD_WORKERS`.
pub(crate) fn u64_var(name: &str) -> Option<u64> {
    string_var(name).and_then(|s| s.parse().ok())
}

fn millis_var(name: &str) -> Option<Duration> {
    u64_var(name).map(Duration::from_millis)
}
