// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job pub/sub hub.
//!
//! Every job carries a hub that fans status events out to its
//! subscribers. A subscription is a bounded queue drained by exactly one
//! consumer: the producer never blocks on it, and a queue that would
//! overflow terminates its subscription with a lag mark instead.
//!
//! Callers publish and subscribe while holding the job lock, which is
//! what makes the delivered order the job's total transition order and
//! lets `subscribe` seed the snapshot without a transition slipping in
//! between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use proofd_core::JobUpdate;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Broadcast hub attached to one job.
pub(crate) struct Hub {
    sinks: Mutex<Vec<Sink>>,
}

struct Sink {
    tx: mpsc::Sender<JobUpdate>,
    lagged: Arc<AtomicBool>,
}

/// Consumer side of one subscription.
pub struct Subscription {
    rx: mpsc::Receiver<JobUpdate>,
    lagged: Arc<AtomicBool>,
}

/// Terminal subscription failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The consumer fell behind its bounded queue; the stream was cut.
    #[error("subscriber lagged behind the event stream")]
    Lagged,
}

impl Hub {
    pub(crate) fn new() -> Self {
        Self { sinks: Mutex::new(Vec::new()) }
    }

    /// Install a sink seeded with `snapshot`.
    ///
    /// Must be called under the job lock. A snapshot of a terminal job
    /// installs no sink at all: the subscriber sees the one event, then
    /// end of stream.
    pub(crate) fn subscribe(&self, queue_depth: usize, snapshot: JobUpdate) -> Subscription {
        let terminal = snapshot.status.is_terminal();
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let lagged = Arc::new(AtomicBool::new(false));
        // Fresh queue with depth >= 1: the snapshot always fits.
        let _ = tx.try_send(snapshot);
        if !terminal {
            self.sinks.lock().push(Sink { tx, lagged: Arc::clone(&lagged) });
        }
        Subscription { rx, lagged }
    }

    /// Fan `update` out to every sink.
    ///
    /// Must be called under the job lock. A full queue marks that sink
    /// lagged and removes it; a terminal update removes every sink so
    /// the queues close once drained.
    pub(crate) fn publish(&self, update: &JobUpdate) {
        let mut sinks = self.sinks.lock();
        sinks.retain(|sink| match sink.tx.try_send(update.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                sink.lagged.store(true, Ordering::Release);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        if update.status.is_terminal() {
            sinks.clear();
        }
    }

    /// Drop every sink, ending all subscriptions after their queued
    /// events drain.
    pub(crate) fn close(&self) {
        self.sinks.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

impl Subscription {
    /// Next event. `Ok(None)` is a clean close: the terminal event has
    /// been delivered (or the job was evicted / the daemon shut down).
    pub async fn next(&mut self) -> Result<Option<JobUpdate>, SubscriptionError> {
        match self.rx.recv().await {
            Some(update) => Ok(Some(update)),
            None if self.lagged.load(Ordering::Acquire) => Err(SubscriptionError::Lagged),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
