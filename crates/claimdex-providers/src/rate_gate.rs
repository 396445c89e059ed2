//! Per-provider request gate.
//!
//! At most one request is in flight per gate, with a minimum interval
//! between consecutive requests. In shared mode every client holds an
//! `Arc` of the same gate, globally serializing provider traffic; in
//! parallel mode each client gets its own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

pub struct RateGate {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

/// Held for the duration of a request; the next caller is admitted only
/// once it drops.
pub struct RatePermit<'a> {
    _guard: MutexGuard<'a, Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            last_request: Mutex::new(None),
            min_interval,
        })
    }

    /// Wait for the gate: locks out other callers, sleeps off whatever
    /// remains of the minimum interval, and returns a permit to hold
    /// while the request runs.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        RatePermit { _guard: last }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_out_consecutive_requests() {
        let gate = RateGate::new(Duration::from_millis(500));

        let start = Instant::now();
        drop(gate.acquire().await);
        drop(gate.acquire().await);
        drop(gate.acquire().await);

        // Two full intervals must have elapsed between three requests.
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_acts_as_plain_mutex() {
        let gate = RateGate::new(Duration::ZERO);
        let start = Instant::now();
        drop(gate.acquire().await);
        drop(gate.acquire().await);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn shared_gate_serializes_multiple_clients() {
        let gate = RateGate::new(Duration::from_millis(200));
        let a = gate.clone();
        let b = gate.clone();

        let start = Instant::now();
        let (_, _) = tokio::join!(
            async {
                drop(a.acquire().await);
            },
            async {
                drop(b.acquire().await);
            }
        );
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
