//! Periodic scanner loops.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::error::Result;

/// Run a scanner forever: one pass, then sleep, then again. A failed
/// pass is logged and does not break the loop; the next cycle retries
/// whatever work rolled back to pending.
pub async fn run_scanner_loop<F, Fut>(name: &'static str, interval: Duration, task: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    info!("starting {} loop with interval {:?}", name, interval);
    loop {
        if let Err(e) = task().await {
            error!("error in {} loop: {}", name, e);
        }
        sleep(interval).await;
    }
}
