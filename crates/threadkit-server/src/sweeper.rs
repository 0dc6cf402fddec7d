use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::ThreadService;

/// Background task that physically removes expired typing indicators.
///
/// Reads already hide expired rows, so the interval only bounds how long dead
/// rows linger. A sweep is idempotent and safe to overlap with writes.
pub async fn run_typing_sweeper(service: ThreadService, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        match service.sweep_expired_typing().await {
            Ok(count) => {
                if count > 0 {
                    info!("Typing sweep: removed {} expired indicators", count);
                }
            }
            Err(e) => {
                warn!("Typing sweep error: {}", e);
            }
        }
    }
}

pub fn spawn_typing_sweeper(service: ThreadService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(run_typing_sweeper(service, interval))
}
