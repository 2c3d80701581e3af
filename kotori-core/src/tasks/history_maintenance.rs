// kotori-core/src/tasks/history_maintenance.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::clock::Clock;
use crate::services::MessageService;

/// Spawns a background task that periodically sweeps expired messages and
/// idle channels out of the history store.
pub fn spawn_history_sweep_task(
    service: Arc<MessageService>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let removed = service.sweep(clock.now());
            debug!("History sweep finished; {removed} channel(s) removed");
        }
    })
}
