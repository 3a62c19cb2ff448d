use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::dispatcher;
use crate::handler::HandlerRegistry;
use crate::queue::TaskQueue;

const RECLAIM_INTERVAL: Duration = Duration::from_secs(30);
const RECLAIM_MIN_IDLE_MS: u64 = 60_000;

/// Drains the cross-worker Redis-stream queue on a background task (§4.6),
/// sharing `dispatcher::execute`/`finish` with the in-process
/// [`crate::ChannelQueue`] consumer so both publish the same outcome shape.
/// Periodically reclaims entries a dead consumer left pending, generalizing
/// the teacher's `reclaim_pending`/`XCLAIM` sweep.
pub struct QueueConsumer {
    stop: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl QueueConsumer {
    pub fn start(queue: Arc<TaskQueue>, registry: Arc<HandlerRegistry>, consumer_name: String) -> Self {
        let stop = Arc::new(Notify::new());
        let stop_for_task = Arc::clone(&stop);

        let handle = tokio::spawn(async move {
            let mut last_reclaim = Instant::now();
            loop {
                if last_reclaim.elapsed() >= RECLAIM_INTERVAL {
                    reclaim_once(&queue, &registry, &consumer_name).await;
                    last_reclaim = Instant::now();
                }

                tokio::select! {
                    _ = stop_for_task.notified() => break,
                    result = queue.dequeue(&consumer_name, Some(1000)) => {
                        match result {
                            Ok(Some((entry_id, envelope))) => {
                                let outcome = dispatcher::execute(&registry, &envelope).await;
                                dispatcher::finish(&outcome);
                                if let Err(e) = queue.ack(&entry_id).await {
                                    tracing::warn!(error = %e, "failed to ack cross-worker task");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "cross-worker dequeue failed, backing off");
                                tokio::time::sleep(Duration::from_millis(500)).await;
                            }
                        }
                    }
                }
            }
        });

        Self { stop, handle }
    }

    pub async fn stop(self) {
        self.stop.notify_one();
        let _ = self.handle.await;
    }
}

async fn reclaim_once(queue: &TaskQueue, registry: &HandlerRegistry, consumer_name: &str) {
    match queue.reclaim_pending(consumer_name, RECLAIM_MIN_IDLE_MS).await {
        Ok(reclaimed) => {
            for (entry_id, envelope) in reclaimed {
                let outcome = dispatcher::execute(registry, &envelope).await;
                dispatcher::finish(&outcome);
                if let Err(e) = queue.ack(&entry_id).await {
                    tracing::warn!(error = %e, "failed to ack reclaimed cross-worker task");
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "cross-worker reclaim failed"),
    }
}
