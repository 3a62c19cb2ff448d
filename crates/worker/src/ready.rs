use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use runtime_common::RuntimeError;

/// Process-local `worker_ready` flag (§4.5, §5), `init=false`, set `true`
/// at the end of worker-start, cleared on shutdown/error. §9 DESIGN NOTES
/// replaces the source's global `AppContext::isWorkerReady` with "a single
/// atomic flag" owned per worker rather than a process-wide global.
#[derive(Clone, Default)]
pub struct WorkerReady {
    flag: Arc<AtomicBool>,
}

impl WorkerReady {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ready: bool) {
        self.flag.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// The global `WorkerReadyChecker` gate (§4.5): blocks up to 2s,
    /// polling every 10ms, before every request enters the pipeline.
    pub async fn wait_ready(&self) -> Result<(), RuntimeError> {
        wait_ready_with(self, Duration::from_secs(2), Duration::from_millis(10)).await
    }
}

async fn wait_ready_with(flag: &WorkerReady, budget: Duration, poll: Duration) -> Result<(), RuntimeError> {
    if flag.is_ready() {
        return Ok(());
    }

    let deadline = Instant::now() + budget;
    loop {
        tokio::time::sleep(poll).await;
        if flag.is_ready() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RuntimeError::WorkerNotReady);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_ready_returns_immediately_once_set() {
        let flag = WorkerReady::new();
        flag.set(true);
        assert!(flag.wait_ready().await.is_ok());
    }

    #[tokio::test]
    async fn wait_ready_times_out_when_never_set() {
        let flag = WorkerReady::new();
        let err = wait_ready_with(&flag, Duration::from_millis(30), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::WorkerNotReady));
    }

    #[tokio::test]
    async fn wait_ready_observes_flag_flipped_during_the_wait() {
        let flag = WorkerReady::new();
        let flag_clone = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag_clone.set(true);
        });

        let result = wait_ready_with(&flag, Duration::from_secs(2), Duration::from_millis(10)).await;
        assert!(result.is_ok());
    }
}
