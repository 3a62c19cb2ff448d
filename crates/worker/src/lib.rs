//! Worker lifecycle, the shared heartbeat table, and the `worker_ready`
//! gate (§4.5).

mod heartbeat;
mod lifecycle;
mod ready;

pub use heartbeat::HeartbeatTable;
pub use lifecycle::Worker;
pub use ready::WorkerReady;
