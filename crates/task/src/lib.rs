mod channel;
mod dispatcher;
mod error;
mod handler;
mod queue;
mod queue_consumer;

pub use channel::ChannelQueue;
pub use dispatcher::{execute, finish};
pub use error::TaskError;
pub use handler::{guards_against_metrics_recursion, HandlerRegistry, TaskHandler, METRICS_TASK_CLASS};
pub use queue::{TaskQueue, CONSUMER_GROUP, STREAM_DEFAULT};
pub use queue_consumer::QueueConsumer;
