mod circuit_breaker;
mod error;
mod kv;
mod pool;
mod rdb;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::PoolError;
pub use kv::{KvConnector, KvPool};
pub use pool::{Connector, Pool, PooledHandle};
pub use rdb::{RdbConnector, RdbPool};
