use redis::aio::MultiplexedConnection;
use redis::Client;

use crate::error::PoolError;
use crate::pool::{Connector, Pool};

/// Single-connection `Connector` backing the KV pool, mirroring the
/// teacher's `QueueClient::connect` (open client, get connection, PING
/// health check) but one connection per handle rather than one shared
/// multiplexed connection (§4.1).
pub struct KvConnector {
    client: Client,
}

impl KvConnector {
    pub fn new(redis_url: &str) -> Result<Self, PoolError> {
        let client = Client::open(redis_url).map_err(|e| PoolError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Connector for KvConnector {
    type Handle = MultiplexedConnection;

    async fn connect(&self) -> Result<Self::Handle, PoolError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PoolError::Transport(e.to_string()))
    }

    async fn probe(&self, handle: &mut Self::Handle) -> bool {
        redis::cmd("PING")
            .query_async::<String>(handle)
            .await
            .map(|pong| pong == "PONG")
            .unwrap_or(false)
    }

    fn classify(&self, transport_failed: bool) -> bool {
        transport_failed
    }
}

/// Elastic pool of Redis connections (§4.1, §3).
pub type KvPool = Pool<KvConnector>;
