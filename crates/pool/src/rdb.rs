use sqlx::{Connection, PgConnection};

use crate::error::PoolError;
use crate::pool::{Connector, Pool};

/// Single-connection `Connector` backing the RDB pool. Unlike the teacher's
/// `StoreClient`, which hands out a `sqlx::PgPool` directly, `Pool<C>` owns
/// elasticity itself, so this wraps one bare `PgConnection` per handle.
pub struct RdbConnector {
    database_url: String,
}

impl RdbConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Connector for RdbConnector {
    type Handle = PgConnection;

    async fn connect(&self) -> Result<Self::Handle, PoolError> {
        PgConnection::connect(&self.database_url)
            .await
            .map_err(|e| PoolError::Transport(e.to_string()))
    }

    async fn probe(&self, handle: &mut Self::Handle) -> bool {
        sqlx::query("SELECT 1").execute(handle).await.is_ok()
    }

    fn classify(&self, transport_failed: bool) -> bool {
        transport_failed
    }
}

/// Elastic pool of Postgres connections (§4.1, §3).
pub type RdbPool = Pool<RdbConnector>;
