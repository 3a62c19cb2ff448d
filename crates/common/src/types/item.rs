use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// An item record (§3 data model).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub sku: String,
    pub name: String,
    /// Price in integer minor units (cents) — avoids floating point in money math.
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn id(&self) -> ItemId {
        ItemId(self.id)
    }
}

/// Inbound shape for `POST /items` and `PUT /items/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemInput {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
}
