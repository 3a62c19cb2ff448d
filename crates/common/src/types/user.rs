use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A user record (§3 data model — the domain entity CRUD is built over).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn id(&self) -> UserId {
        UserId(self.id)
    }
}

/// Inbound shape for `POST /users` and `PUT /users/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub email: String,
}
