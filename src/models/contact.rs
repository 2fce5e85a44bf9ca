use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The alert owner, as the dispatcher needs to identify them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// A phone number nominated to receive emergency notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedContact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}
