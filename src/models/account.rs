use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root ownership unit. Created alongside the first user at signup and never
/// mutated afterwards; groups reference it through `owner_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Account {
    fn entity_type() -> &'static str {
        "account"
    }
    fn subject_id(&self) -> Uuid {
        self.id
    }
}
