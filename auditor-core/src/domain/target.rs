//! Target domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authorized URL that scans can be launched against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}
