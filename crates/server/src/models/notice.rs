//! Store notices.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::NoticeId;

/// A notice row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: NoticeId,
    pub title: String,
    pub writer: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
