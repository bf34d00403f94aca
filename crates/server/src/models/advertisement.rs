//! Advertisement types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use onandhome_core::AdvertisementId;

/// An advertisement row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: AdvertisementId,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub active: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-entered advertisement fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementInput {
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}
