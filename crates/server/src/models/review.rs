//! Review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::{ProductId, ReviewId, ReviewReplyId, UserId};

/// A review row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub product_name: String,
    pub author: String,
    pub content: String,
    pub rating: i16,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An admin reply to a review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReply {
    pub id: ReviewReplyId,
    pub review_id: ReviewId,
    pub user_id: Option<UserId>,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review with its images and replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    pub images: Vec<String>,
    pub replies: Vec<ReviewReply>,
    /// Present only when the caller is authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i32,
}
