//! Row and response types.
//!
//! Rows derive `sqlx::FromRow` and serialize in camelCase so handlers can
//! return them as JSON without a separate view layer. Password hashes and
//! other internal columns are skipped during serialization.

pub mod advertisement;
pub mod cart;
pub mod company;
pub mod dashboard;
pub mod favorite;
pub mod notice;
pub mod notification;
pub mod order;
pub mod product;
pub mod qna;
pub mod review;
pub mod user;

use serde::Serialize;

/// Standard `{success, message, data?}` envelope for mutations.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response with no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_only_response_omits_data() {
        let json = serde_json::to_value(ApiResponse::message("삭제되었습니다.")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_response_with_data() {
        let json = serde_json::to_value(ApiResponse::ok("ok", 3)).unwrap();
        assert_eq!(json["data"], 3);
    }
}
