//! Product question types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::{ProductId, QnaId, QnaReplyId, UserId, UserRole};

/// Shown in place of a private question's text.
pub const PRIVATE_PLACEHOLDER: &str = "비밀글입니다.";

/// A question row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Qna {
    pub id: QnaId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub product_name: Option<String>,
    pub title: String,
    pub writer: String,
    pub question: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An admin answer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QnaReply {
    pub id: QnaReplyId,
    pub qna_id: QnaId,
    pub user_id: Option<UserId>,
    pub responder: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A question with images and answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaDetail {
    #[serde(flatten)]
    pub qna: Qna,
    pub images: Vec<String>,
    pub replies: Vec<QnaReply>,
    pub answered: bool,
}

impl QnaDetail {
    #[must_use]
    pub fn new(qna: Qna, images: Vec<String>, replies: Vec<QnaReply>) -> Self {
        Self {
            answered: !replies.is_empty(),
            qna,
            images,
            replies,
        }
    }

    /// Hide a private question's content unless `viewer` wrote it or is an admin.
    #[must_use]
    pub fn masked_for(mut self, viewer: Option<(UserId, UserRole)>) -> Self {
        let visible = match viewer {
            Some((_, role)) if role.is_admin() => true,
            Some((id, _)) => id == self.qna.user_id,
            None => false,
        };
        if self.qna.is_private && !visible {
            PRIVATE_PLACEHOLDER.clone_into(&mut self.qna.title);
            PRIVATE_PLACEHOLDER.clone_into(&mut self.qna.question);
            self.images.clear();
            self.replies.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(is_private: bool) -> QnaDetail {
        let now = Utc::now();
        QnaDetail::new(
            Qna {
                id: QnaId::new(1),
                product_id: ProductId::new(2),
                user_id: UserId::new(3),
                product_name: None,
                title: "배송 문의".into(),
                question: "언제 오나요?".into(),
                writer: "buyer".into(),
                is_private,
                created_at: now,
                updated_at: now,
            },
            vec!["/uploads/a.png".into()],
            Vec::new(),
        )
    }

    #[test]
    fn test_private_question_is_masked_for_strangers() {
        let masked = detail(true).masked_for(Some((UserId::new(99), UserRole::User)));
        assert_eq!(masked.qna.question, PRIVATE_PLACEHOLDER);
        assert!(masked.images.is_empty());

        let anonymous = detail(true).masked_for(None);
        assert_eq!(anonymous.qna.title, PRIVATE_PLACEHOLDER);
    }

    #[test]
    fn test_private_question_visible_to_writer_and_admin() {
        let own = detail(true).masked_for(Some((UserId::new(3), UserRole::User)));
        assert_eq!(own.qna.question, "언제 오나요?");

        let admin = detail(true).masked_for(Some((UserId::new(1), UserRole::Admin)));
        assert_eq!(admin.qna.question, "언제 오나요?");
    }

    #[test]
    fn test_public_question_is_never_masked() {
        assert_eq!(detail(false).masked_for(None).qna.question, "언제 오나요?");
    }
}
