//! Product question service.

use std::collections::HashMap;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{NotificationType, ProductId, QnaId, UserId, UserRole};

use super::notifications::NotificationService;
use super::{Actor, ServiceError, or_not_found};
use crate::db::products::ProductRepository;
use crate::db::qna::{NewQna, QnaRepository};
use crate::db::users::UserRepository;
use crate::models::notification::NewNotification;
use crate::models::qna::{Qna, QnaDetail, QnaReply};
use crate::realtime::NotificationHub;

const QNA_NOT_FOUND: &str = "문의를 찾을 수 없습니다.";

/// Body of a question create or edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaRequest {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

impl QnaRequest {
    /// Title and question must not be blank.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` describing the first problem.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.title.trim().is_empty() {
            return Err(ServiceError::invalid("제목을 입력해주세요."));
        }
        if self.question.trim().is_empty() {
            return Err(ServiceError::invalid("문의 내용을 입력해주세요."));
        }
        Ok(())
    }
}

/// Question service.
pub struct QnaService<'a> {
    qnas: QnaRepository<'a>,
    products: ProductRepository<'a>,
    users: UserRepository<'a>,
    notifications: NotificationService<'a>,
}

impl<'a> QnaService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            qnas: QnaRepository::new(pool),
            products: ProductRepository::new(pool),
            users: UserRepository::new(pool),
            notifications: NotificationService::new(pool, hub),
        }
    }

    async fn qna(&self, id: QnaId) -> Result<Qna, ServiceError> {
        self.qnas
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(QNA_NOT_FOUND))
    }

    /// Attach images and replies, masking private questions for `viewer`.
    async fn details(
        &self,
        qnas: Vec<Qna>,
        viewer: Option<(UserId, UserRole)>,
    ) -> Result<Vec<QnaDetail>, ServiceError> {
        let ids: Vec<QnaId> = qnas.iter().map(|qna| qna.id).collect();

        let mut images: HashMap<QnaId, Vec<String>> = HashMap::new();
        for (id, url) in self.qnas.images_for(&ids).await? {
            images.entry(id).or_default().push(url);
        }
        let mut replies: HashMap<QnaId, Vec<QnaReply>> = HashMap::new();
        for reply in self.qnas.replies_for(&ids).await? {
            replies.entry(reply.qna_id).or_default().push(reply);
        }

        Ok(qnas
            .into_iter()
            .map(|qna| {
                let id = qna.id;
                QnaDetail::new(
                    qna,
                    images.remove(&id).unwrap_or_default(),
                    replies.remove(&id).unwrap_or_default(),
                )
                .masked_for(viewer)
            })
            .collect())
    }

    /// Questions on a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        viewer: Option<(UserId, UserRole)>,
    ) -> Result<Vec<QnaDetail>, ServiceError> {
        let qnas = self.qnas.for_product(product_id).await?;
        self.details(qnas, viewer).await
    }

    /// One question.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown question.
    pub async fn get(
        &self,
        id: QnaId,
        viewer: Option<(UserId, UserRole)>,
    ) -> Result<QnaDetail, ServiceError> {
        let qna = self.qna(id).await?;
        self.details(vec![qna], viewer)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found(QNA_NOT_FOUND))
    }

    /// Most recent questions.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn recent(
        &self,
        limit: i64,
        viewer: Option<(UserId, UserRole)>,
    ) -> Result<Vec<QnaDetail>, ServiceError> {
        let qnas = self.qnas.recent(limit.clamp(1, 100)).await?;
        self.details(qnas, viewer).await
    }

    /// The caller's questions.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn mine(&self, user_id: UserId, role: UserRole) -> Result<Vec<QnaDetail>, ServiceError> {
        let qnas = self.qnas.for_user(user_id).await?;
        self.details(qnas, Some((user_id, role))).await
    }

    /// Keyword search.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn search(
        &self,
        keyword: Option<&str>,
        viewer: Option<(UserId, UserRole)>,
    ) -> Result<Vec<QnaDetail>, ServiceError> {
        let qnas = self.qnas.search(keyword).await?;
        self.details(qnas, viewer).await
    }

    /// Ask a question and tell the admins.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for blank fields and
    /// `ServiceError::NotFound` for an unknown product.
    #[instrument(skip(self, request))]
    pub async fn create(&self, user_id: UserId, request: &QnaRequest) -> Result<QnaDetail, ServiceError> {
        request.validate()?;
        let product_id = request
            .product_id
            .ok_or_else(|| ServiceError::invalid("상품 정보가 없습니다."))?;
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("상품을 찾을 수 없습니다."))?;
        let writer = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("사용자를 찾을 수 없습니다."))?;

        let id = self
            .qnas
            .create(&NewQna {
                product_id,
                user_id,
                title: request.title.trim(),
                writer: &writer.user_id,
                question: request.question.trim(),
                is_private: request.is_private,
                images: &request.images,
            })
            .await?;
        tracing::info!(qna_id = %id, product_id = %product_id, "Question created");

        let message = format!(
            "{}님이 새로운 문의를 등록했습니다. (상품: {})",
            writer.user_id, product.name
        );
        let notification = NewNotification::new(NotificationType::AdminQna, "새 Q&A 등록", message)
            .reference(id.as_i32())
            .product(product_id);
        if let Err(e) = self.notifications.notify_admins(notification, None).await {
            tracing::warn!(error = %e, qna_id = %id, "Failed to send admin question notification");
        }

        self.get(id, Some((user_id, writer.role))).await
    }

    /// Edit a question.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller wrote it or is an admin.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor: Actor,
        id: QnaId,
        request: &QnaRequest,
    ) -> Result<QnaDetail, ServiceError> {
        request.validate()?;
        let qna = self.qna(id).await?;
        if !actor.may_manage(qna.user_id) {
            return Err(ServiceError::forbidden("본인의 문의만 수정할 수 있습니다."));
        }

        self.qnas
            .update(id, request.title.trim(), request.question.trim(), request.is_private)
            .await
            .map_err(or_not_found(QNA_NOT_FOUND))?;
        self.get(id, Some((actor.id, actor.role))).await
    }

    /// Delete a question and the notifications pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller wrote it or is an admin.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Actor, id: QnaId) -> Result<(), ServiceError> {
        let qna = self.qna(id).await?;
        if !actor.may_manage(qna.user_id) {
            return Err(ServiceError::forbidden("본인의 문의만 삭제할 수 있습니다."));
        }

        self.qnas
            .delete(id)
            .await
            .map_err(or_not_found(QNA_NOT_FOUND))?;
        self.notifications
            .forget_reference(
                &[
                    NotificationType::Qna,
                    NotificationType::QnaReply,
                    NotificationType::AdminQna,
                ],
                id.as_i32(),
            )
            .await?;
        Ok(())
    }

    /// Answer a question and notify the writer, unless they answered themselves.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank answer.
    #[instrument(skip(self, content))]
    pub async fn add_reply(
        &self,
        responder_id: UserId,
        id: QnaId,
        content: &str,
    ) -> Result<QnaReply, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::invalid("답변 내용을 입력해주세요."));
        }
        let qna = self.qna(id).await?;
        let responder = self
            .users
            .get_by_id(responder_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("사용자를 찾을 수 없습니다."))?;

        let reply = self
            .qnas
            .add_reply(id, responder_id, &responder.username, content.trim())
            .await?;

        if qna.user_id != responder_id
            && let Some(writer) = self.users.get_by_id(qna.user_id).await?
        {
            let notification = NewNotification::new(
                NotificationType::QnaReply,
                "Q&A 답변 등록",
                "문의하신 내용에 답변이 등록되었습니다.",
            )
            .reference(id.as_i32())
            .product(qna.product_id);
            if let Err(e) = self.notifications.notify_user(&writer, notification, None).await {
                tracing::warn!(error = %e, qna_id = %id, "Failed to send answer notification");
            }
        }

        Ok(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_rejected() {
        let mut request = QnaRequest {
            product_id: Some(ProductId::new(1)),
            title: "배송".into(),
            question: " ".into(),
            is_private: false,
            images: Vec::new(),
        };
        assert!(request.validate().is_err());

        request.question = "언제 배송되나요?".into();
        assert!(request.validate().is_ok());

        request.title = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_private_flag_defaults_off() {
        let request: QnaRequest = serde_json::from_value(serde_json::json!({
            "productId": 1, "title": "t", "question": "q"
        }))
        .unwrap();
        assert!(!request.is_private);
        assert!(request.images.is_empty());
    }
}
