//! Review board service.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{NotificationType, ProductId, ReviewId, ReviewReplyId, UserId};

use super::notifications::NotificationService;
use super::{Actor, ServiceError, or_not_found};
use crate::db::products::ProductRepository;
use crate::db::reviews::{NewReview, ReviewRepository};
use crate::db::users::UserRepository;
use crate::models::notification::NewNotification;
use crate::models::review::{LikeToggle, Review, ReviewDetail, ReviewReply};
use crate::models::user::User;
use crate::realtime::NotificationHub;

const REVIEW_NOT_FOUND: &str = "리뷰를 찾을 수 없습니다.";

/// Body of a review create or edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: Option<ProductId>,
    pub content: String,
    pub rating: i16,
    /// Uploaded image URLs. `None` on edit keeps the current images.
    pub images: Option<Vec<String>>,
}

impl ReviewRequest {
    /// Check rating range and non-blank content.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` describing the first problem.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ServiceError::invalid("평점은 1점에서 5점 사이여야 합니다."));
        }
        if self.content.trim().is_empty() {
            return Err(ServiceError::invalid("리뷰 내용을 입력해주세요."));
        }
        Ok(())
    }
}

/// Review service.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    products: ProductRepository<'a>,
    users: UserRepository<'a>,
    notifications: NotificationService<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            products: ProductRepository::new(pool),
            users: UserRepository::new(pool),
            notifications: NotificationService::new(pool, hub),
        }
    }

    async fn user(&self, id: UserId) -> Result<User, ServiceError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("사용자를 찾을 수 없습니다."))
    }

    async fn review(&self, id: ReviewId) -> Result<Review, ServiceError> {
        self.reviews
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(REVIEW_NOT_FOUND))
    }

    /// Attach images, replies and (for a signed-in viewer) the like flag.
    async fn details(
        &self,
        reviews: Vec<Review>,
        viewer: Option<UserId>,
    ) -> Result<Vec<ReviewDetail>, ServiceError> {
        let ids: Vec<ReviewId> = reviews.iter().map(|review| review.id).collect();

        let mut images: HashMap<ReviewId, Vec<String>> = HashMap::new();
        for (id, url) in self.reviews.images_for(&ids).await? {
            images.entry(id).or_default().push(url);
        }

        let mut replies: HashMap<ReviewId, Vec<ReviewReply>> = HashMap::new();
        for reply in self.reviews.replies_for(&ids).await? {
            replies.entry(reply.review_id).or_default().push(reply);
        }

        let liked: Option<HashSet<ReviewId>> = match viewer {
            Some(user_id) => Some(
                self.reviews
                    .liked_by(user_id, &ids)
                    .await?
                    .into_iter()
                    .collect(),
            ),
            None => None,
        };

        Ok(reviews
            .into_iter()
            .map(|review| ReviewDetail {
                images: images.remove(&review.id).unwrap_or_default(),
                replies: replies.remove(&review.id).unwrap_or_default(),
                liked_by_me: liked.as_ref().map(|set| set.contains(&review.id)),
                review,
            })
            .collect())
    }

    async fn detail(&self, review: Review, viewer: Option<UserId>) -> Result<ReviewDetail, ServiceError> {
        self.details(vec![review], viewer)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found(REVIEW_NOT_FOUND))
    }

    /// Reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        viewer: Option<UserId>,
    ) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews.for_product(product_id).await?;
        self.details(reviews, viewer).await
    }

    /// One review.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown review.
    pub async fn get(&self, id: ReviewId, viewer: Option<UserId>) -> Result<ReviewDetail, ServiceError> {
        let review = self.review(id).await?;
        self.detail(review, viewer).await
    }

    /// Most recent reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews.recent(limit.clamp(1, 100)).await?;
        self.details(reviews, None).await
    }

    /// The caller's reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn mine(&self, user_id: UserId) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews.for_user(user_id).await?;
        self.details(reviews, Some(user_id)).await
    }

    /// Keyword search on content, author and product name.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<ReviewDetail>, ServiceError> {
        let reviews = self.reviews.search(keyword).await?;
        self.details(reviews, None).await
    }

    /// Write a review and tell the admins.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for bad input and `ServiceError::NotFound`
    /// for an unknown product.
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: UserId,
        request: &ReviewRequest,
    ) -> Result<ReviewDetail, ServiceError> {
        request.validate()?;
        let product_id = request
            .product_id
            .ok_or_else(|| ServiceError::invalid("상품 정보가 없습니다."))?;
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("상품을 찾을 수 없습니다."))?;
        let author = self.user(user_id).await?;

        let images = request.images.clone().unwrap_or_default();
        let review = self
            .reviews
            .create(&NewReview {
                product_id,
                user_id,
                product_name: &product.name,
                author: &author.user_id,
                content: request.content.trim(),
                rating: request.rating,
                images: &images,
            })
            .await?;
        tracing::info!(review_id = %review.id, product_id = %product_id, "Review created");

        let message = format!(
            "{} 님이 새로운 리뷰를 작성했습니다. (상품: {})",
            author.user_id, product.name
        );
        let notification = NewNotification::new(NotificationType::AdminReview, "새 리뷰 등록", message)
            .reference(review.id.as_i32())
            .product(product_id);
        if let Err(e) = self.notifications.notify_admins(notification, None).await {
            tracing::warn!(error = %e, review_id = %review.id, "Failed to send admin review notification");
        }

        self.detail(review, Some(user_id)).await
    }

    /// Edit one's own review.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for someone else's review.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReviewId,
        request: &ReviewRequest,
    ) -> Result<ReviewDetail, ServiceError> {
        request.validate()?;
        let review = self.review(id).await?;
        if review.user_id != user_id {
            return Err(ServiceError::forbidden("본인의 리뷰만 수정할 수 있습니다."));
        }

        let updated = self
            .reviews
            .update(id, request.content.trim(), request.rating, request.images.as_deref())
            .await
            .map_err(or_not_found(REVIEW_NOT_FOUND))?;
        self.detail(updated, Some(user_id)).await
    }

    /// Delete a review along with the notifications pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller owns the review or is an admin.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Actor, id: ReviewId) -> Result<(), ServiceError> {
        let review = self.review(id).await?;
        if !actor.may_manage(review.user_id) {
            return Err(ServiceError::forbidden("본인의 리뷰만 삭제할 수 있습니다."));
        }

        self.reviews
            .delete(id)
            .await
            .map_err(or_not_found(REVIEW_NOT_FOUND))?;
        self.notifications
            .forget_reference(
                &[
                    NotificationType::Review,
                    NotificationType::ReviewReply,
                    NotificationType::AdminReview,
                ],
                id.as_i32(),
            )
            .await?;
        Ok(())
    }

    /// Like or unlike a review.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown review.
    pub async fn toggle_like(&self, user_id: UserId, id: ReviewId) -> Result<LikeToggle, ServiceError> {
        let (liked, like_count) = self
            .reviews
            .toggle_like(id, user_id)
            .await
            .map_err(or_not_found(REVIEW_NOT_FOUND))?;
        Ok(LikeToggle { liked, like_count })
    }

    /// Reply to a review and notify its author, unless they replied themselves.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank reply.
    #[instrument(skip(self, content))]
    pub async fn add_reply(
        &self,
        replier_id: UserId,
        id: ReviewId,
        content: &str,
    ) -> Result<ReviewReply, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::invalid("답글 내용을 입력해주세요."));
        }
        let review = self.review(id).await?;
        let replier = self.user(replier_id).await?;

        let reply = self
            .reviews
            .add_reply(id, replier_id, &replier.username, content.trim())
            .await?;

        if review.user_id != replier_id
            && let Some(author) = self.users.get_by_id(review.user_id).await?
        {
            let notification = NewNotification::new(
                NotificationType::ReviewReply,
                "리뷰 답글 등록",
                "작성하신 리뷰에 답글이 등록되었습니다.",
            )
            .reference(id.as_i32())
            .product(review.product_id);
            if let Err(e) = self.notifications.notify_user(&author, notification, None).await {
                tracing::warn!(error = %e, review_id = %id, "Failed to send review reply notification");
            }
        }

        Ok(reply)
    }

    /// Delete a reply.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown reply.
    pub async fn delete_reply(&self, id: ReviewReplyId) -> Result<(), ServiceError> {
        self.reviews
            .delete_reply(id)
            .await
            .map_err(or_not_found("답글을 찾을 수 없습니다."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: i16, content: &str) -> ReviewRequest {
        ReviewRequest {
            product_id: Some(ProductId::new(1)),
            content: content.to_string(),
            rating,
            images: None,
        }
    }

    #[test]
    fn test_rating_must_be_one_to_five() {
        assert!(request(0, "좋아요").validate().is_err());
        assert!(request(6, "좋아요").validate().is_err());
        assert!(request(1, "좋아요").validate().is_ok());
        assert!(request(5, "좋아요").validate().is_ok());
    }

    #[test]
    fn test_content_must_not_be_blank() {
        assert!(request(4, "   ").validate().is_err());
    }
}
