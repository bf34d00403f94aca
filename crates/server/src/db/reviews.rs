//! Review repository.

use sqlx::PgPool;

use onandhome_core::{ProductId, ReviewId, ReviewReplyId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::review::{Review, ReviewReply};

const REVIEW_COLUMNS: &str = "id, product_id, user_id, product_name, author, content, rating, \
     like_count, created_at, updated_at";

/// Fields for a new review.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub product_name: &'a str,
    pub author: &'a str,
    pub content: &'a str,
    pub rating: i16,
    pub images: &'a [String],
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(review)
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Reviews written by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Most recent reviews across the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Search by content, author or product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            r"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE $1::TEXT IS NULL
               OR content ILIKE $1 OR author ILIKE $1 OR product_name ILIKE $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(like_pattern(keyword))
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Image URLs for a set of reviews as `(review_id, url)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for(
        &self,
        ids: &[ReviewId],
    ) -> Result<Vec<(ReviewId, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (ReviewId, String)>(
            "SELECT review_id, image_url FROM review_images WHERE review_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Replies for a set of reviews, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn replies_for(&self, ids: &[ReviewId]) -> Result<Vec<ReviewReply>, RepositoryError> {
        let replies = sqlx::query_as::<_, ReviewReply>(
            r"
            SELECT id, review_id, user_id, author, content, created_at, updated_at
            FROM review_replies WHERE review_id = ANY($1) ORDER BY created_at, id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(replies)
    }

    /// Which of `ids` the user has liked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn liked_by(
        &self,
        user_id: UserId,
        ids: &[ReviewId],
    ) -> Result<Vec<ReviewId>, RepositoryError> {
        let liked = sqlx::query_scalar::<_, ReviewId>(
            "SELECT review_id FROM review_likes WHERE user_id = $1 AND review_id = ANY($2)",
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(liked)
    }

    /// Create a review with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Review>(&format!(
            r"
            INSERT INTO reviews (product_id, user_id, product_name, author, content, rating)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.product_name)
        .bind(review.author)
        .bind(review.content)
        .bind(review.rating)
        .fetch_one(&mut *tx)
        .await?;

        for url in review.images {
            sqlx::query("INSERT INTO review_images (review_id, image_url) VALUES ($1, $2)")
                .bind(created.id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Update content and rating. `images`, when given, replaces the image set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn update(
        &self,
        id: ReviewId,
        content: &str,
        rating: i16,
        images: Option<&[String]>,
    ) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            r"
            UPDATE reviews SET content = $2, rating = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(id)
        .bind(content)
        .bind(rating)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if let Some(images) = images {
            sqlx::query("DELETE FROM review_images WHERE review_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for url in images {
                sqlx::query("INSERT INTO review_images (review_id, image_url) VALUES ($1, $2)")
                    .bind(id)
                    .bind(url)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(review)
    }

    /// Delete a review. Images, likes and replies cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Toggle a user's like. Returns the new state and count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn toggle_like(
        &self,
        id: ReviewId,
        user_id: UserId,
    ) -> Result<(bool, i32), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the review so concurrent toggles serialize on the counter.
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT like_count FROM reviews WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let removed = sqlx::query("DELETE FROM review_likes WHERE review_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let liked = if removed {
            false
        } else {
            sqlx::query("INSERT INTO review_likes (review_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            true
        };

        let delta: i32 = if liked { 1 } else { -1 };
        let like_count: i32 = sqlx::query_scalar(
            r"
            UPDATE reviews SET like_count = GREATEST(like_count + $2, 0)
            WHERE id = $1
            RETURNING like_count
            ",
        )
        .bind(id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((liked, like_count))
    }

    /// Add a reply.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_reply(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        author: &str,
        content: &str,
    ) -> Result<ReviewReply, RepositoryError> {
        let reply = sqlx::query_as::<_, ReviewReply>(
            r"
            INSERT INTO review_replies (review_id, user_id, author, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, review_id, user_id, author, content, created_at, updated_at
            ",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(author)
        .bind(content)
        .fetch_one(self.pool)
        .await?;
        Ok(reply)
    }

    /// Delete a reply.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the reply doesn't exist.
    pub async fn delete_reply(&self, id: ReviewReplyId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM review_replies WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
