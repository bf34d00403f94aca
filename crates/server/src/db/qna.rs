//! Product question repository.

use sqlx::PgPool;

use onandhome_core::{ProductId, QnaId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::qna::{Qna, QnaReply};

const QNA_SELECT: &str = r"
    SELECT q.id, q.product_id, q.user_id, p.name AS product_name, q.title, q.writer,
           q.question, q.is_private, q.created_at, q.updated_at
    FROM qnas q
    LEFT JOIN products p ON p.id = q.product_id
";

/// Fields for a new question.
#[derive(Debug, Clone)]
pub struct NewQna<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub title: &'a str,
    pub writer: &'a str,
    pub question: &'a str,
    pub is_private: bool,
    pub images: &'a [String],
}

/// Repository for question database operations.
pub struct QnaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> QnaRepository<'a> {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: QnaId) -> Result<Option<Qna>, RepositoryError> {
        let qna = sqlx::query_as::<_, Qna>(&format!("{QNA_SELECT} WHERE q.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(qna)
    }

    /// Questions about a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Qna>, RepositoryError> {
        let rows = sqlx::query_as::<_, Qna>(&format!(
            "{QNA_SELECT} WHERE q.product_id = $1 ORDER BY q.created_at DESC, q.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Questions asked by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Qna>, RepositoryError> {
        let rows = sqlx::query_as::<_, Qna>(&format!(
            "{QNA_SELECT} WHERE q.user_id = $1 ORDER BY q.created_at DESC, q.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Most recent questions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Qna>, RepositoryError> {
        let rows = sqlx::query_as::<_, Qna>(&format!(
            "{QNA_SELECT} ORDER BY q.created_at DESC, q.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Search by title, question, writer or product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<Qna>, RepositoryError> {
        let rows = sqlx::query_as::<_, Qna>(&format!(
            r"
            {QNA_SELECT}
            WHERE $1::TEXT IS NULL
               OR q.title ILIKE $1 OR q.question ILIKE $1 OR q.writer ILIKE $1 OR p.name ILIKE $1
            ORDER BY q.created_at DESC, q.id DESC
            "
        ))
        .bind(like_pattern(keyword))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Image URLs for a set of questions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for(&self, ids: &[QnaId]) -> Result<Vec<(QnaId, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (QnaId, String)>(
            "SELECT qna_id, image_url FROM qna_images WHERE qna_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Answers for a set of questions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn replies_for(&self, ids: &[QnaId]) -> Result<Vec<QnaReply>, RepositoryError> {
        let rows = sqlx::query_as::<_, QnaReply>(
            r"
            SELECT id, qna_id, user_id, responder, content, created_at
            FROM qna_replies WHERE qna_id = ANY($1) ORDER BY created_at, id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a question with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn create(&self, qna: &NewQna<'_>) -> Result<QnaId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: QnaId = sqlx::query_scalar(
            r"
            INSERT INTO qnas (product_id, user_id, title, writer, question, is_private)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(qna.product_id)
        .bind(qna.user_id)
        .bind(qna.title)
        .bind(qna.writer)
        .bind(qna.question)
        .bind(qna.is_private)
        .fetch_one(&mut *tx)
        .await?;

        for url in qna.images {
            sqlx::query("INSERT INTO qna_images (qna_id, image_url) VALUES ($1, $2)")
                .bind(id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Update a question's text and privacy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the question doesn't exist.
    pub async fn update(
        &self,
        id: QnaId,
        title: &str,
        question: &str,
        is_private: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE qnas SET title = $2, question = $3, is_private = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(title)
        .bind(question)
        .bind(is_private)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a question. Images and answers cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the question doesn't exist.
    pub async fn delete(&self, id: QnaId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM qnas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add an answer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_reply(
        &self,
        qna_id: QnaId,
        user_id: UserId,
        responder: &str,
        content: &str,
    ) -> Result<QnaReply, RepositoryError> {
        let reply = sqlx::query_as::<_, QnaReply>(
            r"
            INSERT INTO qna_replies (qna_id, user_id, responder, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, qna_id, user_id, responder, content, created_at
            ",
        )
        .bind(qna_id)
        .bind(user_id)
        .bind(responder)
        .bind(content)
        .fetch_one(self.pool)
        .await?;
        Ok(reply)
    }
}
