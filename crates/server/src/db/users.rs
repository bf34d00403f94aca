//! User repository for database operations.
//!
//! Queries are runtime-checked `query_as` calls mapped onto `FromRow` rows.

use sqlx::PgPool;

use onandhome_core::{Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique, like_pattern};
use crate::models::user::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, user_id, password_hash, email, username, phone, gender, birth_date, \
     address, provider, provider_id, role, active, marketing_consent, privacy_consent, \
     created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by primary key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by login id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_login_id(&self, login_id: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(login_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Whether a login id is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn login_id_exists(&self, login_id: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
                .bind(login_id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Whether an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the login id or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO users (user_id, password_hash, email, username, phone, gender,
                               birth_date, address, role, marketing_consent, privacy_consent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&new_user.user_id)
        .bind(&new_user.password_hash)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.phone)
        .bind(&new_user.gender)
        .bind(new_user.birth_date)
        .bind(&new_user.address)
        .bind(new_user.role)
        .bind(new_user.marketing_consent)
        .bind(new_user.privacy_consent)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("login id or email already exists"))?;

        Ok(user)
    }

    /// Apply a profile update. Missing fields keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                gender = COALESCE($5, gender),
                birth_date = COALESCE($6, birth_date),
                address = COALESCE($7, address),
                marketing_consent = COALESCE($8, marketing_consent),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.username)
        .bind(email)
        .bind(&update.phone)
        .bind(&update.gender)
        .bind(update.birth_date)
        .bind(&update.address)
        .bind(update.marketing_consent)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Search accounts by login id, name or email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE $1::TEXT IS NULL
               OR user_id ILIKE $1 OR username ILIKE $1 OR email ILIKE $1
            ORDER BY created_at DESC
            "
        ))
        .bind(like_pattern(keyword))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// All admin accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admins(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 AND active ORDER BY id"
        ))
        .bind(UserRole::Admin)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Every account. Callers filter by audience.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Withdraw an account.
    ///
    /// Archives the user into `inactive_users`, takes their likes off other
    /// reviews and returns the stock held by their open orders. Then deletes
    /// their notifications, cart, orders, reviews and favorites and the user
    /// row, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn withdraw(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let archived = sqlx::query(
            r"
            INSERT INTO inactive_users (user_id, password_hash, email, username, phone,
                                        gender, birth_date, address, created_at)
            SELECT user_id, password_hash, email, username, phone,
                   gender, birth_date, address, created_at
            FROM users WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if archived.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Likes on other users' reviews stop counting once the rows go.
        sqlx::query(
            r"
            UPDATE reviews SET like_count = GREATEST(like_count - 1, 0)
            WHERE id IN (SELECT review_id FROM review_likes WHERE user_id = $1)
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Open orders give their stock back, as a cancel would.
        sqlx::query(
            r"
            UPDATE products p
            SET stock = p.stock + totals.count, updated_at = NOW()
            FROM (
                SELECT oi.product_id, SUM(oi.count)::INTEGER AS count
                FROM order_items oi
                JOIN orders o ON o.id = oi.order_id
                WHERE o.user_id = $1
                  AND o.status NOT IN ('DELIVERED', 'CANCELED')
                  AND oi.product_id IS NOT NULL
                GROUP BY oi.product_id
            ) totals
            WHERE p.id = totals.product_id
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        for statement in [
            "DELETE FROM notifications WHERE user_id = $1",
            "DELETE FROM cart_items WHERE user_id = $1",
            "DELETE FROM orders WHERE user_id = $1",
            "DELETE FROM reviews WHERE user_id = $1",
            "DELETE FROM review_likes WHERE user_id = $1",
            "DELETE FROM favorites WHERE user_id = $1",
            "DELETE FROM qnas WHERE user_id = $1",
            "DELETE FROM users WHERE id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
