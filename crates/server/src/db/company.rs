//! Company info repository. The table holds at most one row, keyed `id = 1`.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::company::{CompanyInfo, CompanyInfoInput};

const COMPANY_COLUMNS: &str = "company_name, ceo, fax, email, address, business_number, \
     mail_order_number, privacy_officer, phone, updated_at";

/// Repository for the company info row.
pub struct CompanyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompanyRepository<'a> {
    /// Create a new company repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The stored company info, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<Option<CompanyInfo>, RepositoryError> {
        let row = sqlx::query_as::<_, CompanyInfo>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM company_info WHERE id = 1"
        ))
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or replace the company info.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(&self, input: &CompanyInfoInput) -> Result<CompanyInfo, RepositoryError> {
        let row = sqlx::query_as::<_, CompanyInfo>(&format!(
            r"
            INSERT INTO company_info (id, company_name, ceo, fax, email, address,
                                      business_number, mail_order_number, privacy_officer, phone)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                ceo = EXCLUDED.ceo,
                fax = EXCLUDED.fax,
                email = EXCLUDED.email,
                address = EXCLUDED.address,
                business_number = EXCLUDED.business_number,
                mail_order_number = EXCLUDED.mail_order_number,
                privacy_officer = EXCLUDED.privacy_officer,
                phone = EXCLUDED.phone,
                updated_at = NOW()
            RETURNING {COMPANY_COLUMNS}
            "
        ))
        .bind(&input.company_name)
        .bind(&input.ceo)
        .bind(&input.fax)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.business_number)
        .bind(&input.mail_order_number)
        .bind(&input.privacy_officer)
        .bind(&input.phone)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }
}
