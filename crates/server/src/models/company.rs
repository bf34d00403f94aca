//! Company information shown in the footer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single company info row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub company_name: String,
    pub ceo: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub business_number: Option<String>,
    pub mail_order_number: Option<String>,
    pub privacy_officer: Option<String>,
    pub phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-entered company fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfoInput {
    pub company_name: String,
    pub ceo: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub business_number: Option<String>,
    pub mail_order_number: Option<String>,
    pub privacy_officer: Option<String>,
    pub phone: Option<String>,
}
