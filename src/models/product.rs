use sqlx::FromRow;
use chrono::{DateTime, Utc};

/// Catalog entry keyed by barcode, created on first scan of an unknown code.
#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
