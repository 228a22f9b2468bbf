use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, NaiveDate};

use crate::domain::fifo::BatchDeduction;

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    pub barcode: String,
    pub quantity: i32,
    /// Defaults to today when omitted (manual counter deductions).
    pub sale_date: Option<NaiveDate>,
    pub source: Option<String>,
    pub external_ref: Option<String>,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub sale_event_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub barcode: String,
    pub quantity: i32,
    pub sale_date: NaiveDate,
    pub source: String,
    pub deductions: Vec<BatchDeduction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct SaleListItem {
    pub id: i64,
    pub barcode: String,
    pub quantity: i32,
    pub sale_date: NaiveDate,
    pub source: String,
    pub external_ref: Option<String>,
    pub processed: bool,
    pub created_at: Option<DateTime<Utc>>,
}
