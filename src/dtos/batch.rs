use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, DateTime, Utc};

#[derive(Deserialize)]
pub struct CreateBatchRequest {
    pub product_id: i64,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBatchRequest {
    pub lot_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub location: Option<String>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub quantity_remaining: i32,
    pub location: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct BatchListItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub barcode: String,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub quantity_remaining: i32,
    pub location: Option<String>,
    /// "available", "empty", "expired" or "expiring"
    pub status: String,
}
