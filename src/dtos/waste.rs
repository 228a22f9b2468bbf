use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, NaiveDate};

#[derive(Deserialize)]
pub struct RecordWasteRequest {
    pub batch_id: i64,
    pub quantity: i32,
    /// "expired", "returned", "discounted" or "damaged"
    pub reason: String,
    pub event_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct WasteEventResponse {
    pub id: i64,
    pub batch_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub reason: String,
    pub event_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct WasteHistoryItem {
    pub id: i64,
    pub batch_id: i64,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub reason: String,
    pub event_date: NaiveDate,
    pub notes: Option<String>,
}
