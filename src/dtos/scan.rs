use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

#[derive(Deserialize)]
pub struct ParseDateRequest {
    /// Raw OCR text from the capture device.
    pub text: String,
}

#[derive(Serialize)]
pub struct ParseDateResponse {
    pub expiration_date: NaiveDate,
}
