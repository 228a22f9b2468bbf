use axum::Json;
use crate::error::AppError;
use crate::domain::dates::parse_expiration_text;
use crate::dtos::scan::{ParseDateRequest, ParseDateResponse};
use tracing::instrument;

// POST /scan/date - extract an expiration date from OCR text
#[instrument(skip(payload))]
pub async fn parse_date(
    Json(payload): Json<ParseDateRequest>,
) -> Result<Json<ParseDateResponse>, AppError> {
    let expiration_date = parse_expiration_text(&payload.text)
        .ok_or_else(|| AppError::validation("No valid expiration date found in text"))?;

    Ok(Json(ParseDateResponse { expiration_date }))
}
