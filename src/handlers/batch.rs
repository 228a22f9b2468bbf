use axum::{extract::{State, Path, Query}, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::Row;
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::expiry::{self, ExpiryStatus, DEFAULT_THRESHOLD_DAYS};
use crate::dtos::batch::{BatchListItem, BatchResponse, CreateBatchRequest, UpdateBatchRequest};
use crate::middleware::auth::AuthContext;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct BatchQueryParams {
    pub product_id: Option<i64>,
    /// "available", "empty", "expired", "expiring"
    pub status: Option<String>,
    /// Expiring-soon window in days (7-90, default 30).
    pub days: Option<u32>,
}

fn threshold_from(params_days: Option<u32>) -> Result<u32, AppError> {
    let days = params_days.unwrap_or(DEFAULT_THRESHOLD_DAYS);
    if !expiry::validate_threshold(days) {
        return Err(AppError::validation("days must be between 7 and 90"));
    }
    Ok(days)
}

/// Status label for list views. Classification happens here in Rust, on
/// date-only values, so list filters and alerts share one semantics.
pub(crate) fn status_label(expiration_date: NaiveDate, remaining: i32, reference: NaiveDate, days: u32) -> &'static str {
    match expiry::alert_status(expiration_date, remaining, reference, days) {
        None => "empty",
        Some(ExpiryStatus::Expired) => "expired",
        Some(ExpiryStatus::Expiring) => "expiring",
        Some(ExpiryStatus::Valid) => "available",
    }
}

// GET /batches - inventory view, FIFO order
#[instrument(skip(state, auth))]
pub async fn list_batches(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<BatchQueryParams>,
) -> Result<Json<Vec<BatchListItem>>, AppError> {
    let days = threshold_from(params.days)?;
    if let Some(status) = params.status.as_deref() {
        if !matches!(status, "available" | "empty" | "expired" | "expiring") {
            return Err(AppError::validation(
                "Invalid status. Use: available, empty, expired or expiring",
            ));
        }
    }

    let mut query = String::from(
        r#"SELECT b.id, b.product_id, p.name AS product_name, p.barcode,
                  b.lot_number, b.expiration_date, b.quantity,
                  b.quantity_remaining, b.location
           FROM batches b
           JOIN products p ON b.product_id = p.id
           WHERE b.user_id = $1"#,
    );
    if params.product_id.is_some() {
        query.push_str(" AND b.product_id = $2");
    }
    query.push_str(" ORDER BY b.expiration_date ASC, b.id ASC");

    let mut q = sqlx::query(&query).bind(auth.user_id);
    if let Some(product_id) = params.product_id {
        q = q.bind(product_id);
    }
    let rows = q.fetch_all(&state.db_pool).await?;

    let today = Utc::now().date_naive();
    let batches: Vec<BatchListItem> = rows
        .iter()
        .map(|row| {
            let expiration_date: NaiveDate = row.get("expiration_date");
            let quantity_remaining: i32 = row.get("quantity_remaining");
            BatchListItem {
                id: row.get("id"),
                product_id: row.get("product_id"),
                product_name: row.get("product_name"),
                barcode: row.get("barcode"),
                lot_number: row.get("lot_number"),
                expiration_date,
                quantity: row.get("quantity"),
                quantity_remaining,
                location: row.get("location"),
                status: status_label(expiration_date, quantity_remaining, today, days).to_string(),
            }
        })
        .filter(|b| params.status.as_deref().map_or(true, |s| b.status == s))
        .collect();

    Ok(Json(batches))
}

// GET /batches/:id
#[instrument(skip(state, auth), fields(id))]
pub async fn get_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<BatchResponse>, AppError> {
    let row = sqlx::query(
        r#"SELECT b.id, b.product_id, p.name AS product_name, b.lot_number,
                  b.expiration_date, b.quantity, b.quantity_remaining,
                  b.location, b.created_at
           FROM batches b
           JOIN products p ON b.product_id = p.id
           WHERE b.id = $1 AND b.user_id = $2"#,
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok(Json(BatchResponse {
        id: row.get("id"),
        product_id: row.get("product_id"),
        product_name: row.get("product_name"),
        lot_number: row.get("lot_number"),
        expiration_date: row.get("expiration_date"),
        quantity: row.get("quantity"),
        quantity_remaining: row.get("quantity_remaining"),
        location: row.get("location"),
        created_at: row.get("created_at"),
    }))
}

// POST /batches - stock load (scan + expiration capture)
#[instrument(skip(state, auth, payload))]
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), AppError> {
    if payload.quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than 0"));
    }
    if payload.lot_number.trim().is_empty() {
        return Err(AppError::validation("Lot number required"));
    }

    // The product must belong to the caller.
    let product_name: String = sqlx::query(
        "SELECT name FROM products WHERE id = $1 AND user_id = $2",
    )
    .bind(payload.product_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?
    .get("name");

    let row = sqlx::query(
        r#"INSERT INTO batches
               (user_id, product_id, lot_number, expiration_date, quantity, quantity_remaining, location)
           VALUES ($1, $2, $3, $4, $5, $5, $6)
           RETURNING id, product_id, lot_number, expiration_date, quantity,
                     quantity_remaining, location, created_at"#,
    )
    .bind(auth.user_id)
    .bind(payload.product_id)
    .bind(payload.lot_number.trim())
    .bind(payload.expiration_date)
    .bind(payload.quantity)
    .bind(&payload.location)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BatchResponse {
            id: row.get("id"),
            product_id: row.get("product_id"),
            product_name,
            lot_number: row.get("lot_number"),
            expiration_date: row.get("expiration_date"),
            quantity: row.get("quantity"),
            quantity_remaining: row.get("quantity_remaining"),
            location: row.get("location"),
            created_at: row.get("created_at"),
        }),
    ))
}

// PUT /batches/:id - corrections to lot/location/date; quantities only move
// through sales and waste events
#[instrument(skip(state, auth, payload), fields(id))]
pub async fn update_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let row = sqlx::query(
        r#"UPDATE batches b SET
               lot_number = COALESCE($1, lot_number),
               expiration_date = COALESCE($2, expiration_date),
               location = COALESCE($3, location)
           FROM products p
           WHERE b.id = $4 AND b.user_id = $5 AND p.id = b.product_id
           RETURNING b.id, b.product_id, p.name AS product_name, b.lot_number,
                     b.expiration_date, b.quantity, b.quantity_remaining,
                     b.location, b.created_at"#,
    )
    .bind(payload.lot_number)
    .bind(payload.expiration_date)
    .bind(payload.location)
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok(Json(BatchResponse {
        id: row.get("id"),
        product_id: row.get("product_id"),
        product_name: row.get("product_name"),
        lot_number: row.get("lot_number"),
        expiration_date: row.get("expiration_date"),
        quantity: row.get("quantity"),
        quantity_remaining: row.get("quantity_remaining"),
        location: row.get("location"),
        created_at: row.get("created_at"),
    }))
}

// DELETE /batches/:id
#[instrument(skip(state, auth), fields(id))]
pub async fn delete_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM batches WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Batch not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
