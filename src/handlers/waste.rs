use axum::{extract::{Path, Query, State}, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Row};
use crate::state::AppState;
use crate::error::AppError;
use crate::dtos::waste::{RecordWasteRequest, WasteEventResponse, WasteHistoryItem};
use crate::middleware::auth::AuthContext;
use tracing::instrument;

const WASTE_REASONS: [&str; 4] = ["expired", "returned", "discounted", "damaged"];

// POST /waste - record a loss against a batch
#[instrument(skip(state, auth, payload))]
pub async fn record_waste(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<RecordWasteRequest>,
) -> Result<(StatusCode, Json<WasteEventResponse>), AppError> {
    if !WASTE_REASONS.contains(&payload.reason.as_str()) {
        return Err(AppError::validation(
            "Invalid reason. Use: expired, returned, discounted or damaged",
        ));
    }
    let event_date = payload.event_date.unwrap_or_else(|| Utc::now().date_naive());

    let event = insert_waste_event(
        &state.db_pool,
        auth.user_id,
        payload.batch_id,
        payload.quantity,
        &payload.reason,
        event_date,
        payload.notes.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// Records one waste event and decrements the batch, atomically.
///
/// Waste has the same race profile as a sale: the decrement is guarded by
/// `quantity_remaining >= n` inside the transaction, so a concurrent sale
/// cannot make the write-off overdraw the batch.
pub async fn insert_waste_event(
    db_pool: &PgPool,
    user_id: i64,
    batch_id: i64,
    quantity: i32,
    reason: &str,
    event_date: NaiveDate,
    notes: Option<&str>,
) -> Result<WasteEventResponse, AppError> {
    if quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than 0"));
    }

    let mut tx = db_pool.begin().await?;

    let updated = sqlx::query(
        r#"UPDATE batches
           SET quantity_remaining = quantity_remaining - $3
           WHERE id = $1 AND user_id = $2 AND quantity_remaining >= $3
           RETURNING product_id"#,
    )
    .bind(batch_id)
    .bind(user_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(updated) = updated else {
        // Distinguish a missing batch from insufficient stock.
        let remaining: Option<i32> = sqlx::query(
            "SELECT quantity_remaining FROM batches WHERE id = $1 AND user_id = $2",
        )
        .bind(batch_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.get("quantity_remaining"));

        return match remaining {
            None => Err(AppError::not_found("Batch not found")),
            Some(available) => Err(AppError::validation(format!(
                "Insufficient stock. Available: {available}"
            ))),
        };
    };
    let product_id: i64 = updated.get("product_id");

    let row = sqlx::query(
        r#"INSERT INTO waste_events (user_id, batch_id, product_id, quantity, reason, event_date, notes)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING id, created_at"#,
    )
    .bind(user_id)
    .bind(batch_id)
    .bind(product_id)
    .bind(quantity)
    .bind(reason)
    .bind(event_date)
    .bind(notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(WasteEventResponse {
        id: row.get("id"),
        batch_id,
        product_id,
        quantity,
        reason: reason.to_string(),
        event_date,
        notes: notes.map(str::to_string),
        created_at: row.get("created_at"),
    })
}

// POST /batches/:id/expire - write off whatever is left in a batch
//
// The row stays locked from the read to the decrement, so a concurrent sale
// serializes before or after the write-off and the amount written off is
// exactly what the caller saw.
#[instrument(skip(state, auth), fields(id))]
pub async fn expire_batch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let batch = sqlx::query(
        r#"SELECT product_id, quantity_remaining, expiration_date
           FROM batches WHERE id = $1 AND user_id = $2
           FOR UPDATE"#,
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    let remaining: i32 = batch.get("quantity_remaining");
    if remaining == 0 {
        // Already exhausted, nothing to write off.
        return Ok(Json(serde_json::json!({ "success": true, "written_off": 0 })));
    }
    let product_id: i64 = batch.get("product_id");
    let expiration_date: NaiveDate = batch.get("expiration_date");

    sqlx::query("UPDATE batches SET quantity_remaining = 0 WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let event_id: i64 = sqlx::query(
        r#"INSERT INTO waste_events (user_id, batch_id, product_id, quantity, reason, event_date, notes)
           VALUES ($1, $2, $3, $4, 'expired', $5, 'Marked as expired manually')
           RETURNING id"#,
    )
    .bind(auth.user_id)
    .bind(id)
    .bind(product_id)
    .bind(remaining)
    .bind(expiration_date)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "written_off": remaining,
        "waste_event_id": event_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WasteHistoryParams {
    pub limit: Option<i64>,
}

// GET /waste/:product_id - loss history, newest first
#[instrument(skip(state, auth), fields(product_id))]
pub async fn waste_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
    Query(params): Query<WasteHistoryParams>,
) -> Result<Json<Vec<WasteHistoryItem>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let rows = sqlx::query(
        r#"SELECT w.id, w.batch_id, b.lot_number, b.expiration_date,
                  w.quantity, w.reason, w.event_date, w.notes
           FROM waste_events w
           JOIN batches b ON w.batch_id = b.id
           WHERE w.product_id = $1 AND w.user_id = $2
           ORDER BY w.event_date DESC, w.id DESC
           LIMIT $3"#,
    )
    .bind(product_id)
    .bind(auth.user_id)
    .bind(limit)
    .fetch_all(&state.db_pool)
    .await?;

    let history = rows
        .iter()
        .map(|row| WasteHistoryItem {
            id: row.get("id"),
            batch_id: row.get("batch_id"),
            lot_number: row.get("lot_number"),
            expiration_date: row.get("expiration_date"),
            quantity: row.get("quantity"),
            reason: row.get("reason"),
            event_date: row.get("event_date"),
            notes: row.get("notes"),
        })
        .collect();

    Ok(Json(history))
}
