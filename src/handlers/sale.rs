use axum::{extract::{Query, State}, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Row};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::csv::{parse_csv, validate_row, ImportReport};
use crate::domain::fifo::{plan_deduction, OpenBatch};
use crate::dtos::sale::{CreateSaleRequest, SaleListItem, SaleResponse};
use crate::middleware::auth::AuthContext;
use tracing::{instrument, warn};

const SALE_SOURCES: [&str; 3] = ["manual", "csv", "api"];

// POST /sales - manual or API sale
#[instrument(skip(state, auth, payload))]
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    let source = payload.source.as_deref().unwrap_or("manual");
    let sale_date = payload.sale_date.unwrap_or_else(|| Utc::now().date_naive());

    let sale = process_sale(
        &state.db_pool,
        auth.user_id,
        payload.barcode.trim(),
        payload.quantity,
        sale_date,
        source,
        payload.external_ref.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// The single FIFO entry point. Manual sales, the CSV importer and external
/// API callers all deduct stock through here, so the semantics cannot drift.
///
/// The sale event is appended first and survives even when the barcode does
/// not resolve, keeping an audit trail of unmatched demand. The deduction
/// itself runs in one transaction with the product's open batches locked in
/// FIFO order, and each decrement is guarded by `quantity_remaining >= n` so
/// concurrent sales can never drive a batch negative.
pub async fn process_sale(
    db_pool: &PgPool,
    user_id: i64,
    barcode: &str,
    quantity: i32,
    sale_date: NaiveDate,
    source: &str,
    external_ref: Option<&str>,
) -> Result<SaleResponse, AppError> {
    if barcode.is_empty() {
        return Err(AppError::validation("Barcode required"));
    }
    if quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than 0"));
    }
    if !SALE_SOURCES.contains(&source) {
        return Err(AppError::validation("Invalid source. Use: manual, csv or api"));
    }

    // 1. Append the demand event before anything can fail.
    let sale_event_id: i64 = sqlx::query(
        r#"INSERT INTO sale_events (user_id, barcode, quantity, sale_date, source, external_ref, processed)
           VALUES ($1, $2, $3, $4, $5, $6, FALSE)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(barcode)
    .bind(quantity)
    .bind(sale_date)
    .bind(source)
    .bind(external_ref)
    .fetch_one(db_pool)
    .await?
    .get("id");

    // 2. Resolve the barcode. A miss leaves the event logged but unresolved.
    let product = sqlx::query(
        "SELECT id, name FROM products WHERE barcode = $1 AND user_id = $2",
    )
    .bind(barcode)
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;

    let Some(product) = product else {
        warn!(barcode, sale_event_id, "Sale against unknown barcode");
        return Err(AppError::not_found("Product not found"));
    };
    let product_id: i64 = product.get("id");
    let product_name: String = product.get("name");

    // 3. Deduct FIFO inside one transaction.
    let mut tx = db_pool.begin().await?;

    let rows = sqlx::query(
        r#"SELECT id, lot_number, expiration_date, quantity_remaining
           FROM batches
           WHERE product_id = $1 AND user_id = $2 AND quantity_remaining > 0
           ORDER BY expiration_date ASC, id ASC
           FOR UPDATE"#,
    )
    .bind(product_id)
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let batches: Vec<OpenBatch> = rows
        .iter()
        .map(|row| OpenBatch {
            id: row.get("id"),
            lot_number: row.get("lot_number"),
            expiration_date: row.get("expiration_date"),
            quantity_remaining: row.get("quantity_remaining"),
        })
        .collect();

    let plan = plan_deduction(batches, quantity);

    for deduction in &plan.deductions {
        let result = sqlx::query(
            r#"UPDATE batches
               SET quantity_remaining = quantity_remaining - $2
               WHERE id = $1 AND quantity_remaining >= $2"#,
        )
        .bind(deduction.batch_id)
        .bind(deduction.deducted)
        .execute(&mut *tx)
        .await?;

        // The row lock makes this unreachable; treat it as a hard fault
        // rather than silently under-deducting.
        if result.rows_affected() == 0 {
            return Err(AppError::conflict("Batch stock changed during sale"));
        }
    }

    // 4. Mark the event processed with the resolved product.
    sqlx::query(
        r#"UPDATE sale_events
           SET processed = TRUE, product_id = $2, processed_at = NOW()
           WHERE id = $1"#,
    )
    .bind(sale_event_id)
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let warning = plan.warning();
    if let Some(w) = &warning {
        warn!(barcode, sale_event_id, "{w}");
    }

    Ok(SaleResponse {
        sale_event_id,
        product_id,
        product_name,
        barcode: barcode.to_string(),
        quantity,
        sale_date,
        source: source.to_string(),
        deductions: plan.deductions,
        warning,
    })
}

// POST /sales/import - raw CSV body
#[instrument(skip(state, auth, body))]
pub async fn import_sales(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: String,
) -> Result<Json<ImportReport>, AppError> {
    let today = Utc::now().date_naive();
    let mut report = ImportReport::new();

    for row in parse_csv(&body, today) {
        let valid = match validate_row(&row) {
            Ok(v) => v,
            Err(message) => {
                report.row_failed(row, message);
                continue;
            }
        };

        match process_sale(
            &state.db_pool,
            auth.user_id,
            &valid.barcode,
            valid.quantity,
            valid.date,
            "csv",
            None,
        )
        .await
        {
            Ok(sale) => report.row_processed(row, sale.warning),
            Err(err) => {
                let message = match err {
                    AppError::NotFound(msg) | AppError::ValidationError(msg) | AppError::Conflict(msg) => msg,
                    other => {
                        warn!(?other, "Import row failed");
                        "Processing error".to_string()
                    }
                };
                report.row_failed(row, message);
            }
        }
    }

    Ok(Json(report))
}

// GET /products/barcode/:barcode/batches - FIFO preview: the order sales
// will consume this product's stock
#[instrument(skip(state, auth), fields(barcode))]
pub async fn fifo_preview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    axum::extract::Path(barcode): axum::extract::Path<String>,
) -> Result<Json<Vec<crate::dtos::batch::BatchListItem>>, AppError> {
    let product = sqlx::query(
        "SELECT id, name FROM products WHERE barcode = $1 AND user_id = $2",
    )
    .bind(barcode.trim())
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;
    let product_id: i64 = product.get("id");
    let product_name: String = product.get("name");

    let today = Utc::now().date_naive();
    let rows = sqlx::query(
        r#"SELECT id, lot_number, expiration_date, quantity, quantity_remaining, location
           FROM batches
           WHERE product_id = $1 AND user_id = $2
           ORDER BY expiration_date ASC, id ASC"#,
    )
    .bind(product_id)
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;

    let batches = rows
        .iter()
        .map(|row| {
            let expiration_date: NaiveDate = row.get("expiration_date");
            let quantity_remaining: i32 = row.get("quantity_remaining");
            let status = crate::handlers::batch::status_label(
                expiration_date,
                quantity_remaining,
                today,
                crate::domain::expiry::DEFAULT_THRESHOLD_DAYS,
            );
            crate::dtos::batch::BatchListItem {
                id: row.get("id"),
                product_id,
                product_name: product_name.clone(),
                barcode: barcode.trim().to_string(),
                lot_number: row.get("lot_number"),
                expiration_date,
                quantity: row.get("quantity"),
                quantity_remaining,
                location: row.get("location"),
                status: status.to_string(),
            }
        })
        .collect();

    Ok(Json(batches))
}

#[derive(Debug, Deserialize)]
pub struct SaleHistoryParams {
    pub barcode: Option<String>,
    pub limit: Option<i64>,
}

// GET /sales - demand history, newest first
#[instrument(skip(state, auth))]
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<SaleHistoryParams>,
) -> Result<Json<Vec<SaleListItem>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let mut query = String::from(
        r#"SELECT id, barcode, quantity, sale_date, source, external_ref, processed, created_at
           FROM sale_events WHERE user_id = $1"#,
    );
    if params.barcode.is_some() {
        query.push_str(" AND barcode = $3");
    }
    query.push_str(" ORDER BY sale_date DESC, id DESC LIMIT $2");

    let mut q = sqlx::query(&query).bind(auth.user_id).bind(limit);
    if let Some(barcode) = &params.barcode {
        q = q.bind(barcode);
    }

    let sales = q
        .fetch_all(&state.db_pool)
        .await?
        .iter()
        .map(|row| SaleListItem {
            id: row.get("id"),
            barcode: row.get("barcode"),
            quantity: row.get("quantity"),
            sale_date: row.get("sale_date"),
            source: row.get("source"),
            external_ref: row.get("external_ref"),
            processed: row.get("processed"),
            created_at: row.get("created_at"),
        })
        .collect();

    Ok(Json(sales))
}
