use axum::{extract::{Path, Query, State}, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::expiry::DEFAULT_THRESHOLD_DAYS;
use crate::domain::metrics::{
    self, BatchSnapshot, WasteByReason, ALERT_WINDOW_DAYS, DEFAULT_WASTE_THRESHOLD,
};
use crate::domain::suggestions::{generate_suggestions, rank_feed};
use crate::domain::expiry;
use crate::dtos::metrics::{
    DashboardResponse, ExpiringAlert, FleetSuggestion, HighRiskItem, ProductInfo,
    ProductMetricsResponse, ProductRiskItem, TrendsResponse,
};
use crate::middleware::auth::AuthContext;
use tracing::instrument;

/// One product with everything metric computation needs.
struct ProductData {
    info: ProductInfo,
    batches: Vec<BatchSnapshot>,
    waste: WasteByReason,
}

/// Loads the whole fleet in three queries (products, batches, waste sums)
/// instead of per-product round trips. Metrics are recomputed from this
/// snapshot on every call; nothing is cached.
async fn load_fleet(db_pool: &PgPool, user_id: i64) -> Result<Vec<ProductData>, AppError> {
    let product_rows = sqlx::query(
        "SELECT id, barcode, name, brand FROM products WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let batch_rows = sqlx::query(
        "SELECT product_id, quantity, quantity_remaining, expiration_date
         FROM batches WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let waste_rows = sqlx::query(
        "SELECT product_id, reason, SUM(quantity)::BIGINT AS total
         FROM waste_events WHERE user_id = $1
         GROUP BY product_id, reason",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let mut batches_by_product: HashMap<i64, Vec<BatchSnapshot>> = HashMap::new();
    for row in &batch_rows {
        batches_by_product
            .entry(row.get("product_id"))
            .or_default()
            .push(BatchSnapshot {
                quantity: row.get("quantity"),
                quantity_remaining: row.get("quantity_remaining"),
                expiration_date: row.get("expiration_date"),
            });
    }

    let mut waste_by_product: HashMap<i64, WasteByReason> = HashMap::new();
    for row in &waste_rows {
        let reason: String = row.get("reason");
        let total: i64 = row.get("total");
        waste_by_product
            .entry(row.get("product_id"))
            .or_default()
            .add(&reason, total);
    }

    Ok(product_rows
        .iter()
        .map(|row| {
            let id: i64 = row.get("id");
            ProductData {
                info: ProductInfo {
                    id,
                    barcode: row.get("barcode"),
                    name: row.get("name"),
                    brand: row.get("brand"),
                },
                batches: batches_by_product.remove(&id).unwrap_or_default(),
                waste: waste_by_product.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    /// Expiring-soon window in days (7-90, default 30).
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

fn threshold_from(days: Option<u32>) -> Result<u32, AppError> {
    let days = days.unwrap_or(DEFAULT_THRESHOLD_DAYS);
    if !expiry::validate_threshold(days) {
        return Err(AppError::validation("days must be between 7 and 90"));
    }
    Ok(days)
}

// GET /metrics/products/:id - full metrics + suggestions for one product
#[instrument(skip(state, auth), fields(id))]
pub async fn product_metrics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<ProductMetricsResponse>, AppError> {
    let days = threshold_from(params.days)?;

    let product = sqlx::query(
        "SELECT id, barcode, name, brand FROM products WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    let batch_rows = sqlx::query(
        "SELECT quantity, quantity_remaining, expiration_date
         FROM batches WHERE product_id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;
    let batches: Vec<BatchSnapshot> = batch_rows
        .iter()
        .map(|row| BatchSnapshot {
            quantity: row.get("quantity"),
            quantity_remaining: row.get("quantity_remaining"),
            expiration_date: row.get("expiration_date"),
        })
        .collect();

    let waste_rows = sqlx::query(
        "SELECT reason, SUM(quantity)::BIGINT AS total
         FROM waste_events WHERE product_id = $1 AND user_id = $2
         GROUP BY reason",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;
    let mut waste = WasteByReason::default();
    for row in &waste_rows {
        let reason: String = row.get("reason");
        waste.add(&reason, row.get("total"));
    }

    let today = Utc::now().date_naive();
    let computed = metrics::compute_product_metrics(&batches, &waste, today, days);
    let suggestions = generate_suggestions(&computed);

    Ok(Json(ProductMetricsResponse {
        product: ProductInfo {
            id: product.get("id"),
            barcode: product.get("barcode"),
            name: product.get("name"),
            brand: product.get("brand"),
        },
        metrics: computed,
        suggestions,
    }))
}

// GET /metrics/products - fleet table sorted by risk score
#[instrument(skip(state, auth))]
pub async fn fleet_metrics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<Vec<ProductRiskItem>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 500);
    let today = Utc::now().date_naive();

    let mut items: Vec<ProductRiskItem> = load_fleet(&state.db_pool, auth.user_id)
        .await?
        .into_iter()
        .map(|p| ProductRiskItem {
            metrics: metrics::compute_risk_metrics(&p.batches, p.waste.total(), today),
            product: p.info,
        })
        .collect();

    items.sort_by(|a, b| b.metrics.risk_score.cmp(&a.metrics.risk_score));
    items.truncate(limit);
    Ok(Json(items))
}

// GET /metrics/dashboard
#[instrument(skip(state, auth))]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DashboardResponse>, AppError> {
    let today = Utc::now().date_naive();
    let fleet: Vec<_> = load_fleet(&state.db_pool, auth.user_id)
        .await?
        .into_iter()
        .map(|p| metrics::compute_risk_metrics(&p.batches, p.waste.total(), today))
        .collect();

    Ok(Json(DashboardResponse { stats: metrics::dashboard_stats(&fleet) }))
}

// GET /metrics/suggestions - fleet-wide feed, high priority first, top 10
#[instrument(skip(state, auth))]
pub async fn fleet_suggestions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<Vec<FleetSuggestion>>, AppError> {
    let days = threshold_from(params.days)?;
    let today = Utc::now().date_naive();

    let mut feed = Vec::new();
    for p in load_fleet(&state.db_pool, auth.user_id).await? {
        let computed = metrics::compute_product_metrics(&p.batches, &p.waste, today, days);
        for suggestion in generate_suggestions(&computed) {
            feed.push(FleetSuggestion {
                product_id: p.info.id,
                product_name: p.info.name.clone(),
                suggestion,
            });
        }
    }

    Ok(Json(rank_feed(feed, |s| s.suggestion.priority)))
}

// GET /metrics/top-waste - worst offenders by wasted units
#[instrument(skip(state, auth))]
pub async fn top_waste(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<Vec<ProductRiskItem>>, AppError> {
    let limit = params.limit.unwrap_or(5).clamp(1, 100);
    let today = Utc::now().date_naive();

    let mut items: Vec<ProductRiskItem> = load_fleet(&state.db_pool, auth.user_id)
        .await?
        .into_iter()
        .map(|p| ProductRiskItem {
            metrics: metrics::compute_risk_metrics(&p.batches, p.waste.total(), today),
            product: p.info,
        })
        .filter(|i| i.metrics.total_units_wasted > 0)
        .collect();

    items.sort_by(|a, b| b.metrics.total_units_wasted.cmp(&a.metrics.total_units_wasted));
    items.truncate(limit);
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct HighRiskParams {
    /// Waste-ratio percentage threshold, default 20.
    pub waste_threshold: Option<f64>,
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

// GET /metrics/high-risk - products needing attention
#[instrument(skip(state, auth))]
pub async fn high_risk_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HighRiskParams>,
) -> Result<Json<Vec<HighRiskItem>>, AppError> {
    let days = threshold_from(params.days)?;
    let waste_threshold = params.waste_threshold.unwrap_or(DEFAULT_WASTE_THRESHOLD);
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    let today = Utc::now().date_naive();

    let mut items: Vec<HighRiskItem> = load_fleet(&state.db_pool, auth.user_id)
        .await?
        .into_iter()
        .filter(|p| !p.batches.is_empty())
        .map(|p| {
            let m = metrics::compute_product_metrics(&p.batches, &p.waste, today, days);
            let high_waste = m.waste_percentage >= waste_threshold;
            let expiring_soon = m.units_expiring >= 5
                || (m.total_remaining > 0
                    && m.units_expiring as f64 / m.total_remaining as f64 >= 0.3);
            HighRiskItem {
                product: p.info,
                total_purchased: m.total_purchased,
                total_remaining: m.total_remaining,
                total_wasted: m.total_wasted,
                waste_ratio: m.waste_percentage,
                units_expiring: m.units_expiring,
                high_waste,
                expiring_soon,
            }
        })
        .filter(|i| {
            metrics::is_high_risk(i.waste_ratio, i.units_expiring, i.total_remaining, waste_threshold)
        })
        .collect();

    // Both factors outrank one; waste ratio breaks ties.
    items.sort_by(|a, b| {
        let a_score = u8::from(a.high_waste) + u8::from(a.expiring_soon);
        let b_score = u8::from(b.high_waste) + u8::from(b.expiring_soon);
        b_score
            .cmp(&a_score)
            .then(b.waste_ratio.total_cmp(&a.waste_ratio))
    });
    items.truncate(limit);
    Ok(Json(items))
}

async fn expiring_feed(
    db_pool: &PgPool,
    user_id: i64,
    limit: usize,
) -> Result<Vec<ExpiringAlert>, AppError> {
    let today = Utc::now().date_naive();

    let mut alerts: Vec<ExpiringAlert> = load_fleet(db_pool, user_id)
        .await?
        .into_iter()
        .map(|p| ExpiringAlert {
            units_expiring_30d: metrics::expiring_within(&p.batches, today, ALERT_WINDOW_DAYS),
            days_to_next_expiry: metrics::days_to_next_expiry(&p.batches, today),
            product_id: p.info.id,
            name: p.info.name,
            barcode: p.info.barcode,
        })
        .filter(|a| a.units_expiring_30d > 0)
        .collect();

    alerts.sort_by(|a, b| b.units_expiring_30d.cmp(&a.units_expiring_30d));
    alerts.truncate(limit);
    Ok(alerts)
}

// GET /metrics/top-risk - products with the most stock about to expire
#[instrument(skip(state, auth))]
pub async fn top_risk(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<Vec<ExpiringAlert>>, AppError> {
    let limit = params.limit.unwrap_or(5).clamp(1, 100);
    Ok(Json(expiring_feed(&state.db_pool, auth.user_id, limit).await?))
}

// GET /metrics/expiring-alerts - feed for the external notification sender
#[instrument(skip(state, auth))]
pub async fn expiring_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ExpiringAlert>>, AppError> {
    Ok(Json(expiring_feed(&state.db_pool, auth.user_id, 10).await?))
}

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    pub months: Option<usize>,
}

// GET /metrics/trends - monthly wasted units, most recent first
#[instrument(skip(state, auth))]
pub async fn trends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendsResponse>, AppError> {
    let months = params.months.unwrap_or(6).clamp(1, 36);

    let rows = sqlx::query(
        "SELECT event_date, quantity FROM waste_events WHERE user_id = $1",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;

    let events: Vec<(chrono::NaiveDate, i32)> = rows
        .iter()
        .map(|row| (row.get("event_date"), row.get("quantity")))
        .collect();

    Ok(Json(TrendsResponse { months: metrics::monthly_waste(&events, months) }))
}
