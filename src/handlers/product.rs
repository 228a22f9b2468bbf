// src/handlers/product.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::Error as SqlxError;
use crate::dtos::product::{CreateProductRequest, UpdateProductRequest, ProductResponse};
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;
use crate::error::AppError;
use tracing::instrument;

fn map_unique_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

// GET /products - List the catalog
#[instrument(skip(state, auth))]
pub async fn list_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, barcode, name, brand, created_at
         FROM products WHERE user_id = $1 ORDER BY name",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

// GET /products/:id
#[instrument(skip(state, auth), fields(id))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, barcode, name, brand, created_at
         FROM products WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// GET /products/barcode/:barcode - Scan resolution. A 404 here drives the
// client's "create new product" flow.
#[instrument(skip(state, auth), fields(barcode))]
pub async fn get_product_by_barcode(
    Path(barcode): Path<String>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, barcode, name, brand, created_at
         FROM products WHERE barcode = $1 AND user_id = $2",
    )
    .bind(barcode.trim())
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - Register a freshly scanned barcode
#[instrument(skip(state, auth, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    if payload.barcode.trim().is_empty() {
        return Err(AppError::validation("Barcode required"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name required"));
    }

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (user_id, barcode, name, brand)
         VALUES ($1, $2, $3, $4)
         RETURNING id, barcode, name, brand, created_at",
    )
    .bind(auth.user_id)
    .bind(payload.barcode.trim())
    .bind(payload.name.trim())
    .bind(&payload.brand)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Barcode already registered"))?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/:id - Metadata edits only; the barcode is immutable
#[instrument(skip(state, auth, payload), fields(id))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET
         name = COALESCE($1, name),
         brand = COALESCE($2, brand)
         WHERE id = $3 AND user_id = $4
         RETURNING id, barcode, name, brand, created_at",
    )
    .bind(payload.name)
    .bind(payload.brand)
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}
