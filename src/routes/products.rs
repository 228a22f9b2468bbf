use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::product;
use crate::handlers::sale;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(product::list_products).post(product::create_product))
        .route("/products/{id}", get(product::get_product).put(product::update_product))
        .route("/products/barcode/{barcode}", get(product::get_product_by_barcode))
        .route("/products/barcode/{barcode}/batches", get(sale::fifo_preview))
        .route_layer(axum::middleware::from_fn(require_auth))
}
