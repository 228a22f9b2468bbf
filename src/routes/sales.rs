use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::sale;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route("/sales/import", post(sale::import_sales))
        .route_layer(axum::middleware::from_fn(require_auth))
}
