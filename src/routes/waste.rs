use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::waste;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/waste", post(waste::record_waste))
        .route("/waste/{product_id}", get(waste::waste_history))
        .route_layer(axum::middleware::from_fn(require_auth))
}
