use axum::{
    routing::post,
    Router,
};
use crate::state::AppState;
use crate::handlers::scan;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scan/date", post(scan::parse_date))
        .route_layer(axum::middleware::from_fn(require_auth))
}
