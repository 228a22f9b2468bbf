use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::metrics;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics/products", get(metrics::fleet_metrics))
        .route("/metrics/products/{id}", get(metrics::product_metrics))
        .route("/metrics/dashboard", get(metrics::dashboard))
        .route("/metrics/suggestions", get(metrics::fleet_suggestions))
        .route("/metrics/high-risk", get(metrics::high_risk_products))
        .route("/metrics/top-waste", get(metrics::top_waste))
        .route("/metrics/top-risk", get(metrics::top_risk))
        .route("/metrics/expiring-alerts", get(metrics::expiring_alerts))
        .route("/metrics/trends", get(metrics::trends))
        .route_layer(axum::middleware::from_fn(require_auth))
}
