use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::batch;
use crate::handlers::waste;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", get(batch::list_batches).post(batch::create_batch))
        .route(
            "/batches/{id}",
            get(batch::get_batch).put(batch::update_batch).delete(batch::delete_batch),
        )
        .route("/batches/{id}/expire", post(waste::expire_batch))
        .route_layer(axum::middleware::from_fn(require_auth))
}
