use axum::{Router, routing::post};
use crate::state::AppState;
use crate::handlers::user::{register_user, login_user};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
}
