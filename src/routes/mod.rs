pub mod batches;
pub mod metrics;
pub mod products;
pub mod sales;
pub mod scan;
pub mod users;
pub mod waste;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(products::routes())
        .merge(batches::routes())
        .merge(sales::routes())
        .merge(waste::routes())
        .merge(metrics::routes())
        .merge(scan::routes())
}
