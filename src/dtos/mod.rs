pub mod batch;
pub mod metrics;
pub mod product;
pub mod sale;
pub mod scan;
pub mod user;
pub mod waste;
