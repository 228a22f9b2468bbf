use serde::Serialize;

use crate::domain::metrics::{DashboardStats, MonthlyWaste, ProductMetrics, RiskMetrics};
use crate::domain::suggestions::Suggestion;

#[derive(Serialize)]
pub struct ProductInfo {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
}

/// Detail view: one product with its full metrics and suggestions.
#[derive(Serialize)]
pub struct ProductMetricsResponse {
    pub product: ProductInfo,
    pub metrics: ProductMetrics,
    pub suggestions: Vec<Suggestion>,
}

/// Fleet view row, sorted by risk score.
#[derive(Serialize)]
pub struct ProductRiskItem {
    pub product: ProductInfo,
    #[serde(flatten)]
    pub metrics: RiskMetrics,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
}

#[derive(Serialize)]
pub struct TrendsResponse {
    pub months: Vec<MonthlyWaste>,
}

/// Suggestion tagged with its product for the fleet-wide feed.
#[derive(Serialize)]
pub struct FleetSuggestion {
    pub product_id: i64,
    pub product_name: String,
    #[serde(flatten)]
    pub suggestion: Suggestion,
}

/// High-risk listing row with the factors that triggered it.
#[derive(Serialize)]
pub struct HighRiskItem {
    pub product: ProductInfo,
    pub total_purchased: i64,
    pub total_remaining: i64,
    pub total_wasted: i64,
    pub waste_ratio: f64,
    pub units_expiring: i64,
    pub high_waste: bool,
    pub expiring_soon: bool,
}

/// One line of the notification feed: what is about to expire and when.
#[derive(Serialize)]
pub struct ExpiringAlert {
    pub product_id: i64,
    pub name: String,
    pub barcode: String,
    pub units_expiring_30d: i64,
    pub days_to_next_expiry: Option<i64>,
}
