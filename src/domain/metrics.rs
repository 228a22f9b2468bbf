// src/domain/metrics.rs
//
// Derived stock/waste metrics. Everything here is computed on demand from
// batch and waste-event snapshots; nothing is cached or persisted.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use super::expiry::{alert_status, ExpiryStatus};

/// Window used by the risk-score formula. Fixed: changing it would break
/// score comparability across products and over time.
pub const RISK_WINDOW_DAYS: u32 = 20;

/// Window for the expiring-soon notification feed.
pub const ALERT_WINDOW_DAYS: u32 = 30;

/// Default waste-ratio percentage above which a product is high risk.
pub const DEFAULT_WASTE_THRESHOLD: f64 = 20.0;

/// Batch fields needed for metric computation.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub quantity: i32,
    pub quantity_remaining: i32,
    pub expiration_date: NaiveDate,
}

/// Waste totals for one product, aggregated from its waste events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WasteByReason {
    pub expired: i64,
    pub returned: i64,
    pub discounted: i64,
    pub damaged: i64,
}

impl WasteByReason {
    pub fn add(&mut self, reason: &str, quantity: i64) {
        match reason {
            "expired" => self.expired += quantity,
            "returned" => self.returned += quantity,
            "discounted" => self.discounted += quantity,
            "damaged" => self.damaged += quantity,
            _ => {}
        }
    }

    pub fn total(&self) -> i64 {
        self.expired + self.returned + self.discounted + self.damaged
    }
}

/// Full per-product metrics (product detail view).
#[derive(Debug, Clone, Serialize)]
pub struct ProductMetrics {
    pub total_purchased: i64,
    pub total_sold: i64,
    pub total_remaining: i64,
    pub total_wasted: i64,
    pub wasted_by_reason: WasteByReason,
    pub sold_percentage: f64,
    pub waste_percentage: f64,
    pub units_expiring: i64,
    pub units_expired: i64,
    pub expiring_batch_count: usize,
    pub expired_batch_count: usize,
}

/// Compact fleet-view metrics carrying the composite risk score.
#[derive(Debug, Clone, Serialize)]
pub struct RiskMetrics {
    pub total_units_loaded: i64,
    pub total_units_wasted: i64,
    pub current_stock: i64,
    pub waste_ratio: f64,
    pub units_expired: i64,
    pub units_expiring_20d: i64,
    pub risk_score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_wasted_units: i64,
    pub avg_waste_ratio: f64,
    pub high_risk_count: usize,
    pub units_expired: i64,
    pub units_expiring_20d: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyWaste {
    /// `YYYY-MM`
    pub month: String,
    pub wasted: i64,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn units_in_status(
    batches: &[BatchSnapshot],
    reference: NaiveDate,
    threshold_days: u32,
    status: ExpiryStatus,
) -> (i64, usize) {
    let mut units = 0i64;
    let mut count = 0usize;
    for b in batches {
        if alert_status(b.expiration_date, b.quantity_remaining, reference, threshold_days)
            == Some(status)
        {
            units += i64::from(b.quantity_remaining);
            count += 1;
        }
    }
    (units, count)
}

/// Computes the detail metrics for one product.
///
/// `total_sold` is derived as purchased minus remaining: batches alone cannot
/// distinguish a sale from a waste decrement, so the waste side comes from
/// the event log.
pub fn compute_product_metrics(
    batches: &[BatchSnapshot],
    waste: &WasteByReason,
    reference: NaiveDate,
    threshold_days: u32,
) -> ProductMetrics {
    let total_purchased: i64 = batches.iter().map(|b| i64::from(b.quantity)).sum();
    let total_remaining: i64 = batches.iter().map(|b| i64::from(b.quantity_remaining)).sum();
    let total_sold = total_purchased - total_remaining;
    let total_wasted = waste.total();

    let sold_percentage = if total_purchased > 0 {
        round1(total_sold as f64 / total_purchased as f64 * 100.0)
    } else {
        0.0
    };
    let waste_percentage = if total_purchased > 0 {
        round1(total_wasted as f64 / total_purchased as f64 * 100.0)
    } else {
        0.0
    };

    let (units_expired, expired_batch_count) =
        units_in_status(batches, reference, threshold_days, ExpiryStatus::Expired);
    let (units_expiring, expiring_batch_count) =
        units_in_status(batches, reference, threshold_days, ExpiryStatus::Expiring);

    ProductMetrics {
        total_purchased,
        total_sold,
        total_remaining,
        total_wasted,
        wasted_by_reason: waste.clone(),
        sold_percentage,
        waste_percentage,
        units_expiring,
        units_expired,
        expiring_batch_count,
        expired_batch_count,
    }
}

/// The fleet risk ranking primitive. Reproduced exactly as specified:
/// 0.4 x waste ratio + 0.3 x expired share + 0.3 x expiring-in-20d share,
/// each term on a 0-100 scale, rounded and clamped to [0, 100].
pub fn risk_score(waste_ratio: f64, units_expired: i64, units_expiring_20d: i64, current_stock: i64) -> i64 {
    let expired_term = if current_stock > 0 {
        units_expired as f64 / current_stock as f64 * 30.0
    } else {
        0.0
    };
    let expiring_term = if current_stock > 0 {
        units_expiring_20d as f64 / current_stock as f64 * 30.0
    } else {
        0.0
    };
    let score = (waste_ratio * 0.4 + expired_term + expiring_term).round() as i64;
    score.clamp(0, 100)
}

pub fn compute_risk_metrics(
    batches: &[BatchSnapshot],
    total_units_wasted: i64,
    reference: NaiveDate,
) -> RiskMetrics {
    let total_units_loaded: i64 = batches.iter().map(|b| i64::from(b.quantity)).sum();
    let current_stock: i64 = batches.iter().map(|b| i64::from(b.quantity_remaining)).sum();

    let waste_ratio = if total_units_loaded > 0 {
        round1(total_units_wasted as f64 / total_units_loaded as f64 * 100.0)
    } else {
        0.0
    };

    let (units_expired, _) =
        units_in_status(batches, reference, RISK_WINDOW_DAYS, ExpiryStatus::Expired);
    let (units_expiring_20d, _) =
        units_in_status(batches, reference, RISK_WINDOW_DAYS, ExpiryStatus::Expiring);

    RiskMetrics {
        total_units_loaded,
        total_units_wasted,
        current_stock,
        waste_ratio,
        units_expired,
        units_expiring_20d,
        risk_score: risk_score(waste_ratio, units_expired, units_expiring_20d, current_stock),
    }
}

/// High-risk test: heavy historical waste, or a meaningful chunk of current
/// stock about to expire.
pub fn is_high_risk(
    waste_ratio: f64,
    units_expiring: i64,
    total_remaining: i64,
    waste_threshold: f64,
) -> bool {
    let high_waste = waste_ratio >= waste_threshold;
    let expiring_soon = units_expiring >= 5
        || (total_remaining > 0 && units_expiring as f64 / total_remaining as f64 >= 0.3);
    high_waste || expiring_soon
}

/// Fleet aggregate for the dashboard. `avg_waste_ratio` is deliberately the
/// mean of per-product ratios, not total-wasted over total-loaded; the two
/// diverge under skewed product volumes and the mean is the canonical one.
pub fn dashboard_stats(fleet: &[RiskMetrics]) -> DashboardStats {
    let avg_waste_ratio = if fleet.is_empty() {
        0.0
    } else {
        round1(fleet.iter().map(|m| m.waste_ratio).sum::<f64>() / fleet.len() as f64)
    };

    DashboardStats {
        total_products: fleet.len(),
        total_wasted_units: fleet.iter().map(|m| m.total_units_wasted).sum(),
        avg_waste_ratio,
        high_risk_count: fleet
            .iter()
            .filter(|m| m.units_expired > 0 || m.risk_score >= 60)
            .count(),
        units_expired: fleet.iter().map(|m| m.units_expired).sum(),
        units_expiring_20d: fleet.iter().map(|m| m.units_expiring_20d).sum(),
    }
}

/// Groups waste-event quantities by calendar month, most recent first.
pub fn monthly_waste(events: &[(NaiveDate, i32)], months: usize) -> Vec<MonthlyWaste> {
    let mut by_month: BTreeMap<String, i64> = BTreeMap::new();
    for (date, quantity) in events {
        *by_month.entry(date.format("%Y-%m").to_string()).or_insert(0) += i64::from(*quantity);
    }
    by_month
        .into_iter()
        .rev()
        .take(months)
        .map(|(month, wasted)| MonthlyWaste { month, wasted })
        .collect()
}

/// Days from `reference` to the soonest future expiration with stock left.
pub fn days_to_next_expiry(batches: &[BatchSnapshot], reference: NaiveDate) -> Option<i64> {
    batches
        .iter()
        .filter(|b| b.quantity_remaining > 0 && b.expiration_date > reference)
        .map(|b| b.expiration_date)
        .min()
        .map(|next| (next - reference).num_days())
}

/// Units covered by the notification window, alongside the next-expiry gap.
pub fn expiring_within(batches: &[BatchSnapshot], reference: NaiveDate, window_days: u32) -> i64 {
    let window_end = reference
        .checked_add_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MAX);
    batches
        .iter()
        .filter(|b| {
            b.quantity_remaining > 0
                && b.expiration_date > reference
                && b.expiration_date <= window_end
        })
        .map(|b| i64::from(b.quantity_remaining))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn snap(quantity: i32, remaining: i32, exp: &str) -> BatchSnapshot {
        BatchSnapshot {
            quantity,
            quantity_remaining: remaining,
            expiration_date: d(exp),
        }
    }

    #[test]
    fn product_metrics_basic_accounting() {
        let batches = vec![
            snap(30, 10, "2026-03-01"),
            snap(20, 0, "2026-01-01"),
            snap(10, 10, "2026-01-20"),
        ];
        let mut waste = WasteByReason::default();
        waste.add("expired", 8);
        waste.add("damaged", 2);

        let m = compute_product_metrics(&batches, &waste, d("2026-01-15"), 30);

        assert_eq!(m.total_purchased, 60);
        assert_eq!(m.total_remaining, 20);
        assert_eq!(m.total_sold, 40);
        assert_eq!(m.total_wasted, 10);
        assert_eq!(m.sold_percentage, 66.7);
        assert_eq!(m.waste_percentage, 16.7);
        // 2026-01-20 is within the 30-day window; 2026-01-01 is empty.
        assert_eq!(m.units_expiring, 10);
        assert_eq!(m.units_expired, 0);
        assert_eq!(m.expiring_batch_count, 1);
        assert_eq!(m.expired_batch_count, 0);
    }

    #[test]
    fn zero_purchases_give_zero_percentages() {
        let m = compute_product_metrics(&[], &WasteByReason::default(), d("2026-01-15"), 30);
        assert_eq!(m.sold_percentage, 0.0);
        assert_eq!(m.waste_percentage, 0.0);
    }

    #[test]
    fn risk_score_formula() {
        // waste_ratio 10, half the stock expired, none expiring:
        // 10*0.4 + 0.5*30 + 0 = 19
        assert_eq!(risk_score(10.0, 5, 0, 10), 19);
        // Empty shelf: only the waste term contributes.
        assert_eq!(risk_score(25.0, 0, 0, 0), 10);
        // Everything bad saturates at 100.
        assert_eq!(risk_score(100.0, 10, 10, 10), 100);
        assert_eq!(risk_score(0.0, 0, 0, 100), 0);
    }

    #[test]
    fn risk_metrics_uses_the_20_day_window() {
        let batches = vec![
            snap(10, 5, "2026-02-01"), // 17 days out: inside
            snap(10, 4, "2026-02-10"), // 26 days out: outside
            snap(10, 3, "2026-01-10"), // expired
        ];
        let m = compute_risk_metrics(&batches, 6, d("2026-01-15"));

        assert_eq!(m.total_units_loaded, 30);
        assert_eq!(m.current_stock, 12);
        assert_eq!(m.waste_ratio, 20.0);
        assert_eq!(m.units_expired, 3);
        assert_eq!(m.units_expiring_20d, 5);
        // 20*0.4 + 3/12*30 + 5/12*30 = 8 + 7.5 + 12.5 = 28
        assert_eq!(m.risk_score, 28);
    }

    #[test]
    fn high_risk_rules() {
        assert!(is_high_risk(25.0, 0, 100, 20.0)); // waste ratio alone
        assert!(is_high_risk(0.0, 5, 100, 20.0)); // absolute expiring floor
        assert!(is_high_risk(0.0, 3, 10, 20.0)); // 30% of remaining
        assert!(!is_high_risk(10.0, 2, 100, 20.0));
    }

    #[test]
    fn dashboard_uses_mean_of_ratios() {
        let fleet = vec![
            RiskMetrics {
                total_units_loaded: 1000,
                total_units_wasted: 10,
                current_stock: 990,
                waste_ratio: 1.0,
                units_expired: 0,
                units_expiring_20d: 0,
                risk_score: 0,
            },
            RiskMetrics {
                total_units_loaded: 10,
                total_units_wasted: 5,
                current_stock: 5,
                waste_ratio: 50.0,
                units_expired: 2,
                units_expiring_20d: 0,
                risk_score: 70,
            },
        ];
        let stats = dashboard_stats(&fleet);

        // Mean of ratios (25.5), not 15/1010.
        assert_eq!(stats.avg_waste_ratio, 25.5);
        assert_eq!(stats.total_wasted_units, 15);
        assert_eq!(stats.high_risk_count, 1);
        assert_eq!(stats.units_expired, 2);
    }

    #[test]
    fn monthly_waste_groups_and_orders() {
        let events = vec![
            (d("2026-01-03"), 2),
            (d("2026-01-20"), 3),
            (d("2025-12-10"), 4),
            (d("2025-10-01"), 1),
        ];
        let trends = monthly_waste(&events, 2);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].month, "2026-01");
        assert_eq!(trends[0].wasted, 5);
        assert_eq!(trends[1].month, "2025-12");
        assert_eq!(trends[1].wasted, 4);
    }

    #[test]
    fn next_expiry_ignores_past_and_empty_batches() {
        let batches = vec![
            snap(10, 0, "2026-01-20"),
            snap(10, 2, "2026-01-10"),
            snap(10, 2, "2026-02-01"),
        ];
        assert_eq!(days_to_next_expiry(&batches, d("2026-01-15")), Some(17));
        assert_eq!(days_to_next_expiry(&[], d("2026-01-15")), None);
    }

    #[test]
    fn expiring_window_sums_units() {
        let batches = vec![
            snap(10, 4, "2026-02-01"),
            snap(10, 6, "2026-03-01"),
            snap(10, 9, "2026-01-01"),
        ];
        assert_eq!(expiring_within(&batches, d("2026-01-15"), 30), 4);
    }
}
