// src/domain/suggestions.rs
//
// Rule engine turning a product's metrics into actionable suggestions. All
// applicable rules fire; one product can carry several suggestions at once.

use serde::Serialize;

use super::metrics::ProductMetrics;

/// How many suggestions the fleet-wide feed surfaces.
pub const FLEET_SUGGESTION_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    ReduceOrder,
    PrioritizeSale,
    OfferDiscount,
    RequestReturn,
    MarkExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub message: String,
    pub priority: Priority,
    pub icon: &'static str,
}

/// Evaluates the suggestion rules for one product.
pub fn generate_suggestions(m: &ProductMetrics) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if m.waste_percentage >= 30.0 {
        // Never suggest cutting an order by more than half.
        let reduction = (m.waste_percentage.round() as i64).min(50);
        suggestions.push(Suggestion {
            kind: SuggestionType::ReduceOrder,
            message: format!("Reduce next order by {reduction}%"),
            priority: Priority::High,
            icon: "📉",
        });
    } else if m.waste_percentage >= 15.0 {
        suggestions.push(Suggestion {
            kind: SuggestionType::ReduceOrder,
            message: "Consider reducing the next order".to_string(),
            priority: Priority::Medium,
            icon: "📉",
        });
    }

    if m.units_expiring > 0 {
        let heavy = m.units_expiring >= 10
            || (m.total_remaining > 0
                && m.units_expiring as f64 / m.total_remaining as f64 >= 0.5);
        if heavy {
            suggestions.push(Suggestion {
                kind: SuggestionType::PrioritizeSale,
                message: format!("Prioritize selling {} units nearing expiration", m.units_expiring),
                priority: Priority::High,
                icon: "📢",
            });
        } else {
            suggestions.push(Suggestion {
                kind: SuggestionType::PrioritizeSale,
                message: format!("{} units nearing expiration", m.units_expiring),
                priority: Priority::Medium,
                icon: "📢",
            });
        }
    }

    if m.units_expiring >= 5 && m.waste_percentage >= 10.0 {
        suggestions.push(Suggestion {
            kind: SuggestionType::OfferDiscount,
            message: "Offer a discount to speed up rotation".to_string(),
            priority: Priority::High,
            icon: "🏷️",
        });
    }

    if m.units_expired > 0 {
        suggestions.push(Suggestion {
            kind: SuggestionType::RequestReturn,
            message: format!("Request supplier return of {} expired units", m.units_expired),
            priority: Priority::High,
            icon: "↩️",
        });
        suggestions.push(Suggestion {
            kind: SuggestionType::MarkExpired,
            message: "Record expired units as waste for the history".to_string(),
            priority: Priority::Medium,
            icon: "📋",
        });
    }

    suggestions
}

/// Fleet feed ordering: high priority first, otherwise stable (insertion
/// order is the tie-break), capped for presentation.
pub fn rank_feed<T>(mut items: Vec<T>, priority: impl Fn(&T) -> Priority) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(priority(item)));
    items.truncate(FLEET_SUGGESTION_CAP);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::WasteByReason;

    fn metrics(
        waste_percentage: f64,
        units_expiring: i64,
        units_expired: i64,
        total_remaining: i64,
    ) -> ProductMetrics {
        ProductMetrics {
            total_purchased: 100,
            total_sold: 100 - total_remaining,
            total_remaining,
            total_wasted: 0,
            wasted_by_reason: WasteByReason::default(),
            sold_percentage: 0.0,
            waste_percentage,
            units_expiring,
            units_expired,
            expiring_batch_count: 0,
            expired_batch_count: 0,
        }
    }

    fn kinds(s: &[Suggestion]) -> Vec<(SuggestionType, Priority)> {
        s.iter().map(|s| (s.kind, s.priority)).collect()
    }

    #[test]
    fn high_waste_with_expired_units_fires_three_rules() {
        let s = generate_suggestions(&metrics(35.0, 0, 3, 50));
        let k = kinds(&s);

        assert!(k.contains(&(SuggestionType::ReduceOrder, Priority::High)));
        assert!(k.contains(&(SuggestionType::RequestReturn, Priority::High)));
        assert!(k.contains(&(SuggestionType::MarkExpired, Priority::Medium)));
    }

    #[test]
    fn reduce_order_caps_at_fifty_percent() {
        let s = generate_suggestions(&metrics(80.0, 0, 0, 50));
        assert_eq!(s.len(), 1);
        assert!(s[0].message.contains("50%"), "{}", s[0].message);
    }

    #[test]
    fn moderate_waste_is_medium_priority() {
        let s = generate_suggestions(&metrics(18.0, 0, 0, 50));
        assert_eq!(kinds(&s), vec![(SuggestionType::ReduceOrder, Priority::Medium)]);
    }

    #[test]
    fn expiring_thresholds() {
        // 10 units or half the shelf is urgent.
        let s = generate_suggestions(&metrics(0.0, 10, 0, 100));
        assert_eq!(kinds(&s), vec![(SuggestionType::PrioritizeSale, Priority::High)]);

        let s = generate_suggestions(&metrics(0.0, 3, 0, 6));
        assert_eq!(kinds(&s), vec![(SuggestionType::PrioritizeSale, Priority::High)]);

        let s = generate_suggestions(&metrics(0.0, 3, 0, 100));
        assert_eq!(kinds(&s), vec![(SuggestionType::PrioritizeSale, Priority::Medium)]);
    }

    #[test]
    fn discount_needs_expiring_stock_and_waste_history() {
        let s = generate_suggestions(&metrics(12.0, 6, 0, 100));
        let k = kinds(&s);
        assert!(k.contains(&(SuggestionType::OfferDiscount, Priority::High)));

        let s = generate_suggestions(&metrics(5.0, 6, 0, 100));
        assert!(!kinds(&s).contains(&(SuggestionType::OfferDiscount, Priority::High)));
    }

    #[test]
    fn clean_product_yields_nothing() {
        assert!(generate_suggestions(&metrics(0.0, 0, 0, 100)).is_empty());
    }

    #[test]
    fn fleet_ranking_is_stable_and_capped() {
        let mut all = Vec::new();
        for i in 0..8 {
            all.push(Suggestion {
                kind: SuggestionType::PrioritizeSale,
                message: format!("medium {i}"),
                priority: Priority::Medium,
                icon: "📢",
            });
        }
        for i in 0..4 {
            all.push(Suggestion {
                kind: SuggestionType::RequestReturn,
                message: format!("high {i}"),
                priority: Priority::High,
                icon: "↩️",
            });
        }

        let ranked = rank_feed(all, |s| s.priority);

        assert_eq!(ranked.len(), FLEET_SUGGESTION_CAP);
        assert!(ranked[..4].iter().all(|s| s.priority == Priority::High));
        // Stable within each priority band.
        assert_eq!(ranked[0].message, "high 0");
        assert_eq!(ranked[4].message, "medium 0");
        assert_eq!(ranked[5].message, "medium 1");
    }
}
