// src/domain/fifo.rs
//
// First-expiry-first-out deduction planning. The planner is pure: it takes a
// snapshot of a product's open batches and a requested quantity and produces
// the per-batch deductions. Persisting the plan (with the conditional
// decrements that make it safe under concurrent sales) is the handler's job.

use chrono::NaiveDate;
use serde::Serialize;

/// Snapshot of one batch as read inside the sale transaction.
#[derive(Debug, Clone)]
pub struct OpenBatch {
    pub id: i64,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub quantity_remaining: i32,
}

/// One batch's share of a sale.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeduction {
    pub batch_id: i64,
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub deducted: i32,
    pub remaining_after: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeductionPlan {
    pub requested: i32,
    pub deducted: i32,
    /// Units that could not be covered by available stock.
    pub shortfall: i32,
    pub deductions: Vec<BatchDeduction>,
}

impl DeductionPlan {
    pub fn warning(&self) -> Option<String> {
        if self.shortfall > 0 {
            Some(format!(
                "Insufficient stock: {} of {} units deducted, {} short",
                self.deducted, self.requested, self.shortfall
            ))
        } else {
            None
        }
    }
}

/// Plans a FIFO deduction of `quantity` units across `batches`.
///
/// Batches are consumed in ascending expiration order, ties broken by id so
/// the plan is deterministic. Never plans below zero; a shortfall is reported
/// rather than over-deducted.
pub fn plan_deduction(mut batches: Vec<OpenBatch>, quantity: i32) -> DeductionPlan {
    batches.sort_by(|a, b| {
        a.expiration_date
            .cmp(&b.expiration_date)
            .then(a.id.cmp(&b.id))
    });

    let mut needed = quantity.max(0);
    let mut deductions = Vec::new();

    for batch in &batches {
        if needed == 0 {
            break;
        }
        if batch.quantity_remaining <= 0 {
            continue;
        }
        let take = needed.min(batch.quantity_remaining);
        deductions.push(BatchDeduction {
            batch_id: batch.id,
            lot_number: batch.lot_number.clone(),
            expiration_date: batch.expiration_date,
            deducted: take,
            remaining_after: batch.quantity_remaining - take,
        });
        needed -= take;
    }

    DeductionPlan {
        requested: quantity,
        deducted: quantity.max(0) - needed,
        shortfall: needed,
        deductions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn batch(id: i64, exp: &str, remaining: i32) -> OpenBatch {
        OpenBatch {
            id,
            lot_number: format!("L{id}"),
            expiration_date: exp.parse().unwrap(),
            quantity_remaining: remaining,
        }
    }

    #[test]
    fn deducts_from_soonest_expiration_first() {
        let batches = vec![batch(2, "2026-02-01", 10), batch(1, "2026-01-10", 5)];
        let plan = plan_deduction(batches, 8);

        assert_eq!(plan.deducted, 8);
        assert_eq!(plan.shortfall, 0);
        assert!(plan.warning().is_none());
        assert_eq!(plan.deductions.len(), 2);
        assert_eq!(plan.deductions[0].batch_id, 1);
        assert_eq!(plan.deductions[0].deducted, 5);
        assert_eq!(plan.deductions[0].remaining_after, 0);
        assert_eq!(plan.deductions[1].batch_id, 2);
        assert_eq!(plan.deductions[1].deducted, 3);
        assert_eq!(plan.deductions[1].remaining_after, 7);
    }

    #[test]
    fn shortfall_drains_everything_and_warns() {
        let batches = vec![batch(1, "2026-01-10", 5), batch(2, "2026-02-01", 10)];
        let plan = plan_deduction(batches, 20);

        assert_eq!(plan.deducted, 15);
        assert_eq!(plan.shortfall, 5);
        assert!(plan.deductions.iter().all(|d| d.remaining_after == 0));
        let warning = plan.warning().unwrap();
        assert!(warning.contains("5 short"), "{warning}");
    }

    #[test]
    fn expiration_ties_break_by_id() {
        let batches = vec![batch(7, "2026-03-01", 4), batch(3, "2026-03-01", 4)];
        let plan = plan_deduction(batches, 6);

        assert_eq!(plan.deductions[0].batch_id, 3);
        assert_eq!(plan.deductions[0].deducted, 4);
        assert_eq!(plan.deductions[1].batch_id, 7);
        assert_eq!(plan.deductions[1].deducted, 2);
    }

    #[test]
    fn exact_fit_touches_no_later_batch() {
        let batches = vec![batch(1, "2026-01-10", 5), batch(2, "2026-02-01", 10)];
        let plan = plan_deduction(batches, 5);

        assert_eq!(plan.deductions.len(), 1);
        assert_eq!(plan.deductions[0].batch_id, 1);
    }

    #[test]
    fn empty_batches_are_skipped() {
        let batches = vec![batch(1, "2026-01-10", 0), batch(2, "2026-02-01", 3)];
        let plan = plan_deduction(batches, 2);

        assert_eq!(plan.deductions.len(), 1);
        assert_eq!(plan.deductions[0].batch_id, 2);
    }

    #[test]
    fn no_stock_at_all() {
        let plan = plan_deduction(vec![], 4);
        assert_eq!(plan.deducted, 0);
        assert_eq!(plan.shortfall, 4);
        assert!(plan.deductions.is_empty());
    }

    prop_compose! {
        fn arb_batches()(specs in prop::collection::vec((1i64..1000, 0u64..1500, 0i32..50), 0..12)) -> Vec<OpenBatch> {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (id, exp_off, remaining))| OpenBatch {
                    // Distinct ids keep the tie-break deterministic.
                    id: id * 1000 + i as i64,
                    lot_number: format!("L{i}"),
                    expiration_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .checked_add_days(chrono::Days::new(exp_off))
                        .unwrap(),
                    quantity_remaining: remaining,
                })
                .collect()
        }
    }

    proptest! {
        #[test]
        fn conserves_quantity_and_never_goes_negative(
            batches in arb_batches(),
            qty in 0i32..500,
        ) {
            let available: i32 = batches.iter().map(|b| b.quantity_remaining.max(0)).sum();
            let plan = plan_deduction(batches, qty);

            let total: i32 = plan.deductions.iter().map(|d| d.deducted).sum();
            prop_assert_eq!(total, plan.deducted);
            prop_assert_eq!(plan.deducted + plan.shortfall, qty);
            prop_assert_eq!(plan.deducted, qty.min(available));
            prop_assert!(plan.deductions.iter().all(|d| d.remaining_after >= 0));
            prop_assert!(plan.deductions.iter().all(|d| d.deducted > 0));
        }

        #[test]
        fn consumes_in_nondecreasing_expiration_order(
            batches in arb_batches(),
            qty in 1i32..500,
        ) {
            let plan = plan_deduction(batches.clone(), qty);

            for pair in plan.deductions.windows(2) {
                prop_assert!(pair[0].expiration_date <= pair[1].expiration_date);
            }
            // A later batch is only touched once every earlier one is drained.
            for d in &plan.deductions[..plan.deductions.len().saturating_sub(1)] {
                prop_assert_eq!(d.remaining_after, 0);
            }
        }
    }
}
