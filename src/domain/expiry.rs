// src/domain/expiry.rs
//
// Day-granularity expiration classification. All comparisons use NaiveDate
// (calendar dates, no time component) so local-midnight timezone drift can
// never flip a batch between buckets.

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Default "expiring soon" window in days.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 30;

/// User-configurable bounds for the threshold window.
pub const MIN_THRESHOLD_DAYS: u32 = 7;
pub const MAX_THRESHOLD_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Expired,
    Expiring,
    Valid,
}

/// Classifies an expiration date against a reference day.
///
/// Same-day counts as expired: a batch expiring today must not be sold.
pub fn classify(expiration_date: NaiveDate, reference: NaiveDate, threshold_days: u32) -> ExpiryStatus {
    if expiration_date <= reference {
        return ExpiryStatus::Expired;
    }
    let window_end = reference
        .checked_add_days(Days::new(u64::from(threshold_days)))
        .unwrap_or(NaiveDate::MAX);
    if expiration_date <= window_end {
        ExpiryStatus::Expiring
    } else {
        ExpiryStatus::Valid
    }
}

/// Classification for alerting: empty batches are history, never alerts.
pub fn alert_status(
    expiration_date: NaiveDate,
    quantity_remaining: i32,
    reference: NaiveDate,
    threshold_days: u32,
) -> Option<ExpiryStatus> {
    if quantity_remaining <= 0 {
        return None;
    }
    Some(classify(expiration_date, reference, threshold_days))
}

/// Clamps nothing: out-of-range windows are a caller error.
pub fn validate_threshold(days: u32) -> bool {
    (MIN_THRESHOLD_DAYS..=MAX_THRESHOLD_DAYS).contains(&days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn same_day_is_expired() {
        assert_eq!(
            classify(d("2026-01-15"), d("2026-01-15"), 30),
            ExpiryStatus::Expired
        );
    }

    #[test]
    fn day_before_reference_is_expired() {
        assert_eq!(
            classify(d("2026-01-14"), d("2026-01-15"), 30),
            ExpiryStatus::Expired
        );
    }

    #[test]
    fn inside_window_is_expiring() {
        assert_eq!(
            classify(d("2026-02-10"), d("2026-01-15"), 30),
            ExpiryStatus::Expiring
        );
        // Window boundary is inclusive
        assert_eq!(
            classify(d("2026-02-14"), d("2026-01-15"), 30),
            ExpiryStatus::Expiring
        );
    }

    #[test]
    fn beyond_window_is_valid() {
        assert_eq!(
            classify(d("2026-02-15"), d("2026-01-15"), 30),
            ExpiryStatus::Valid
        );
    }

    #[test]
    fn empty_batch_never_alerts() {
        assert_eq!(alert_status(d("2020-01-01"), 0, d("2026-01-15"), 30), None);
        assert_eq!(
            alert_status(d("2020-01-01"), 3, d("2026-01-15"), 30),
            Some(ExpiryStatus::Expired)
        );
    }

    #[test]
    fn threshold_bounds() {
        assert!(validate_threshold(7));
        assert!(validate_threshold(30));
        assert!(validate_threshold(90));
        assert!(!validate_threshold(6));
        assert!(!validate_threshold(91));
    }

    fn severity(s: ExpiryStatus) -> u8 {
        match s {
            ExpiryStatus::Valid => 0,
            ExpiryStatus::Expiring => 1,
            ExpiryStatus::Expired => 2,
        }
    }

    proptest! {
        // Moving the reference date forward never makes a batch less urgent.
        #[test]
        fn monotonic_in_reference_date(
            exp_off in 0u64..2000,
            ref_off in 0u64..2000,
            step in 0u64..400,
            threshold in 7u32..=90,
        ) {
            let base = d("2024-01-01");
            let expiration = base.checked_add_days(Days::new(exp_off)).unwrap();
            let earlier = base.checked_add_days(Days::new(ref_off)).unwrap();
            let later = earlier.checked_add_days(Days::new(step)).unwrap();

            let before = classify(expiration, earlier, threshold);
            let after = classify(expiration, later, threshold);
            prop_assert!(severity(after) >= severity(before));
        }
    }
}
