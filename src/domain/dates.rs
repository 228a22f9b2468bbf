// src/domain/dates.rs
//
// Expiration-date extraction from OCR text. Pharmacy packaging prints dates
// in a handful of shapes (DD/MM/YYYY, MM/YYYY, YYYY-MM-DD, MMYY, and
// "VENC"/"EXP"-prefixed variants); OCR output also confuses O/0 and l/1.
// Month-only dates resolve to the first of the month.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Accepted operating window for expiration years. OCR misreads outside this
/// range are rejected rather than recorded.
const MIN_YEAR: i32 = 2020;
const MAX_YEAR: i32 = 2040;

enum Shape {
    DayMonthYear,
    MonthYear,
    YearMonthDay,
    MonthYearNoSep,
    Prefixed,
}

static PATTERNS: Lazy<Vec<(Regex, Shape)>> = Lazy::new(|| {
    vec![
        // DD/MM/YYYY or DD-MM-YY
        (
            Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{4}|\d{2})").unwrap(),
            Shape::DayMonthYear,
        ),
        // MM/YYYY
        (Regex::new(r"(\d{1,2})[/\-](\d{4})").unwrap(), Shape::MonthYear),
        // YYYY-MM-DD
        (
            Regex::new(r"(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})").unwrap(),
            Shape::YearMonthDay,
        ),
        // MMYYYY or MMYY, common on blister packs
        (Regex::new(r"(\d{2})(\d{4}|\d{2})").unwrap(), Shape::MonthYearNoSep),
        // VENC/EXP/VTO/CAD followed by a date
        (
            Regex::new(r"(?i)(?:venc|exp|vto|cad)[:\s]*(\d{1,2})[/\-]?(\d{1,2})?[/\-]?(\d{2,4})").unwrap(),
            Shape::Prefixed,
        ),
    ]
});

/// Two-digit years pivot at 50: 51-99 land in the 1900s (and will fail the
/// year window), 00-50 in the 2000s.
fn expand_year(year: i32) -> i32 {
    if year < 100 {
        if year > 50 {
            1900 + year
        } else {
            2000 + year
        }
    } else {
        year
    }
}

/// Extracts the first plausible expiration date from OCR text.
///
/// Patterns are tried in order; a match that fails the sanity checks (month
/// 1-12, year window, real calendar day) falls through to the next pattern.
pub fn parse_expiration_text(text: &str) -> Option<NaiveDate> {
    let clean: String = text
        .chars()
        .map(|c| match c {
            'o' | 'O' => '0',
            'l' | 'I' => '1',
            other => other,
        })
        .collect();

    for (regex, shape) in PATTERNS.iter() {
        let Some(caps) = regex.captures(&clean) else {
            continue;
        };

        let group = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());

        let (day, month, year) = match shape {
            Shape::DayMonthYear => (group(1)?, group(2)?, group(3)?),
            Shape::MonthYear | Shape::MonthYearNoSep => (1, group(1)?, group(2)?),
            Shape::YearMonthDay => (group(3)?, group(2)?, group(1)?),
            Shape::Prefixed => match group(2) {
                Some(month) => (group(1)?, month, group(3)?),
                None => (1, group(1)?, group(3)?),
            },
        };

        let year = expand_year(year);
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            continue;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, month as u32, day as u32) {
            return Some(date);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn day_month_year_variants() {
        assert_eq!(parse_expiration_text("10/03/2026"), Some(d("2026-03-10")));
        assert_eq!(parse_expiration_text("10-03-2026"), Some(d("2026-03-10")));
        assert_eq!(parse_expiration_text("5/3/26"), Some(d("2026-03-05")));
    }

    #[test]
    fn month_year_resolves_to_first_of_month() {
        assert_eq!(parse_expiration_text("03/2027"), Some(d("2027-03-01")));
        // MMYY with no separator
        assert_eq!(parse_expiration_text("0927"), Some(d("2027-09-01")));
    }

    #[test]
    fn iso_dates() {
        assert_eq!(parse_expiration_text("2026-03-10"), Some(d("2026-03-10")));
    }

    #[test]
    fn venc_prefixed() {
        assert_eq!(parse_expiration_text("VENC: 10/03/2026"), Some(d("2026-03-10")));
        assert_eq!(parse_expiration_text("VENC 03/26"), Some(d("2026-03-01")));
        assert_eq!(parse_expiration_text("EXP 12/2028"), Some(d("2028-12-01")));
    }

    #[test]
    fn ocr_character_confusion_is_repaired() {
        assert_eq!(parse_expiration_text("1O/O3/2O26"), Some(d("2026-03-10")));
        assert_eq!(parse_expiration_text("l0/03/2026"), Some(d("2026-03-10")));
    }

    #[test]
    fn two_digit_year_pivot() {
        assert_eq!(parse_expiration_text("10/03/26"), Some(d("2026-03-10")));
        // 51-99 expand into the 1900s and fail the year window.
        assert_eq!(parse_expiration_text("10/03/99"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_expiration_text("LOT A4423"), None);
        assert_eq!(parse_expiration_text("13/2026"), None); // month 13
        assert_eq!(parse_expiration_text("10/03/2055"), None); // beyond window
        assert_eq!(parse_expiration_text(""), None);
    }

    #[test]
    fn impossible_day_falls_back_to_month_reading() {
        // The day/month/year reading fails the calendar check; the
        // month/year pattern still salvages a usable date.
        assert_eq!(parse_expiration_text("31/02/2026"), Some(d("2026-02-01")));
    }
}
