// src/domain/csv.rs
//
// Sales CSV parsing. The format is deliberately loose: comma or semicolon
// delimiters, optional header, and 2-column rows that default the sale date
// to the processing day. Parsing only shapes the text; row validation is a
// separate step so the importer can report per-row errors.

use chrono::NaiveDate;
use serde::Serialize;

/// A raw row as found in the file, fields trimmed but unvalidated.
#[derive(Debug, Clone, Serialize)]
pub struct RawSaleRow {
    pub barcode: String,
    pub quantity: String,
    pub date: String,
}

/// A row that passed validation and is ready for the sale processor.
#[derive(Debug, Clone)]
pub struct ValidSaleRow {
    pub barcode: String,
    pub quantity: i32,
    pub date: NaiveDate,
}

/// Splits CSV text into raw sale rows.
///
/// The first line is treated as a header when its lowercased content mentions
/// any of the expected column names. Rows with fewer than two fields are
/// dropped here; everything else is kept for per-row validation.
pub fn parse_csv(text: &str, today: NaiveDate) -> Vec<RawSaleRow> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let first = lines[0].to_lowercase();
    let has_header =
        first.contains("barcode") || first.contains("date") || first.contains("quantity");
    let start = usize::from(has_header);

    let mut rows = Vec::new();
    for line in &lines[start..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split([',', ';']).map(str::trim).collect();
        match parts.len() {
            0 | 1 => {}
            2 => rows.push(RawSaleRow {
                barcode: parts[0].to_string(),
                quantity: parts[1].to_string(),
                date: today.format("%Y-%m-%d").to_string(),
            }),
            _ => rows.push(RawSaleRow {
                barcode: parts[0].to_string(),
                quantity: parts[1].to_string(),
                date: parts[2].to_string(),
            }),
        }
    }
    rows
}

/// One rejected or degraded row of an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRowIssue {
    pub row: RawSaleRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Per-row import accounting. A row that processed with a warning still
/// counts toward `processed`; `success` holds iff no row produced a hard
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub success: bool,
    pub processed: usize,
    pub issues: Vec<ImportRowIssue>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self {
            success: true,
            processed: 0,
            issues: Vec::new(),
        }
    }

    pub fn row_processed(&mut self, row: RawSaleRow, warning: Option<String>) {
        self.processed += 1;
        if warning.is_some() {
            self.issues.push(ImportRowIssue { row, error: None, warning });
        }
    }

    pub fn row_failed(&mut self, row: RawSaleRow, error: String) {
        self.success = false;
        self.issues.push(ImportRowIssue {
            row,
            error: Some(error),
            warning: None,
        });
    }
}

impl Default for ImportReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates one raw row. Errors are messages for the per-row report.
pub fn validate_row(row: &RawSaleRow) -> Result<ValidSaleRow, String> {
    if row.barcode.is_empty() || row.quantity.is_empty() || row.date.is_empty() {
        return Err("Incomplete row: barcode, quantity and date are required".to_string());
    }

    let quantity: i32 = row
        .quantity
        .parse()
        .map_err(|_| "Invalid quantity".to_string())?;
    if quantity <= 0 {
        return Err("Invalid quantity".to_string());
    }

    let date: NaiveDate = row
        .date
        .parse()
        .map_err(|_| format!("Invalid date: {}", row.date))?;

    Ok(ValidSaleRow {
        barcode: row.barcode.clone(),
        quantity,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        "2026-01-15".parse().unwrap()
    }

    #[test]
    fn parses_three_column_file_with_header() {
        let text = "barcode,quantity,date\n779123,2,2026-01-10\n779456,1,2026-01-11\n";
        let rows = parse_csv(text, today());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].barcode, "779123");
        assert_eq!(rows[0].quantity, "2");
        assert_eq!(rows[0].date, "2026-01-10");
    }

    #[test]
    fn headerless_file_keeps_first_line() {
        let rows = parse_csv("779123,2,2026-01-10", today());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn semicolons_and_padding_are_tolerated() {
        let rows = parse_csv("779123 ; 2 ; 2026-01-10", today());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].barcode, "779123");
        assert_eq!(rows[0].date, "2026-01-10");
    }

    #[test]
    fn two_columns_default_to_processing_day() {
        let rows = parse_csv("779123,2", today());
        assert_eq!(rows[0].date, "2026-01-15");
    }

    #[test]
    fn blank_lines_and_single_fields_are_skipped() {
        let rows = parse_csv("779123,2,2026-01-10\n\njust-one-field\n", today());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn validation_catches_bad_rows() {
        let ok = validate_row(&RawSaleRow {
            barcode: "779123".into(),
            quantity: "3".into(),
            date: "2026-01-10".into(),
        })
        .unwrap();
        assert_eq!(ok.quantity, 3);

        assert!(validate_row(&RawSaleRow {
            barcode: "".into(),
            quantity: "3".into(),
            date: "2026-01-10".into(),
        })
        .is_err());

        assert!(validate_row(&RawSaleRow {
            barcode: "779123".into(),
            quantity: "0".into(),
            date: "2026-01-10".into(),
        })
        .is_err());

        assert!(validate_row(&RawSaleRow {
            barcode: "779123".into(),
            quantity: "two".into(),
            date: "2026-01-10".into(),
        })
        .is_err());

        assert!(validate_row(&RawSaleRow {
            barcode: "779123".into(),
            quantity: "2".into(),
            date: "not-a-date".into(),
        })
        .is_err());
    }

    fn raw(barcode: &str, quantity: &str, date: &str) -> RawSaleRow {
        RawSaleRow {
            barcode: barcode.into(),
            quantity: quantity.into(),
            date: date.into(),
        }
    }

    #[test]
    fn warnings_still_count_as_processed() {
        let mut report = ImportReport::new();
        report.row_processed(raw("779123", "2", "2026-01-10"), None);
        report.row_processed(
            raw("779456", "9", "2026-01-10"),
            Some("Insufficient stock: 4 of 9 units deducted, 5 short".into()),
        );

        assert!(report.success);
        assert_eq!(report.processed, 2);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].error.is_none());
        assert!(report.issues[0].warning.is_some());
    }

    #[test]
    fn hard_errors_flip_success_and_never_count() {
        let mut report = ImportReport::new();
        report.row_processed(raw("779123", "2", "2026-01-10"), None);
        report.row_failed(raw("", "2", "2026-01-10"), "Incomplete row".into());

        assert!(!report.success);
        assert_eq!(report.processed, 1);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].error.as_deref(), Some("Incomplete row"));
    }

    #[test]
    fn clean_header_file_processes_every_data_row() {
        let text = "barcode,quantity,date\n\
                    779123,2,2026-01-10\n\
                    779456,1,2026-01-11\n\
                    779789,4,2026-01-12\n";

        let mut report = ImportReport::new();
        for row in parse_csv(text, today()) {
            match validate_row(&row) {
                Ok(_) => report.row_processed(row, None),
                Err(e) => report.row_failed(row, e),
            }
        }

        assert!(report.success);
        assert_eq!(report.processed, 3);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn mixed_file_accounting() {
        let text = "barcode,quantity,date\n\
                    779123,2,2026-01-10\n\
                    779456,zero,2026-01-11\n\
                    779789,4\n";

        let mut report = ImportReport::new();
        for row in parse_csv(text, today()) {
            match validate_row(&row) {
                Ok(_) => report.row_processed(row, None),
                Err(e) => report.row_failed(row, e),
            }
        }

        assert!(!report.success);
        assert_eq!(report.processed, 2);
        assert_eq!(report.issues.len(), 1);
    }
}
