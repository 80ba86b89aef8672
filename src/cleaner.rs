// 🧹 Data Cleaner - summary-row filtering, type coercion, normalization
// Turns the untyped export rows into the typed table the metrics run on

use crate::loader::RawRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date layout of the source export (day/month/year)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Literal the source system writes into Type on summary rows
const SUMMARY_MARKER: &str = "Total";

// ============================================================================
// CLEAN RECORD
// ============================================================================

/// One validated transaction row.
///
/// Invariants: tx_type, name and item are non-empty, name is canonical
/// (trimmed + uppercased), date and amount parsed. Qty, sales price and
/// balance stay optional, the export leaves them blank on some line kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub tx_type: String,
    pub name: String,
    pub item: String,
    pub date: NaiveDate,
    pub qty: Option<f64>,
    pub sales_price: Option<f64>,
    pub amount: f64,
    pub balance: Option<f64>,
}

/// Drop accounting for one cleaning pass. Observability only, the data
/// contract is just the surviving records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub kept: usize,
    /// Summary rows and rows missing Type/Name/Item/Amount
    pub dropped_incomplete: usize,
    /// Rows whose Date or Amount failed coercion
    pub dropped_unparsable: usize,
}

impl CleanStats {
    pub fn dropped(&self) -> usize {
        self.dropped_incomplete + self.dropped_unparsable
    }
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

/// Canonical customer form: trimmed + uppercased.
/// Identical customers must never appear under varying case.
pub fn canonical_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn field_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn parse_number(value: &Option<String>) -> Option<f64> {
    value.as_deref()?.trim().parse::<f64>().ok()
}

fn parse_date(value: &Option<String>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.as_deref()?.trim(), DATE_FORMAT).ok()
}

// ============================================================================
// CLEANING
// ============================================================================

/// Validate and coerce a single raw row.
fn clean_row(raw: &RawRow) -> Result<CleanRecord, RowDrop> {
    // 1. Row filter: Type present and not a "Total" summary line,
    //    Name/Item/Amount present
    let tx_type = match raw.tx_type.as_deref() {
        Some(t) if !t.trim().is_empty() && !t.contains(SUMMARY_MARKER) => t.trim().to_string(),
        _ => return Err(RowDrop::Incomplete),
    };
    if !field_present(&raw.name) || !field_present(&raw.item) || !field_present(&raw.amount) {
        return Err(RowDrop::Incomplete);
    }

    // 2. Coercion: Date and Amount are required, the rest degrade to None
    let date = parse_date(&raw.date).ok_or(RowDrop::Unparsable)?;
    let amount = parse_number(&raw.amount).ok_or(RowDrop::Unparsable)?;

    // 3. Normalization
    let name = canonical_name(raw.name.as_deref().unwrap_or_default());
    let item = raw.item.as_deref().unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(RowDrop::Incomplete);
    }

    Ok(CleanRecord {
        tx_type,
        name,
        item,
        date,
        qty: parse_number(&raw.qty),
        sales_price: parse_number(&raw.sales_price),
        amount,
        balance: parse_number(&raw.balance),
    })
}

enum RowDrop {
    Incomplete,
    Unparsable,
}

/// Clean a raw table. Never fails: an export where every row is a summary
/// line yields an empty, valid table.
pub fn clean(rows: &[RawRow]) -> (Vec<CleanRecord>, CleanStats) {
    let mut records = Vec::with_capacity(rows.len());
    let mut stats = CleanStats::default();

    for raw in rows {
        match clean_row(raw) {
            Ok(record) => records.push(record),
            Err(RowDrop::Incomplete) => stats.dropped_incomplete += 1,
            Err(RowDrop::Unparsable) => stats.dropped_unparsable += 1,
        }
    }
    stats.kept = records.len();

    tracing::debug!(
        kept = stats.kept,
        dropped_incomplete = stats.dropped_incomplete,
        dropped_unparsable = stats.dropped_unparsable,
        "cleaned export rows"
    );

    (records, stats)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(
        tx_type: &str,
        date: &str,
        name: &str,
        item: &str,
        qty: &str,
        price: &str,
        amount: &str,
    ) -> RawRow {
        let opt = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        RawRow {
            tx_type: opt(tx_type),
            name: opt(name),
            item: opt(item),
            date: opt(date),
            qty: opt(qty),
            sales_price: opt(price),
            amount: opt(amount),
            balance: None,
        }
    }

    #[test]
    fn test_valid_row_is_kept_and_normalized() {
        let rows = vec![raw(
            "Sales Receipt",
            "25/03/2025",
            "  pulperia maría ",
            "  Agua en bolsa 500ml ",
            "10",
            "5.00",
            "50.00",
        )];
        let (records, stats) = clean(&rows);

        assert_eq!(stats.kept, 1);
        let r = &records[0];
        assert_eq!(r.name, "PULPERIA MARÍA");
        assert_eq!(r.item, "Agua en bolsa 500ml");
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 3, 25).unwrap());
        assert_eq!(r.amount, 50.0);
        assert_eq!(r.qty, Some(10.0));
    }

    #[test]
    fn test_total_summary_row_is_excluded() {
        // Summary rows are dropped even when every other field is valid
        let rows = vec![raw(
            "Total Sales",
            "25/03/2025",
            "CLIENTE",
            "Agua",
            "1",
            "5.00",
            "5.00",
        )];
        let (records, stats) = clean(&rows);

        assert!(records.is_empty());
        assert_eq!(stats.dropped_incomplete, 1);
    }

    #[test]
    fn test_missing_required_fields_drop_row() {
        let rows = vec![
            raw("", "25/03/2025", "CLIENTE", "Agua", "", "", "5.00"),
            raw("Invoice", "25/03/2025", "", "Agua", "", "", "5.00"),
            raw("Invoice", "25/03/2025", "CLIENTE", "", "", "", "5.00"),
            raw("Invoice", "25/03/2025", "CLIENTE", "Agua", "", "", ""),
        ];
        let (records, stats) = clean(&rows);

        assert!(records.is_empty());
        assert_eq!(stats.dropped_incomplete, 4);
    }

    #[test]
    fn test_invalid_calendar_date_drops_row() {
        let rows = vec![
            raw("Invoice", "31/02/2025", "CLIENTE", "Agua", "", "", "5.00"),
            raw("Invoice", "not a date", "CLIENTE", "Agua", "", "", "5.00"),
        ];
        let (records, stats) = clean(&rows);

        assert!(records.is_empty());
        assert_eq!(stats.dropped_unparsable, 2);
    }

    #[test]
    fn test_non_numeric_amount_drops_row() {
        let rows = vec![raw(
            "Invoice",
            "25/03/2025",
            "CLIENTE",
            "Agua",
            "",
            "",
            "n/a",
        )];
        let (records, stats) = clean(&rows);

        assert!(records.is_empty());
        assert_eq!(stats.dropped_unparsable, 1);
    }

    #[test]
    fn test_non_numeric_optional_fields_become_none() {
        let rows = vec![raw(
            "Invoice",
            "25/03/2025",
            "CLIENTE",
            "Agua",
            "diez",
            "gratis",
            "5.00",
        )];
        let (records, _) = clean(&rows);

        assert_eq!(records[0].qty, None);
        assert_eq!(records[0].sales_price, None);
        assert_eq!(records[0].amount, 5.0);
    }

    #[test]
    fn test_unpadded_dates_parse() {
        let rows = vec![raw("Invoice", "5/3/2025", "CLIENTE", "Agua", "", "", "5.00")];
        let (records, _) = clean(&rows);

        assert_eq!(
            records[0].date,
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_all_rows_dropped_is_valid_and_empty() {
        let rows = vec![raw("Total", "", "", "", "", "", "")];
        let (records, stats) = clean(&rows);

        assert!(records.is_empty());
        assert_eq!(stats.kept, 0);
        assert_eq!(stats.dropped(), 1);
    }

    #[test]
    fn test_recleaning_clean_values_is_a_noop() {
        let rows = vec![raw(
            "Sales Receipt",
            "25/03/2025",
            " pulperia lópez ",
            " Hielo 5lb ",
            "2",
            "20.00",
            "40.00",
        )];
        let (first, _) = clean(&rows);

        // Feed the cleaned values back through as raw text
        let again = vec![RawRow {
            tx_type: Some(first[0].tx_type.clone()),
            name: Some(first[0].name.clone()),
            item: Some(first[0].item.clone()),
            date: Some(first[0].date.format(DATE_FORMAT).to_string()),
            qty: first[0].qty.map(|v| v.to_string()),
            sales_price: first[0].sales_price.map(|v| v.to_string()),
            amount: Some(first[0].amount.to_string()),
            balance: None,
        }];
        let (second, _) = clean(&again);

        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_canonical_name_is_idempotent(s in "[A-Za-zÁÉÍÓÚÑáéíóúñ0-9 ]{0,24}") {
            let once = canonical_name(&s);
            prop_assert_eq!(canonical_name(&once), once.clone());
            // Canonical form never carries edge whitespace
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn prop_kept_plus_dropped_accounts_for_every_row(
            amounts in proptest::collection::vec(proptest::option::of(-1000.0..1000.0f64), 0..40)
        ) {
            let rows: Vec<RawRow> = amounts
                .iter()
                .map(|a| raw(
                    "Sales Receipt",
                    "01/06/2025",
                    "CLIENTE",
                    "Agua",
                    "",
                    "",
                    &a.map(|v| v.to_string()).unwrap_or_default(),
                ))
                .collect();
            let (records, stats) = clean(&rows);

            prop_assert_eq!(records.len(), stats.kept);
            prop_assert_eq!(stats.kept + stats.dropped(), rows.len());
        }
    }
}
