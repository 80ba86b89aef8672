// 📥 Export Loader - encoding-tolerant CSV ingestion
// Decodes the raw point-of-sale export and parses it into untyped rows

use anyhow::{Context, Result};
use serde::Deserialize;
use std::borrow::Cow;

// ============================================================================
// CANDIDATE ENCODINGS
// ============================================================================

/// Encodings the source system has been seen exporting with.
///
/// Tried strictly in this order; the first decode without errors wins.
/// Latin-1 e ISO-8859-1 son el mismo mapa de bytes, ambos quedan en la lista
/// porque el sistema de origen los anuncia por separado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
    Iso8859_1,
    Windows1252,
}

impl SourceEncoding {
    pub const CANDIDATES: [SourceEncoding; 4] = [
        SourceEncoding::Utf8,
        SourceEncoding::Latin1,
        SourceEncoding::Iso8859_1,
        SourceEncoding::Windows1252,
    ];

    /// Label for logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Latin1 => "latin-1",
            SourceEncoding::Iso8859_1 => "iso-8859-1",
            SourceEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decode bytes with this encoding, or None on a decode error.
    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            SourceEncoding::Utf8 => {
                let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
                if had_errors {
                    None
                } else {
                    Some(text)
                }
            }
            // Single-byte identity mapping, total over all byte values
            SourceEncoding::Latin1 | SourceEncoding::Iso8859_1 => {
                Some(encoding_rs::mem::decode_latin1(bytes))
            }
            SourceEncoding::Windows1252 => {
                let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
                if had_errors {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

/// Try every candidate encoding in priority order.
pub fn decode_bytes(bytes: &[u8]) -> Option<(Cow<'_, str>, SourceEncoding)> {
    for encoding in SourceEncoding::CANDIDATES {
        if let Some(text) = encoding.decode(bytes) {
            return Some((text, encoding));
        }
        tracing::debug!(encoding = encoding.label(), "decode attempt failed");
    }
    None
}

// ============================================================================
// RAW ROWS
// ============================================================================

/// One source row before any typing or validation.
///
/// Every column is optional text: the export interleaves data rows with
/// summary rows ("Total ...") and blank separators, and the csv reader turns
/// empty fields into None.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Type", default)]
    pub tx_type: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "Item", default)]
    pub item: Option<String>,

    #[serde(rename = "Date", default)]
    pub date: Option<String>,

    #[serde(rename = "Qty", default)]
    pub qty: Option<String>,

    #[serde(rename = "Sales Price", default)]
    pub sales_price: Option<String>,

    #[serde(rename = "Amount", default)]
    pub amount: Option<String>,

    #[serde(rename = "Balance", default)]
    pub balance: Option<String>,
}

/// Untyped table parsed from the export bytes.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
    /// Encoding that decoded the file
    pub encoding: SourceEncoding,
    /// Rows the csv reader could not turn into a RawRow
    pub skipped_rows: usize,
}

/// Parse export bytes into an untyped table.
///
/// Pure transform: the caller owns file access. Fails when no candidate
/// encoding decodes the bytes or the text has no parsable CSV structure.
pub fn parse_bytes(bytes: &[u8]) -> Result<RawTable> {
    let (text, encoding) = decode_bytes(bytes)
        .context("no candidate encoding decoded the file")?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    // Header row must be readable for column lookup to mean anything
    reader
        .headers()
        .context("failed to read CSV header row")?;

    let mut rows = Vec::new();
    let mut skipped_rows = 0usize;

    for (line, result) in reader.deserialize::<RawRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                // Malformed row: recovered locally by exclusion
                tracing::debug!(line = line + 2, error = %err, "skipping unparsable row");
                skipped_rows += 1;
            }
        }
    }

    tracing::debug!(
        rows = rows.len(),
        skipped = skipped_rows,
        encoding = encoding.label(),
        "parsed raw export"
    );

    Ok(RawTable {
        rows,
        encoding,
        skipped_rows,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Type,Date,Name,Item,Qty,Sales Price,Amount,Balance\n";

    #[test]
    fn test_parses_utf8_export() {
        let data = format!(
            "{HEADER}Sales Receipt,25/03/2025,pulperia lópez,Agua en bolsa,10,5.00,50.00,0.00\n"
        );
        let table = parse_bytes(data.as_bytes()).unwrap();

        assert_eq!(table.encoding, SourceEncoding::Utf8);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].name.as_deref(), Some("pulperia lópez"));
        assert_eq!(table.rows[0].amount.as_deref(), Some("50.00"));
    }

    #[test]
    fn test_falls_back_to_latin1() {
        // "JOSÉ" with É as the single byte 0xC9, invalid as UTF-8
        let mut data = Vec::new();
        data.extend_from_slice(HEADER.as_bytes());
        data.extend_from_slice(b"Invoice,01/02/2025,JOS\xC9,Hielo,1,20.00,20.00,\n");

        let table = parse_bytes(&data).unwrap();

        assert_eq!(table.encoding, SourceEncoding::Latin1);
        assert_eq!(table.rows[0].name.as_deref(), Some("JOSÉ"));
    }

    #[test]
    fn test_utf8_wins_over_latin1_for_valid_utf8() {
        let data = format!("{HEADER}Invoice,01/02/2025,JOSÉ,Hielo,1,20.00,20.00,\n");
        let table = parse_bytes(data.as_bytes()).unwrap();

        assert_eq!(table.encoding, SourceEncoding::Utf8);
        assert_eq!(table.rows[0].name.as_deref(), Some("JOSÉ"));
    }

    #[test]
    fn test_empty_fields_become_none() {
        let data = format!("{HEADER},,,,,,,\n");
        let table = parse_bytes(data.as_bytes()).unwrap();

        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert!(row.tx_type.is_none());
        assert!(row.name.is_none());
        assert!(row.amount.is_none());
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        // Summary rows in the export often carry fewer columns
        let data = format!("{HEADER}Total Sales\n");
        let table = parse_bytes(data.as_bytes()).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].tx_type.as_deref(), Some("Total Sales"));
        assert!(table.rows[0].date.is_none());
    }

    #[test]
    fn test_candidate_order_is_fixed() {
        let labels: Vec<&str> = SourceEncoding::CANDIDATES
            .iter()
            .map(|e| e.label())
            .collect();
        assert_eq!(labels, ["utf-8", "latin-1", "iso-8859-1", "windows-1252"]);
    }
}
