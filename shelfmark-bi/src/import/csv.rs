//! Goodreads CSV export parsing
//!
//! The export schema is a fixed external contract; an upload missing any
//! required column is rejected before a single row is processed.

use std::collections::HashMap;

use shelfmark_common::{Error, Result};

/// Columns the import pipeline reads
pub const REQUIRED_HEADERS: [&str; 8] = [
    "Title",
    "Author",
    "ISBN",
    "ISBN13",
    "My Rating",
    "Date Read",
    "Date Added",
    "Exclusive Shelf",
];

/// One data row, keyed by header name
#[derive(Debug, Clone)]
pub struct CsvRow {
    values: HashMap<String, String>,
}

impl CsvRow {
    /// Column value, empty string when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// JSON snapshot of the raw row for the issue log
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.values).unwrap_or_else(|_| String::from("{}"))
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Parse a Goodreads export, validating the required header set
pub fn parse_goodreads_csv(text: &str) -> Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("Unreadable CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::InvalidInput(format!("Unreadable CSV row: {}", e)))?;
        let values = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|field| field.to_string()))
            .collect();
        rows.push(CsvRow { values });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Title,Author,ISBN,ISBN13,My Rating,Date Read,Date Added,Exclusive Shelf";

    #[test]
    fn parses_rows_by_header() {
        let text = format!(
            "{}\nDune,Frank Herbert,\"=\"\"0441013593\"\"\",9780441013593,5,2020/03/15,2020/01/02,read\n",
            HEADER
        );
        let rows = parse_goodreads_csv(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Title"), "Dune");
        assert_eq!(rows[0].get("Exclusive Shelf"), "read");
        assert_eq!(rows[0].get("Nonexistent"), "");
    }

    #[test]
    fn rejects_missing_required_headers() {
        let err = parse_goodreads_csv("Title,Author\nDune,Frank Herbert\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ISBN13"));
        assert!(message.contains("Exclusive Shelf"));
    }

    #[test]
    fn empty_input_is_rejected_not_panicked() {
        // No header row at all: every required column is missing
        assert!(parse_goodreads_csv("").is_err());
    }
}
