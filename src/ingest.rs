//! Transaction table loading.
//!
//! Reads shipment records from CSV or JSON files into a [`TransactionTable`].
//! Country codes are kept literally: `NA` is Namibia, not a missing value.
//! Only empty cells (or JSON `null`) count as missing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

/// One shipment between two countries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRecord {
    #[serde(alias = "Year")]
    pub year: Option<i32>,
    #[serde(alias = "Importer")]
    pub importer: Option<String>,
    #[serde(alias = "Exporter")]
    pub exporter: Option<String>,
    #[serde(alias = "Importer reported quantity")]
    pub importer_quantity: Option<f64>,
    #[serde(alias = "Exporter reported quantity")]
    pub exporter_quantity: Option<f64>,
    #[serde(alias = "Term")]
    pub term: Option<String>,
    #[serde(alias = "Unit")]
    pub unit: Option<String>,
}

impl TransactionRecord {
    /// Record with only the trade partners set
    pub fn new(importer: &str, exporter: &str) -> Self {
        Self {
            importer: Some(importer.to_string()),
            exporter: Some(exporter.to_string()),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

/// Ordered, read-only sequence of transaction rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionTable {
    rows: Vec<TransactionRecord>,
}

impl TransactionTable {
    pub fn new(rows: Vec<TransactionRecord>) -> Self {
        Self { rows }
    }

    /// Build a table from (importer, exporter) pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        pairs
            .iter()
            .map(|(importer, exporter)| TransactionRecord::new(importer, exporter))
            .collect()
    }

    pub fn rows(&self) -> &[TransactionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<TransactionRecord> for TransactionTable {
    fn from_iter<I: IntoIterator<Item = TransactionRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Load a transaction table, choosing the format from the file extension
pub fn load_transactions(path: &Path) -> Result<TransactionTable> {
    log::info!("Loading transactions from {}", path.display());

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions from {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => parse_csv(&content)
            .with_context(|| format!("Failed to parse CSV {}", path.display()))?,
        Some("json") => parse_json(&content)
            .with_context(|| format!("Failed to parse JSON {}", path.display()))?,
        _ => bail!(
            "Unsupported transaction file '{}': expected a .csv or .json extension",
            path.display()
        ),
    };

    log::info!("Loaded {} transactions", table.len());
    Ok(table)
}

/// Parse a JSON array of transaction records
pub fn parse_json(content: &str) -> Result<TransactionTable> {
    let rows: Vec<TransactionRecord> =
        serde_json::from_str(content).context("Transaction JSON must be an array of records")?;
    Ok(TransactionTable::new(rows))
}

/// Column roles recognised in a CSV header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Year,
    Importer,
    Exporter,
    ImporterQuantity,
    ExporterQuantity,
    Term,
    Unit,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        // Spreadsheet exports may prefix the first header with a byte-order mark
        match name.trim_start_matches('\u{feff}').trim().to_ascii_lowercase().as_str() {
            "year" => Some(Column::Year),
            "importer" => Some(Column::Importer),
            "exporter" => Some(Column::Exporter),
            "importer reported quantity" => Some(Column::ImporterQuantity),
            "exporter reported quantity" => Some(Column::ExporterQuantity),
            "term" => Some(Column::Term),
            "unit" => Some(Column::Unit),
            _ => None,
        }
    }
}

/// Parse CSV text with a header row
pub fn parse_csv(content: &str) -> Result<TransactionTable> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: HashMap<Column, usize> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| Column::from_header(name).map(|col| (col, idx)))
        .collect();

    for required in [Column::Importer, Column::Exporter] {
        if !columns.contains_key(&required) {
            bail!("CSV header is missing the {:?} column", required);
        }
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);

        let cell = |col: Column| -> Option<String> {
            columns
                .get(&col)
                .and_then(|&idx| record.get(idx))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        rows.push(TransactionRecord {
            year: parse_number(cell(Column::Year), "year", line),
            importer: cell(Column::Importer),
            exporter: cell(Column::Exporter),
            importer_quantity: parse_number(cell(Column::ImporterQuantity), "importer quantity", line),
            exporter_quantity: parse_number(cell(Column::ExporterQuantity), "exporter quantity", line),
            term: cell(Column::Term),
            unit: cell(Column::Unit),
        });
    }

    Ok(TransactionTable::new(rows))
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, what: &str, line: u64) -> Option<T> {
    let value = value?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring unparseable {} '{}' on line {}", what, value, line);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_namibia_is_not_missing() {
        let csv = "Year,Importer,Exporter,Term\n2015,NA,ZA,ivory\n2016,US,NA,tusks\n";
        let table = parse_csv(csv).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].importer.as_deref(), Some("NA"));
        assert_eq!(table.rows()[1].exporter.as_deref(), Some("NA"));
        assert_eq!(table.rows()[0].year, Some(2015));
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let csv = "Importer,Exporter,Year\n,CN,2014\nUS,,\n";
        let table = parse_csv(csv).unwrap();

        assert_eq!(table.rows()[0].importer, None);
        assert_eq!(table.rows()[0].exporter.as_deref(), Some("CN"));
        assert_eq!(table.rows()[1].exporter, None);
        assert_eq!(table.rows()[1].year, None);
    }

    #[test]
    fn test_quoted_fields_and_crlf() {
        let csv = "Importer,Exporter,Term\r\n\"US\",\"CN\",\"ivory, carved\"\r\n\"HK\",CN,\"say \"\"hi\"\"\"\r\n";
        let table = parse_csv(csv).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].term.as_deref(), Some("ivory, carved"));
        assert_eq!(table.rows()[1].importer.as_deref(), Some("HK"));
        assert_eq!(table.rows()[1].term.as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn test_quantities_and_extra_columns() {
        let csv = "App.,Importer,Exporter,Importer reported quantity,Exporter reported quantity,Unit\nI,US,CN,12.5,,kg\n";
        let table = parse_csv(csv).unwrap();

        let row = &table.rows()[0];
        assert_eq!(row.importer_quantity, Some(12.5));
        assert_eq!(row.exporter_quantity, None);
        assert_eq!(row.unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_missing_partner_column_is_rejected() {
        assert!(parse_csv("Year,Importer\n2015,US\n").is_err());
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_input() {
        let table = parse_csv("Importer,Exporter\n\"US,CN\n").unwrap();

        // The open quote swallows the delimiter, leaving the row without an exporter
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].exporter, None);
        assert!(table.rows()[0].importer.as_deref().unwrap().starts_with("US,CN"));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"Importer,Exporter\n\xff\xfe,CN\n").unwrap();
        assert!(load_transactions(file.path()).is_err());
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let table = parse_csv("\u{feff}Year,Importer,Exporter\n2015,NA,ZA\n").unwrap();
        assert_eq!(table.rows()[0].year, Some(2015));
        assert_eq!(table.rows()[0].importer.as_deref(), Some("NA"));

        let table = parse_csv("\u{feff}Importer,Exporter\nNA,ZA\n").unwrap();
        assert_eq!(table.rows()[0].exporter.as_deref(), Some("ZA"));
    }

    #[test]
    fn test_blank_lines_and_padding_are_skipped() {
        let table = parse_csv("Importer , Exporter\n\n  US , CN \n\nHK,CN\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].importer.as_deref(), Some("US"));
        assert_eq!(table.rows()[0].exporter.as_deref(), Some("CN"));
    }

    #[test]
    fn test_parse_json_keeps_codes_literal() {
        let json = r#"[
            {"Importer": "NA", "Exporter": "BW", "Year": 2012},
            {"importer": "US", "exporter": null}
        ]"#;
        let table = parse_json(json).unwrap();

        assert_eq!(table.rows()[0].importer.as_deref(), Some("NA"));
        assert_eq!(table.rows()[0].year, Some(2012));
        assert_eq!(table.rows()[1].exporter, None);
    }

    #[test]
    fn test_load_transactions_by_extension() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "Importer,Exporter\nUS,CN\nCN,HK\n").unwrap();

        let table = load_transactions(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let mut other = Builder::new().suffix(".txt").tempfile().unwrap();
        write!(other, "Importer,Exporter\n").unwrap();
        assert!(load_transactions(other.path()).is_err());
    }
}
