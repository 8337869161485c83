//! CSV dataset adapter.
//!
//! Loads the training dataset into memory as string columns. Only the
//! analytics service reads it; the inference pipeline never does.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

/// Cell spellings read as missing, as pandas' `read_csv` does by default.
pub const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a (trimmed) cell counts as missing.
#[must_use]
pub fn is_na(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

/// Error type for dataset operations.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no header row")]
    NoHeader,

    #[error("Missing column: {0}")]
    MissingColumn(String),
}

/// An in-memory CSV table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DatasetTable {
    /// Read a CSV file with a header row.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let table = Self::from_csv(reader)?;

        tracing::info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "Loaded dataset"
        );
        Ok(table)
    }

    /// Read CSV data with a header row from any reader.
    ///
    /// # Errors
    /// Returns error if a row is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(DatasetError::NoHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Column names, in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, top to bottom.
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingColumn`] if the header is absent.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, DatasetError> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Parse a column as numbers. Missing cells (see [`NA_VALUES`]) become
    /// `None`.
    ///
    /// Returns `None` if any other cell is not a number or the column has no
    /// values at all.
    #[must_use]
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let cells = self.column(name).ok()?;
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            if is_na(cell) {
                out.push(None);
            } else {
                out.push(Some(cell.parse::<f64>().ok()?));
            }
        }
        if out.iter().all(Option::is_none) {
            return None;
        }
        Some(out)
    }
}
