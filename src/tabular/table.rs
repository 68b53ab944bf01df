use csv::ReaderBuilder;
use serde::Serialize;
use serde_json::{Map, Value};

use super::cell::Cell;
use crate::error::AppError;

pub const MIN_COLUMNS: usize = 5;
pub const MIN_NUMERIC_COLUMNS: usize = 5;

/// A parsed CSV: unique header names plus rows padded to the header width.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// What upload validation reports about an accepted file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub row_count: usize,
}

impl Table {
    pub fn parse(bytes: &[u8]) -> Result<Self, AppError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| AppError::MalformedCsv(e.to_string()))?
            .clone();
        let columns = unique_headers(headers.iter());
        let width = columns.len();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| AppError::MalformedCsv(e.to_string()))?;
            if record.len() > width {
                return Err(AppError::MalformedCsv(format!(
                    "row {} has {} fields, header has {}",
                    index + 1,
                    record.len(),
                    width
                )));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = Cell<'_>> + '_ {
        self.rows.iter().map(move |row| Cell::classify(&row[index]))
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell<'_> {
        Cell::classify(&self.rows[row][column])
    }

    /// A column is numeric when it has at least one number and nothing but
    /// numbers among its non-missing cells.
    pub fn is_numeric(&self, index: usize) -> bool {
        let mut seen_number = false;
        for cell in self.column(index) {
            match cell {
                Cell::Number(_) => seen_number = true,
                Cell::Missing => {}
                Cell::Text(_) => return false,
            }
        }
        seen_number
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        (0..self.columns.len())
            .filter(|&i| self.is_numeric(i))
            .map(|i| self.columns[i].clone())
            .collect()
    }

    /// First `limit` rows as JSON objects keyed by column name.
    pub fn preview(&self, limit: usize) -> Vec<Map<String, Value>> {
        let numeric: Vec<bool> = (0..self.columns.len()).map(|i| self.is_numeric(i)).collect();
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .zip(&numeric)
                    .map(|((name, raw), &is_numeric)| (name.clone(), preview_value(raw, is_numeric)))
                    .collect()
            })
            .collect()
    }
}

fn preview_value(raw: &str, numeric_column: bool) -> Value {
    match Cell::classify(raw) {
        Cell::Missing => Value::Null,
        Cell::Number(v) if numeric_column => {
            let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
            match trimmed.parse::<i64>() {
                Ok(i) => Value::from(i),
                Err(_) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
            }
        }
        Cell::Number(_) => Value::String(raw.to_string()),
        Cell::Text(text) => Value::String(text.to_string()),
    }
}

/// Blank header names become `Unnamed: {i}`; repeats get `.1`, `.2`, ...
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (i, name) in raw.enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Structural checks an upload must pass. Checked in order: rows, columns,
/// numeric columns.
pub fn validate(bytes: &[u8]) -> Result<(Table, TableSummary), AppError> {
    let table = Table::parse(bytes)?;

    if table.row_count() == 0 {
        return Err(AppError::EmptyFile);
    }
    if table.columns().len() < MIN_COLUMNS {
        return Err(AppError::TooFewColumns {
            required: MIN_COLUMNS,
            found: table.columns().len(),
        });
    }
    let numeric_columns = table.numeric_columns();
    if numeric_columns.len() < MIN_NUMERIC_COLUMNS {
        return Err(AppError::TooFewNumericColumns {
            required: MIN_NUMERIC_COLUMNS,
            found: numeric_columns.len(),
        });
    }

    let summary = TableSummary {
        columns: table.columns.clone(),
        numeric_columns,
        row_count: table.row_count(),
    };
    Ok((table, summary))
}
