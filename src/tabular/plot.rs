use serde::Serialize;

use super::table::Table;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    /// Zero-based row index in the source file.
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

fn require_column(table: &Table, name: &str) -> Result<usize, AppError> {
    table
        .column_index(name)
        .ok_or_else(|| AppError::ColumnNotFound(name.to_string()))
}

/// Numeric (x, y) pairs in source order. Rows where either cell is missing
/// or not a number are skipped; ids keep the original row positions.
pub fn extract_points(table: &Table, x_axis: &str, y_axis: &str) -> Result<Vec<PlotPoint>, AppError> {
    let x_idx = require_column(table, x_axis)?;
    let y_idx = require_column(table, y_axis)?;

    let points = (0..table.row_count())
        .filter_map(|row| {
            let x = table.cell(row, x_idx).as_number()?;
            let y = table.cell(row, y_idx).as_number()?;
            Some(PlotPoint { x, y, id: row })
        })
        .collect();
    Ok(points)
}

pub fn column_stats(table: &Table, column: &str) -> Result<ColumnStats, AppError> {
    let idx = require_column(table, column)?;
    let mut values: Vec<f64> = table.column(idx).filter_map(|c| c.as_number()).collect();
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let median = match count {
        0 => None,
        n if n % 2 == 1 => Some(values[n / 2]),
        n => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
    };
    // sample standard deviation, n - 1 in the denominator
    let std = match mean {
        Some(m) if count > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    Ok(ColumnStats {
        column: column.to_string(),
        count,
        min: values.first().copied(),
        max: values.last().copied(),
        mean,
        median,
        std,
    })
}
