//! CSV validation and numeric extraction for uploaded files.

mod cell;
pub mod plot;
pub mod table;

pub use plot::{column_stats, extract_points, ColumnStats, PlotPoint};
pub use table::{validate, Table, TableSummary};
