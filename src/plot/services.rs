use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    state::AppState,
    tabular::{self, ColumnStats, PlotPoint},
    uploads::{repo_types::FileRecord, services as uploads},
};

fn require_columns(record: &FileRecord, names: &[&str]) -> Result<(), AppError> {
    match names.iter().find(|n| !record.has_column(n)) {
        Some(missing) => Err(AppError::ColumnNotFound(missing.to_string())),
        None => Ok(()),
    }
}

/// Scatter points for two columns of one of the user's files.
///
/// Column names are checked against the stored metadata first, so a bad
/// request never touches the blob.
pub async fn generate(
    st: &AppState,
    user_id: Uuid,
    file_id: &str,
    x_axis: &str,
    y_axis: &str,
) -> Result<Vec<PlotPoint>, AppError> {
    let record = uploads::get_by_raw_id(st, user_id, file_id).await?;
    require_columns(&record, &[x_axis, y_axis])?;

    let table = uploads::load_table(st, &record).await?;
    let points = tabular::extract_points(&table, x_axis, y_axis)?;
    debug!(
        file_id = %record.id,
        rows = table.row_count(),
        points = points.len(),
        "plot data extracted"
    );
    Ok(points)
}

pub async fn stats(
    st: &AppState,
    user_id: Uuid,
    file_id: &str,
    column: &str,
) -> Result<ColumnStats, AppError> {
    let record = uploads::get_by_raw_id(st, user_id, file_id).await?;
    require_columns(&record, &[column])?;

    let table = uploads::load_table(st, &record).await?;
    tabular::column_stats(&table, column)
}
