use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{PlotRequest, PlotResponse, StatsRequest},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState, tabular::ColumnStats};

pub fn plot_routes() -> Router<AppState> {
    Router::new()
        .route("/plot/generate", post(generate_plot))
        .route("/plot/stats", post(column_stats))
}

#[instrument(skip(state))]
pub async fn generate_plot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<PlotRequest>,
) -> Result<Json<PlotResponse>, AppError> {
    let plot_data =
        services::generate(&state, user_id, &req.file_id, &req.x_axis, &req.y_axis).await?;
    Ok(Json(PlotResponse {
        plot_data,
        x_axis: req.x_axis,
        y_axis: req.y_axis,
    }))
}

#[instrument(skip(state))]
pub async fn column_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<StatsRequest>,
) -> Result<Json<ColumnStats>, AppError> {
    Ok(Json(
        services::stats(&state, user_id, &req.file_id, &req.column).await?,
    ))
}
