mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_file_size: usize) -> Router<AppState> {
    Router::new().merge(handlers::upload_routes(max_file_size))
}
