use serde::{Deserialize, Serialize};

use crate::tabular::PlotPoint;

#[derive(Debug, Deserialize)]
pub struct PlotRequest {
    pub file_id: String,
    pub x_axis: String,
    pub y_axis: String,
}

#[derive(Debug, Serialize)]
pub struct PlotResponse {
    pub plot_data: Vec<PlotPoint>,
    pub x_axis: String,
    pub y_axis: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    pub file_id: String,
    pub column: String,
}
