//! hf-plot: 2-D projections of trajectories and flow tubes, written as
//! named JSON plot artifacts.

pub mod axes;
pub mod project;
pub mod writer;

pub use axes::{AxisBound, Axes2d, Coordinate};
pub use project::{PlotBox, project_orbit, project_trajectory};
pub use writer::{PlotArtifact, PlotData, Plotter};

pub type PlotResult<T> = Result<T, PlotError>;

#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Coordinate '{coordinate}' is not defined at t={time}")]
    MissingCoordinate { coordinate: String, time: f64 },

    #[error("Invalid plot name: {name:?}")]
    InvalidName { name: String },
}
