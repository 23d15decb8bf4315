//! Interaction engine for scatterplot matrices
//!
//! `ScatterPlot` handles one column pair: coordinate mapping, hover picking
//! and lasso/rectangle selection. `ScatterPlotMatrix` owns a grid of them,
//! keeps pan/zoom linked along shared axes and routes pointer input.

mod matrix;
mod scatter_plot;
mod selection;
mod ticks;
mod transform;

pub use matrix::{MatrixStatus, PointerAction, ScatterPlotMatrix, SelectionModifiers};
pub use scatter_plot::{PlotContext, PlotId, PointEmphasis, RenderPoint, ScatterPlot};
pub use selection::{SelectionDraft, SelectionMode};
pub use ticks::{compute_nice_ticks, format_tick, nice_step, Tick};
pub use transform::{AxisTransform, CoordinateTransform, TransformDelta};

use splom_data::DataError;
use thiserror::Error;

/// Errors reported by plot and matrix operations.
///
/// An operation that returns an error leaves its receiver unchanged.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Column index {index} out of range ({count} columns)")]
    InvalidColumnIndex { index: usize, count: usize },

    #[error("Invalid transform: scale {scale}, offset ({offset_x}, {offset_y})")]
    InvalidTransform {
        scale: f64,
        offset_x: f64,
        offset_y: f64,
    },

    #[error("No plot with id {0:?}")]
    UnknownPlot(PlotId),

    #[error("No table attached")]
    NoTable,

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Invalid saved state: {0}")]
    State(#[from] serde_json::Error),
}
