//! Core abstractions for the scatterplot-matrix engine
//!
//! This crate provides the geometry primitives, the explicit settings object
//! handed to every plot, the linked selection/highlight/hover state and the
//! observer list used to tell the host when something needs repainting.

pub mod events;
pub mod geometry;
pub mod settings;
pub mod sync;

// Re-export commonly used types
pub use events::{EventDispatcher, SplomEvent, SplomObserver};
pub use geometry::{Axis, DataRange, PixelRect, Point2};
pub use settings::{Palette, Rgba, SplomSettings};
pub use sync::{HighlightSet, HoverState, SelectionOp, SelectionSet, SyncManager};
