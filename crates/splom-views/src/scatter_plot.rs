//! Scatter plot of one column pair
//!
//! Owns the coordinate transform and the bucket index for its columns,
//! tracks the hovered point and the selection being drawn, and writes
//! committed selections into the shared selection set.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use splom_core::{Axis, DataRange, HoverState, PixelRect, Point2, SelectionOp, SplomSettings, SyncManager};
use splom_data::{correlation, CorrelationKind, SharedTable, SpatialIndex};

use crate::selection::{SelectionDraft, SelectionMode};
use crate::ticks::Tick;
use crate::transform::{AxisTransform, CoordinateTransform, TransformDelta};
use crate::ViewError;

/// Identifies a plot inside a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotId {
    /// Grid plot showing column `x` against column `y`
    Grid { x: usize, y: usize },
    /// The maximized overlay
    Maximized,
}

/// Everything a plot shares with its matrix
#[derive(Clone)]
pub struct PlotContext {
    pub settings: Arc<SplomSettings>,
    pub table: SharedTable,
    pub sync: Arc<SyncManager>,
}

/// How a point should be drawn, strongest emphasis last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PointEmphasis {
    Normal,
    Selected,
    Highlighted,
    PreviousHover,
    Hover,
}

/// One point for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPoint {
    pub row: usize,
    pub position: Point2,
    pub emphasis: PointEmphasis,
}

/// Persisted binding and pan/zoom of a plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlotState {
    x_column: usize,
    y_column: usize,
    x_axis: AxisTransform,
    y_axis: AxisTransform,
}

pub struct ScatterPlot {
    id: PlotId,
    ctx: PlotContext,
    columns: Option<(usize, usize)>,
    /// Column revisions the derived caches were built from
    revisions: Option<(u64, u64)>,
    transform: CoordinateTransform,
    index: SpatialIndex,
    hover: HoverState,
    draft: Option<SelectionDraft>,
    correlations: AHashMap<CorrelationKind, f64>,
}

impl ScatterPlot {
    /// Create a plot that is not bound to any columns yet
    pub fn new(id: PlotId, ctx: PlotContext) -> Self {
        Self {
            id,
            transform: CoordinateTransform::new(&ctx.settings),
            index: SpatialIndex::new(ctx.settings.grid_resolution),
            ctx,
            columns: None,
            revisions: None,
            hover: HoverState::default(),
            draft: None,
            correlations: AHashMap::new(),
        }
    }

    /// Create a plot bound to `(x, y)`
    pub fn with_columns(id: PlotId, ctx: PlotContext, x: usize, y: usize) -> Result<Self, ViewError> {
        let mut plot = Self::new(id, ctx);
        plot.set_columns(x, y)?;
        Ok(plot)
    }

    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn columns(&self) -> Option<(usize, usize)> {
        self.columns
    }

    pub fn column(&self, axis: Axis) -> Option<usize> {
        self.columns.map(|(x, y)| match axis {
            Axis::X => x,
            Axis::Y => y,
        })
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn rect(&self) -> PixelRect {
        self.transform.rect()
    }

    /// Column range after degenerate widening, without margin
    pub fn data_range(&self, axis: Axis) -> DataRange {
        self.transform.data_range(axis)
    }

    /// Axis ticks for the current view, refreshed first if the bound
    /// columns changed in the table
    pub fn ticks(&mut self, axis: Axis) -> &[Tick] {
        self.sync_with_table();
        self.transform.ticks(axis)
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    /// Outline of the selection being drawn, in pixel space
    pub fn selection_polygon(&self) -> Option<&[Point2]> {
        self.draft.as_ref().map(|d| d.vertices())
    }

    pub fn is_selecting(&self) -> bool {
        self.draft.is_some()
    }

    /// Bind the plot to a new column pair.
    ///
    /// Out-of-range indices are rejected and the previous binding is kept.
    pub fn set_columns(&mut self, x: usize, y: usize) -> Result<(), ViewError> {
        let count = self.ctx.table.read().column_count();
        if let Some(&index) = [x, y].iter().find(|&&c| c >= count) {
            tracing::warn!("Rejecting column pair ({}, {}): {} columns available", x, y, count);
            return Err(ViewError::InvalidColumnIndex { index, count });
        }

        self.columns = Some((x, y));
        self.refresh_bound_data();
        self.hover.clear();
        self.draft = None;
        Ok(())
    }

    /// Rebuild ranges, index and statistics if the bound columns changed in
    /// the table since the last refresh. Returns whether anything was rebuilt.
    pub fn sync_with_table(&mut self) -> bool {
        let Some((x, y)) = self.columns else {
            return false;
        };
        let current = {
            let table = self.ctx.table.read();
            table.column_revision(x).zip(table.column_revision(y))
        };
        if current.is_some() && current == self.revisions {
            return false;
        }
        if current.is_none() {
            // the table shrank under us
            tracing::warn!("Columns ({}, {}) vanished from the table, unbinding plot", x, y);
            self.columns = None;
            self.revisions = None;
            self.index.clear();
            self.correlations.clear();
            self.hover.clear();
            return true;
        }
        self.refresh_bound_data();
        true
    }

    fn refresh_bound_data(&mut self) {
        let Some((x, y)) = self.columns else {
            return;
        };
        let table = Arc::clone(&self.ctx.table);
        let table = table.read();

        self.transform.set_data_ranges(
            table.range(x).unwrap_or_default(),
            table.range(y).unwrap_or_default(),
            table.is_inverted(x),
            table.is_inverted(y),
        );
        self.index.rebuild(
            &table,
            x,
            y,
            self.transform.padded_range(Axis::X),
            self.transform.padded_range(Axis::Y),
        );
        self.revisions = table.column_revision(x).zip(table.column_revision(y));
        self.correlations.clear();
    }

    /// Set the drawable area
    pub fn set_rect(&mut self, rect: PixelRect) -> bool {
        self.transform.set_rect(rect)
    }

    /// Pick the point under `pos`. Returns whether the hovered row changed.
    pub fn hover_at(&mut self, pos: Point2) -> bool {
        self.sync_with_table();
        if !self.rect().contains(pos) {
            return self.clear_hover();
        }
        let row = {
            let table = self.ctx.table.read();
            self.index
                .nearest(&table, pos, &self.transform, self.ctx.settings.pick_radius_px)
        };
        let changed = self.hover.shift_to(row);
        if changed {
            tracing::trace!("Plot {:?} hover -> {:?}", self.id, row);
        }
        changed
    }

    /// Follow a hover that happened in another plot
    pub fn set_hover(&mut self, row: Option<usize>) -> bool {
        self.hover.shift_to(row)
    }

    pub fn clear_hover(&mut self) -> bool {
        self.hover.clear()
    }

    /// Pointer left the plot's widget: drop hover and any unfinished selection
    pub fn leave(&mut self) -> bool {
        let hover_changed = self.hover.clear();
        self.abandon_selection() || hover_changed
    }

    pub fn begin_selection(&mut self, pos: Point2, mode: SelectionMode) {
        let start = self.rect().clamp(pos);
        self.draft = Some(SelectionDraft::begin(mode, start));
    }

    /// Extend the selection outline. Returns false if no selection is active.
    pub fn update_selection(&mut self, pos: Point2) -> bool {
        let p = self.rect().clamp(pos);
        match self.draft.as_mut() {
            Some(draft) => {
                draft.update(p);
                true
            }
            None => false,
        }
    }

    pub fn abandon_selection(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Apply the drawn outline to the shared selection.
    ///
    /// `append` alone adds the enclosed rows, `remove` alone removes them,
    /// both together toggle them and neither replaces the selection. The
    /// outline is cleared in every case. Returns whether the selection changed.
    pub fn commit_selection(&mut self, append: bool, remove: bool) -> bool {
        let Some(draft) = self.draft.take() else {
            return false;
        };
        self.sync_with_table();
        if self.columns.is_none() {
            return false;
        }

        let polygon: Vec<Point2> = draft
            .vertices()
            .iter()
            .map(|&p| self.transform.pixel_to_data_point(p))
            .collect();
        let matched = {
            let table = self.ctx.table.read();
            self.index.rows_in_polygon(&table, &polygon)
        };
        tracing::debug!(
            "Plot {:?} selection matched {} rows (append: {}, remove: {})",
            self.id,
            matched.len(),
            append,
            remove
        );
        self.ctx
            .sync
            .apply_selection(matched, SelectionOp::from_modifiers(append, remove))
    }

    /// Correlation of the bound columns over all rows, cached until the
    /// columns or their data change
    pub fn correlation(&mut self, kind: CorrelationKind) -> f64 {
        self.sync_with_table();
        let Some((x, y)) = self.columns else {
            return 0.0;
        };
        if let Some(&value) = self.correlations.get(&kind) {
            return value;
        }
        let value = {
            let table = self.ctx.table.read();
            match (table.values(x), table.values(y)) {
                (Some(xs), Some(ys)) => correlation(xs, ys, kind),
                _ => 0.0,
            }
        };
        self.correlations.insert(kind, value);
        value
    }

    pub fn set_transform(&mut self, scale: f64, offset: Point2) -> Result<bool, ViewError> {
        self.transform.set_transform(scale, offset)
    }

    pub fn apply_transform_delta(&mut self, delta: TransformDelta) -> Result<bool, ViewError> {
        self.transform.set_transform_delta(delta)
    }

    pub fn set_axis_transform(&mut self, axis: Axis, transform: AxisTransform) -> Result<bool, ViewError> {
        self.transform.set_axis_transform(axis, transform)
    }

    pub fn reset_transform(&mut self) -> bool {
        self.transform
            .set_transform(1.0, Point2::default())
            .unwrap_or(false)
    }

    pub fn pan(&mut self, delta: Point2) -> Result<bool, ViewError> {
        self.apply_transform_delta(TransformDelta::pan(delta))
    }

    /// Delta that zooms by `notches` wheel steps around `pos`, keeping the
    /// point under the cursor fixed. The resulting scale of either axis
    /// stays within the configured limits.
    pub fn zoom_delta(&self, pos: Point2, notches: f64) -> TransformDelta {
        let settings = &self.ctx.settings;
        let mut factor = settings.zoom_step.powf(notches);
        if factor.is_nan() {
            factor = 1.0;
        }

        let (mut lo, mut hi) = (0.0f64, f64::INFINITY);
        for axis in Axis::BOTH {
            let scale = self.transform.scale(axis);
            lo = lo.max(settings.min_scale / scale);
            hi = hi.min(settings.max_scale / scale);
        }
        factor = if lo <= hi { factor.clamp(lo, hi) } else { 1.0 };

        let local = pos - self.rect().min;
        let offset = self.transform.offset();
        TransformDelta {
            scale: factor,
            offset: Point2::new(
                (local.x - offset.x) * (1.0 - factor),
                (local.y - offset.y) * (1.0 - factor),
            ),
        }
    }

    pub fn zoom_at(&mut self, pos: Point2, notches: f64) -> Result<bool, ViewError> {
        let delta = self.zoom_delta(pos, notches);
        self.apply_transform_delta(delta)
    }

    /// Filter-passing rows with their pixel position and emphasis
    pub fn render_points(&mut self) -> Vec<RenderPoint> {
        self.sync_with_table();
        let Some((x, y)) = self.columns else {
            return Vec::new();
        };
        let table = self.ctx.table.read();
        let (Some(xs), Some(ys)) = (table.values(x), table.values(y)) else {
            return Vec::new();
        };
        let sync = &self.ctx.sync;

        xs.iter()
            .zip(ys)
            .enumerate()
            .filter(|&(row, (vx, vy))| table.matches_filter(row) && vx.is_finite() && vy.is_finite())
            .map(|(row, (&vx, &vy))| {
                let emphasis = if self.hover.current == Some(row) {
                    PointEmphasis::Hover
                } else if self.hover.previous == Some(row) {
                    PointEmphasis::PreviousHover
                } else if sync.is_highlighted(row) {
                    PointEmphasis::Highlighted
                } else if sync.is_selected(row) {
                    PointEmphasis::Selected
                } else {
                    PointEmphasis::Normal
                };
                RenderPoint {
                    row,
                    position: self.transform.data_to_pixel_point(Point2::new(vx, vy)),
                    emphasis,
                }
            })
            .collect()
    }

    /// Column binding and pan/zoom as JSON
    pub fn save_state(&self) -> Value {
        match self.columns {
            Some((x_column, y_column)) => serde_json::to_value(PlotState {
                x_column,
                y_column,
                x_axis: self.transform.axis_transform(Axis::X),
                y_axis: self.transform.axis_transform(Axis::Y),
            })
            .unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    /// Restore a state produced by [`ScatterPlot::save_state`]
    pub fn load_state(&mut self, state: Value) -> Result<(), ViewError> {
        let state: PlotState = serde_json::from_value(state)?;
        for axis in [state.x_axis, state.y_axis] {
            if !axis.is_valid() {
                return Err(ViewError::InvalidTransform {
                    scale: axis.scale,
                    offset_x: state.x_axis.offset,
                    offset_y: state.y_axis.offset,
                });
            }
        }
        self.set_columns(state.x_column, state.y_column)?;
        self.set_axis_transform(Axis::X, state.x_axis)?;
        self.set_axis_transform(Axis::Y, state.y_axis)?;
        Ok(())
    }
}
