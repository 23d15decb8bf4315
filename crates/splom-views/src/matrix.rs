//! Matrix of linked scatter plots
//!
//! The grid holds one plot per pair of visible columns, row 0 at the top.
//! Plot `(row, col)` shows `visible[col]` on X against `visible[row]` on Y.
//! Pan/zoom is linked along shared axes: the matrix keeps one canonical
//! `AxisTransform` per column for the X role and one for the Y role, and
//! copies it into every plot showing that column in that role.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use splom_core::{
    Axis, EventDispatcher, HoverState, PixelRect, Point2, SplomEvent, SplomObserver, SplomSettings, SyncManager,
};
use splom_data::SharedTable;

use crate::scatter_plot::{PlotContext, PlotId, ScatterPlot};
use crate::selection::SelectionMode;
use crate::transform::{AxisTransform, TransformDelta};
use crate::ViewError;

/// What a pointer press starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Pan,
    Select(SelectionMode),
}

/// Modifier keys held when a selection is committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionModifiers {
    pub append: bool,
    pub remove: bool,
}

/// Whether the matrix has anything to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixStatus {
    /// No table, or a table without rows
    Empty,
    /// Fewer than two visible columns
    TooFewColumns,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Interaction {
    Pan { plot: PlotId, last: Point2 },
    Select { plot: PlotId },
}

#[derive(Debug, Serialize, Deserialize)]
struct MatrixState {
    visible: Vec<bool>,
    /// Cell size the axis offsets were recorded at
    cell: (f64, f64),
    x_axes: BTreeMap<usize, AxisTransform>,
    y_axes: BTreeMap<usize, AxisTransform>,
}

pub struct ScatterPlotMatrix {
    settings: Arc<SplomSettings>,
    sync: Arc<SyncManager>,
    events: EventDispatcher,
    table: Option<SharedTable>,

    /// Visibility flag per table column
    visible: Vec<bool>,
    /// Indices of the visible columns, in table order
    visible_columns: Vec<usize>,
    /// Grid plots indexed `[row][col]`
    plots: Vec<Vec<ScatterPlot>>,

    x_axes: AHashMap<usize, AxisTransform>,
    y_axes: AHashMap<usize, AxisTransform>,

    maximized: Option<ScatterPlot>,
    rect: PixelRect,
    /// Grid cell size the canonical axis offsets refer to
    cell: (f64, f64),
    interaction: Option<Interaction>,
}

impl ScatterPlotMatrix {
    pub fn new(settings: SplomSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            sync: Arc::new(SyncManager::new()),
            events: EventDispatcher::new(),
            table: None,
            visible: Vec::new(),
            visible_columns: Vec::new(),
            plots: Vec::new(),
            x_axes: AHashMap::new(),
            y_axes: AHashMap::new(),
            maximized: None,
            rect: PixelRect::default(),
            cell: (0.0, 0.0),
            interaction: None,
        }
    }

    pub fn settings(&self) -> &SplomSettings {
        &self.settings
    }

    pub fn sync(&self) -> &Arc<SyncManager> {
        &self.sync
    }

    pub fn table(&self) -> Option<&SharedTable> {
        self.table.as_ref()
    }

    pub fn subscribe(&self, observer: Arc<dyn SplomObserver>) {
        self.events.subscribe(observer);
    }

    /// Attach a table, showing all of its columns.
    ///
    /// Selection, highlight, hover, pan/zoom and the maximized plot are reset.
    pub fn set_table(&mut self, table: SharedTable) {
        let (rows, columns) = {
            let t = table.read();
            (t.row_count(), t.column_count())
        };
        tracing::info!("Attaching table with {} rows and {} columns", rows, columns);

        self.sync.reset();
        self.x_axes.clear();
        self.y_axes.clear();
        self.maximized = None;
        self.interaction = None;
        self.plots.clear();
        self.visible = vec![true; columns];
        self.table = Some(table);
        self.rebuild_grid();

        self.events.emit(&SplomEvent::SelectionChanged { selected: 0 });
        self.repaint(true);
    }

    pub fn is_column_visible(&self, column: usize) -> bool {
        self.visible.get(column).copied().unwrap_or(false)
    }

    pub fn visible_columns(&self) -> &[usize] {
        &self.visible_columns
    }

    /// Show or hide a column. Plots of the other columns keep their pan/zoom.
    pub fn set_column_visible(&mut self, column: usize, visible: bool) -> Result<bool, ViewError> {
        if self.table.is_none() {
            return Err(ViewError::NoTable);
        }
        let count = self.visible.len();
        let Some(flag) = self.visible.get_mut(column) else {
            tracing::warn!("Cannot toggle column {}: {} columns available", column, count);
            return Err(ViewError::InvalidColumnIndex { index: column, count });
        };
        if *flag == visible {
            return Ok(false);
        }
        *flag = visible;
        self.cancel_interaction();
        self.rebuild_grid();
        Ok(self.repaint(true))
    }

    fn context(&self) -> Option<PlotContext> {
        self.table.as_ref().map(|table| PlotContext {
            settings: Arc::clone(&self.settings),
            table: Arc::clone(table),
            sync: Arc::clone(&self.sync),
        })
    }

    fn rebuild_grid(&mut self) {
        self.visible_columns = self
            .visible
            .iter()
            .enumerate()
            .filter_map(|(column, &shown)| shown.then_some(column))
            .collect();
        let Some(ctx) = self.context() else {
            self.plots.clear();
            return;
        };

        let mut existing: AHashMap<(usize, usize), ScatterPlot> = self
            .plots
            .drain(..)
            .flatten()
            .filter_map(|plot| plot.columns().map(|columns| (columns, plot)))
            .collect();
        let reused_before = existing.len();

        let mut grid = Vec::with_capacity(self.visible_columns.len());
        for &y in &self.visible_columns {
            let mut row = Vec::with_capacity(self.visible_columns.len());
            for &x in &self.visible_columns {
                let plot = match existing.remove(&(x, y)) {
                    Some(plot) => plot,
                    None => {
                        let mut plot = ScatterPlot::new(PlotId::Grid { x, y }, ctx.clone());
                        if let Err(err) = plot.set_columns(x, y) {
                            tracing::warn!("Grid plot ({}, {}) left unbound: {}", x, y, err);
                        }
                        plot
                    }
                };
                row.push(plot);
            }
            grid.push(row);
        }
        self.plots = grid;

        tracing::debug!(
            "Rebuilt {0}x{0} plot grid ({1} plots kept, {2} dropped)",
            self.visible_columns.len(),
            reused_before - existing.len(),
            existing.len()
        );
        self.layout();
        self.events.emit(&SplomEvent::LayoutChanged {
            visible_columns: self.visible_columns.len(),
        });
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Set the area the whole matrix is drawn into
    pub fn set_rect(&mut self, rect: PixelRect) -> bool {
        if self.rect == rect {
            return false;
        }
        self.rect = rect;
        self.layout();
        self.repaint(true)
    }

    fn cell_size(&self) -> (f64, f64) {
        let n = self.visible_columns.len().max(1) as f64;
        let gaps = self.settings.plot_spacing_px * (n - 1.0);
        (
            ((self.rect.width() - gaps) / n).max(0.0),
            ((self.rect.height() - gaps) / n).max(0.0),
        )
    }

    /// Rectangle of grid cell `(row, col)`, row 0 at the top
    fn cell_rect(&self, row: usize, col: usize) -> PixelRect {
        let (w, h) = self.cell_size();
        let spacing = self.settings.plot_spacing_px;
        let min_x = self.rect.min.x + col as f64 * (w + spacing);
        let max_y = self.rect.max.y - row as f64 * (h + spacing);
        PixelRect::new(Point2::new(min_x, max_y - h), Point2::new(min_x + w, max_y))
    }

    /// Area of the maximized plot: the lower-left block of the hidden triangle
    fn overlay_rect(&self) -> PixelRect {
        let n = self.visible_columns.len();
        if n <= 1 {
            return self.rect;
        }
        let k = (n / 2).max(1) as f64;
        let (w, h) = self.cell_size();
        let spacing = self.settings.plot_spacing_px;
        PixelRect::from_min_size(self.rect.min, k * w + (k - 1.0) * spacing, k * h + (k - 1.0) * spacing)
    }

    /// Place every plot and keep the visible data windows when the cell
    /// size changes
    fn layout(&mut self) {
        let cell = self.cell_size();
        if cell != self.cell {
            for t in self.x_axes.values_mut() {
                *t = t.rescaled(self.cell.0, cell.0);
            }
            for t in self.y_axes.values_mut() {
                *t = t.rescaled(self.cell.1, cell.1);
            }
            if cell.0 > 0.0 && cell.1 > 0.0 {
                self.cell = cell;
            }
        }

        let n = self.visible_columns.len();
        for row in 0..n {
            for col in 0..n {
                let rect = self.cell_rect(row, col);
                let Some(plot) = self.plots.get_mut(row).and_then(|r| r.get_mut(col)) else {
                    continue;
                };
                plot.set_rect(rect);
                if let Some((x, y)) = plot.columns() {
                    let x_axis = self.x_axes.get(&x).copied().unwrap_or_default();
                    let y_axis = self.y_axes.get(&y).copied().unwrap_or_default();
                    set_axes(plot, x_axis, y_axis);
                }
            }
        }

        let target = self.overlay_rect();
        if let Some(overlay) = self.maximized.as_mut() {
            let old = overlay.rect();
            if overlay.set_rect(target) {
                let t = overlay.transform();
                let x_axis = t.axis_transform(Axis::X).rescaled(old.width(), target.width());
                let y_axis = t.axis_transform(Axis::Y).rescaled(old.height(), target.height());
                set_axes(overlay, x_axis, y_axis);
            }
        }
    }

    fn grid_position(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        let col = self.visible_columns.iter().position(|&c| c == x)?;
        let row = self.visible_columns.iter().position(|&c| c == y)?;
        Some((row, col))
    }

    pub fn plot(&self, id: PlotId) -> Option<&ScatterPlot> {
        match id {
            PlotId::Grid { x, y } => {
                let (row, col) = self.grid_position(x, y)?;
                self.plots.get(row)?.get(col)
            }
            PlotId::Maximized => self.maximized.as_ref(),
        }
    }

    pub fn plot_mut(&mut self, id: PlotId) -> Option<&mut ScatterPlot> {
        match id {
            PlotId::Grid { x, y } => {
                let (row, col) = self.grid_position(x, y)?;
                self.plots.get_mut(row)?.get_mut(col)
            }
            PlotId::Maximized => self.maximized.as_mut(),
        }
    }

    /// Plot at grid cell `(row, col)`
    pub fn plot_at_cell(&self, row: usize, col: usize) -> Option<&ScatterPlot> {
        self.plots.get(row)?.get(col)
    }

    /// Lower-triangle cells are hidden while a plot is maximized
    pub fn is_hidden(&self, row: usize, col: usize) -> bool {
        self.maximized.is_some() && row > col
    }

    /// Grid plots currently shown, row by row
    pub fn visible_plots(&self) -> impl Iterator<Item = &ScatterPlot> + '_ {
        self.plots.iter().enumerate().flat_map(move |(row, plots)| {
            plots
                .iter()
                .enumerate()
                .filter(move |&(col, _)| !self.is_hidden(row, col))
                .map(|(_, plot)| plot)
        })
    }

    fn all_plots_mut(&mut self) -> impl Iterator<Item = &mut ScatterPlot> + '_ {
        self.plots.iter_mut().flatten().chain(self.maximized.iter_mut())
    }

    /// Plot under a matrix-space position; the maximized plot wins
    pub fn plot_at(&self, pos: Point2) -> Option<PlotId> {
        if let Some(overlay) = &self.maximized {
            if overlay.rect().contains(pos) {
                return Some(PlotId::Maximized);
            }
        }
        self.visible_plots()
            .find(|plot| plot.rect().contains(pos))
            .map(|plot| plot.id())
    }

    pub fn maximized(&self) -> Option<&ScatterPlot> {
        self.maximized.as_ref()
    }

    /// Canonical pan/zoom of `column` in the given role
    pub fn axis_transform(&self, axis: Axis, column: usize) -> AxisTransform {
        let axes = match axis {
            Axis::X => &self.x_axes,
            Axis::Y => &self.y_axes,
        };
        axes.get(&column).copied().unwrap_or_default()
    }

    /// Apply a pan/zoom change of `source` to every plot sharing one of its
    /// axes.
    ///
    /// Plots showing the source's X column on X get the X component, plots
    /// showing its Y column on Y get the Y component. Either both axes are
    /// updated everywhere or, if the result would be invalid, nothing is.
    /// The maximized plot is never linked to the grid.
    pub fn propagate_transform(&mut self, source: PlotId, delta: TransformDelta) -> Result<bool, ViewError> {
        let (x, y) = match source {
            PlotId::Maximized => {
                let overlay = self.maximized.as_mut().ok_or(ViewError::UnknownPlot(source))?;
                return overlay.apply_transform_delta(delta);
            }
            PlotId::Grid { x, y } => (x, y),
        };
        if self.grid_position(x, y).is_none() {
            tracing::warn!("Transform change from unknown plot {:?}", source);
            return Err(ViewError::UnknownPlot(source));
        }

        let invalid = |scale: f64| ViewError::InvalidTransform {
            scale,
            offset_x: delta.offset.x,
            offset_y: delta.offset.y,
        };
        let current_x = self.axis_transform(Axis::X, x);
        let current_y = self.axis_transform(Axis::Y, y);
        let new_x = current_x
            .with_delta(delta.scale, delta.offset.x)
            .ok_or_else(|| invalid(current_x.scale * delta.scale))?;
        let new_y = current_y
            .with_delta(delta.scale, delta.offset.y)
            .ok_or_else(|| invalid(current_y.scale * delta.scale))?;

        let changed = self.write_shared_axes(x, y, new_x, new_y);
        if changed {
            tracing::trace!("Propagated {:?} from plot ({}, {})", delta, x, y);
            self.events.emit(&SplomEvent::TransformChanged { x_column: x, y_column: y });
        }
        Ok(changed)
    }

    /// Replace the pan/zoom of a plot, linking it like
    /// [`ScatterPlotMatrix::propagate_transform`]
    pub fn set_plot_transform(&mut self, id: PlotId, scale: f64, offset: Point2) -> Result<bool, ViewError> {
        let invalid = || ViewError::InvalidTransform {
            scale,
            offset_x: offset.x,
            offset_y: offset.y,
        };
        let new_x = AxisTransform::new(scale, offset.x).ok_or_else(invalid)?;
        let new_y = AxisTransform::new(scale, offset.y).ok_or_else(invalid)?;

        match id {
            PlotId::Maximized => {
                let overlay = self.maximized.as_mut().ok_or(ViewError::UnknownPlot(id))?;
                overlay.set_transform(scale, offset)
            }
            PlotId::Grid { x, y } => {
                if self.grid_position(x, y).is_none() {
                    return Err(ViewError::UnknownPlot(id));
                }
                let changed = self.write_shared_axes(x, y, new_x, new_y);
                if changed {
                    self.events.emit(&SplomEvent::TransformChanged { x_column: x, y_column: y });
                }
                Ok(changed)
            }
        }
    }

    fn write_shared_axes(&mut self, x: usize, y: usize, x_axis: AxisTransform, y_axis: AxisTransform) -> bool {
        self.x_axes.insert(x, x_axis);
        self.y_axes.insert(y, y_axis);

        let mut changed = false;
        for plot in self.plots.iter_mut().flatten() {
            if plot.column(Axis::X) == Some(x) {
                changed |= set_axis(plot, Axis::X, x_axis);
            }
            if plot.column(Axis::Y) == Some(y) {
                changed |= set_axis(plot, Axis::Y, y_axis);
            }
        }
        changed
    }

    /// Reset pan/zoom of every plot, including the maximized one
    pub fn reset_transforms(&mut self) -> bool {
        self.x_axes.clear();
        self.y_axes.clear();
        let mut changed = false;
        for plot in self.all_plots_mut() {
            changed |= plot.reset_transform();
        }
        self.repaint(changed)
    }

    /// Show an enlarged copy of a grid plot.
    ///
    /// The copy starts at the same apparent magnification as its source and
    /// is not linked to the grid. Any previous maximized plot is replaced.
    pub fn maximize(&mut self, id: PlotId) -> Result<(), ViewError> {
        let (source_rect, source_axes, columns) = match self.plot(id) {
            Some(plot) if id != PlotId::Maximized => (
                plot.rect(),
                [plot.transform().axis_transform(Axis::X), plot.transform().axis_transform(Axis::Y)],
                plot.columns(),
            ),
            _ => {
                tracing::warn!("Cannot maximize unknown plot {:?}", id);
                return Err(ViewError::UnknownPlot(id));
            }
        };
        let (x, y) = columns.ok_or(ViewError::UnknownPlot(id))?;
        let ctx = self.context().ok_or(ViewError::NoTable)?;

        let mut overlay = ScatterPlot::with_columns(PlotId::Maximized, ctx, x, y)?;
        let target = self.overlay_rect();
        overlay.set_rect(target);
        overlay.set_axis_transform(Axis::X, source_axes[0].rescaled(source_rect.width(), target.width()))?;
        overlay.set_axis_transform(Axis::Y, source_axes[1].rescaled(source_rect.height(), target.height()))?;
        let hover = self.sync.hover();
        overlay.set_hover(hover.previous);
        overlay.set_hover(hover.current);

        self.cancel_interaction();
        self.maximized = Some(overlay);
        tracing::debug!("Maximized plot ({}, {})", x, y);
        self.events.emit(&SplomEvent::MaximizedChanged { columns: Some((x, y)) });
        self.repaint(true);
        Ok(())
    }

    /// Close the maximized plot. The grid keeps its pan/zoom.
    pub fn restore(&mut self) -> bool {
        if self.maximized.take().is_none() {
            return false;
        }
        if matches!(
            self.interaction,
            Some(Interaction::Pan { plot: PlotId::Maximized, .. } | Interaction::Select { plot: PlotId::Maximized })
        ) {
            self.interaction = None;
        }
        self.events.emit(&SplomEvent::MaximizedChanged { columns: None });
        self.repaint(true)
    }

    fn cancel_interaction(&mut self) {
        if let Some(Interaction::Select { plot }) = self.interaction.take() {
            if let Some(plot) = self.plot_mut(plot) {
                plot.abandon_selection();
            }
        }
    }

    fn apply_delta(&mut self, id: PlotId, delta: TransformDelta) -> bool {
        if delta.is_identity() {
            return false;
        }
        match self.propagate_transform(id, delta) {
            Ok(changed) => changed,
            Err(err) => {
                tracing::warn!("Ignoring pan/zoom of {:?}: {}", id, err);
                false
            }
        }
    }

    /// Start a pan or selection drag in the plot under `pos`
    pub fn pointer_press(&mut self, pos: Point2, action: PointerAction) -> bool {
        self.cancel_interaction();
        let Some(id) = self.plot_at(pos) else {
            return false;
        };
        match action {
            PointerAction::Pan => {
                self.interaction = Some(Interaction::Pan { plot: id, last: pos });
                false
            }
            PointerAction::Select(mode) => {
                let Some(plot) = self.plot_mut(id) else {
                    return false;
                };
                plot.begin_selection(pos, mode);
                self.interaction = Some(Interaction::Select { plot: id });
                self.repaint(true)
            }
        }
    }

    /// Continue a drag, or update the hovered point when no drag is active
    pub fn pointer_move(&mut self, pos: Point2) -> bool {
        let changed = match self.interaction {
            Some(Interaction::Pan { plot, last }) => {
                self.interaction = Some(Interaction::Pan { plot, last: pos });
                self.apply_delta(plot, TransformDelta::pan(pos - last))
            }
            Some(Interaction::Select { plot }) => self
                .plot_mut(plot)
                .map(|p| p.update_selection(pos))
                .unwrap_or(false),
            None => self.hover_move(pos),
        };
        self.repaint(changed)
    }

    /// Finish a drag; a selection drag is committed with `modifiers`
    pub fn pointer_release(&mut self, pos: Point2, modifiers: SelectionModifiers) -> bool {
        let Some(Interaction::Select { plot }) = self.interaction.take() else {
            return false;
        };
        let Some(plot) = self.plot_mut(plot) else {
            return false;
        };
        plot.update_selection(pos);
        if plot.commit_selection(modifiers.append, modifiers.remove) {
            self.events.emit(&SplomEvent::SelectionChanged {
                selected: self.sync.selection_len(),
            });
        }
        self.repaint(true)
    }

    /// Zoom the plot under `pos` by `notches` wheel steps
    pub fn wheel(&mut self, pos: Point2, notches: f64) -> bool {
        let Some(id) = self.plot_at(pos) else {
            return false;
        };
        let Some(delta) = self.plot(id).map(|plot| plot.zoom_delta(pos, notches)) else {
            return false;
        };
        let changed = self.apply_delta(id, delta);
        self.repaint(changed)
    }

    /// Pointer left the matrix widget: drop hover and any unfinished selection
    pub fn pointer_leave(&mut self) -> bool {
        let mut changed = false;
        if let Some(Interaction::Select { plot }) = self.interaction.take() {
            changed |= self.plot_mut(plot).map(|p| p.abandon_selection()).unwrap_or(false);
        }
        changed |= self.clear_hover();
        self.repaint(changed)
    }

    fn hover_move(&mut self, pos: Point2) -> bool {
        let Some(id) = self.plot_at(pos) else {
            return self.clear_hover();
        };
        let Some(plot) = self.plot_mut(id) else {
            return false;
        };
        if !plot.hover_at(pos) {
            return false;
        }
        let row = plot.hover().current;
        for other in self.all_plots_mut() {
            if other.id() != id {
                other.set_hover(row);
            }
        }
        self.sync.set_hover(row);
        self.events.emit(&SplomEvent::HoverChanged(self.sync.hover()));
        true
    }

    /// Matrix-wide hover state
    pub fn hover(&self) -> HoverState {
        self.sync.hover()
    }

    /// Clear hover in every plot
    pub fn clear_hover(&mut self) -> bool {
        let mut changed = false;
        for plot in self.all_plots_mut() {
            changed |= plot.clear_hover();
        }
        changed |= self.sync.clear_hover();
        if changed {
            self.events.emit(&SplomEvent::HoverChanged(HoverState::default()));
        }
        changed
    }

    pub fn selection(&self) -> Vec<usize> {
        self.sync.selection()
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.sync.is_selected(row)
    }

    /// Replace the selection; rows past the end of the table are ignored
    pub fn set_selection(&mut self, rows: impl IntoIterator<Item = usize>) -> bool {
        let row_count = self.row_count();
        let changed = self.sync.set_selection(rows.into_iter().filter(|&row| row < row_count));
        self.selection_changed(changed)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.sync.clear_selection();
        self.selection_changed(changed)
    }

    fn selection_changed(&self, changed: bool) -> bool {
        if changed {
            self.events.emit(&SplomEvent::SelectionChanged {
                selected: self.sync.selection_len(),
            });
        }
        self.repaint(changed)
    }

    pub fn highlighted(&self) -> Vec<usize> {
        self.sync.highlighted()
    }

    pub fn is_highlighted(&self, row: usize) -> bool {
        self.sync.is_highlighted(row)
    }

    pub fn set_highlight(&mut self, rows: impl IntoIterator<Item = usize>) {
        self.sync.set_highlight(rows);
        self.highlight_changed(true);
    }

    pub fn clear_highlight(&mut self) -> bool {
        let changed = self.sync.clear_highlight();
        self.highlight_changed(changed)
    }

    fn highlight_changed(&self, changed: bool) -> bool {
        if changed {
            self.events.emit(&SplomEvent::HighlightChanged);
        }
        self.repaint(changed)
    }

    fn row_count(&self) -> usize {
        self.table.as_ref().map(|t| t.read().row_count()).unwrap_or(0)
    }

    /// Flip the direction of a column in every plot showing it
    pub fn invert_column(&mut self, column: usize, inverted: bool) -> Result<bool, ViewError> {
        let table = self.table.as_ref().ok_or(ViewError::NoTable)?;
        let changed = table.write().set_inverted(column, inverted)?;
        if changed {
            self.notify_table_changed();
        }
        Ok(changed)
    }

    /// Replace the per-row filter
    pub fn set_filter(&mut self, filter: Vec<bool>) -> Result<(), ViewError> {
        let table = self.table.as_ref().ok_or(ViewError::NoTable)?;
        table.write().set_filter(filter)?;
        self.notify_table_changed();
        Ok(())
    }

    /// Bring every plot up to date after the table was mutated elsewhere
    pub fn notify_table_changed(&mut self) {
        let Some(table) = self.table.clone() else {
            return;
        };
        let columns = table.read().column_count();
        if columns != self.visible.len() {
            self.visible.resize(columns, true);
            self.x_axes.retain(|&c, _| c < columns);
            self.y_axes.retain(|&c, _| c < columns);
            self.rebuild_grid();
        }

        let mut rebuilt = 0;
        for plot in self.all_plots_mut() {
            if plot.sync_with_table() {
                rebuilt += 1;
            }
        }
        tracing::debug!("Table changed, {} plots rebuilt", rebuilt);

        let hovered = self.sync.hover().current;
        if hovered.is_some_and(|row| !table.read().matches_filter(row)) {
            self.clear_hover();
        }
        self.repaint(true);
    }

    pub fn status(&self) -> MatrixStatus {
        match &self.table {
            None => MatrixStatus::Empty,
            Some(table) if table.read().row_count() == 0 => MatrixStatus::Empty,
            Some(_) if self.visible_columns.len() < 2 => MatrixStatus::TooFewColumns,
            Some(_) => MatrixStatus::Ready,
        }
    }

    /// Column visibility and linked pan/zoom as JSON
    pub fn save_state(&self) -> Value {
        let state = MatrixState {
            visible: self.visible.clone(),
            cell: self.cell,
            x_axes: self.x_axes.iter().map(|(&c, &t)| (c, t)).collect(),
            y_axes: self.y_axes.iter().map(|(&c, &t)| (c, t)).collect(),
        };
        serde_json::to_value(state).unwrap_or(Value::Null)
    }

    /// Restore a state produced by [`ScatterPlotMatrix::save_state`] for a
    /// table with the same columns
    pub fn load_state(&mut self, state: Value) -> Result<(), ViewError> {
        let state: MatrixState = serde_json::from_value(state)?;
        let count = self.visible.len();
        if self.table.is_none() {
            return Err(ViewError::NoTable);
        }
        if state.visible.len() != count {
            return Err(ViewError::InvalidColumnIndex {
                index: state.visible.len(),
                count,
            });
        }
        for (&column, transform) in state.x_axes.iter().chain(state.y_axes.iter()) {
            if column >= count {
                return Err(ViewError::InvalidColumnIndex { index: column, count });
            }
            if !transform.is_valid() {
                return Err(ViewError::InvalidTransform {
                    scale: transform.scale,
                    offset_x: transform.offset,
                    offset_y: transform.offset,
                });
            }
        }

        let (from, to) = (state.cell, self.cell);
        self.cancel_interaction();
        self.visible = state.visible;
        self.x_axes = state.x_axes.into_iter().map(|(c, t)| (c, t.rescaled(from.0, to.0))).collect();
        self.y_axes = state.y_axes.into_iter().map(|(c, t)| (c, t.rescaled(from.1, to.1))).collect();
        self.rebuild_grid();
        self.repaint(true);
        Ok(())
    }

    fn repaint(&self, needed: bool) -> bool {
        if needed {
            self.events.emit(&SplomEvent::RepaintNeeded);
        }
        needed
    }
}

fn set_axis(plot: &mut ScatterPlot, axis: Axis, transform: AxisTransform) -> bool {
    match plot.set_axis_transform(axis, transform) {
        Ok(changed) => changed,
        Err(err) => {
            tracing::warn!("Keeping previous {:?} transform of plot {:?}: {}", axis, plot.id(), err);
            false
        }
    }
}

fn set_axes(plot: &mut ScatterPlot, x_axis: AxisTransform, y_axis: AxisTransform) {
    set_axis(plot, Axis::X, x_axis);
    set_axis(plot, Axis::Y, y_axis);
}
