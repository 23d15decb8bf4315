//! Data space <-> pixel space mapping for one plot
//!
//! A data value is first normalized into the margin-padded column range,
//! scaled to the plot's width or height, mirrored if the column is inverted
//! and passed through the per-axis affine pan/zoom `offset + p * scale`.
//! The affine works on plot-local pixels (0 at the rectangle's minimum
//! corner), so a given `(scale, offset)` shows the same data window in every
//! plot of the same size wherever it sits in the matrix.

use serde::{Deserialize, Serialize};
use splom_core::{Axis, DataRange, PixelRect, Point2, SplomSettings};
use splom_data::PixelProjection;

use crate::ticks::{compute_nice_ticks, format_tick, nice_step, Tick};
use crate::ViewError;

/// Affine pan/zoom along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTransform {
    pub scale: f64,
    pub offset: f64,
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self { scale: 1.0, offset: 0.0 }
    }
}

impl AxisTransform {
    pub fn new(scale: f64, offset: f64) -> Option<Self> {
        let t = Self { scale, offset };
        t.is_valid().then_some(t)
    }

    pub fn is_valid(&self) -> bool {
        self.scale > 0.0 && self.scale.is_finite() && self.offset.is_finite()
    }

    pub fn apply(&self, p: f64) -> f64 {
        self.offset + p * self.scale
    }

    pub fn invert(&self, p: f64) -> f64 {
        (p - self.offset) / self.scale
    }

    /// Multiply the scale and shift the offset; `None` if the result is invalid
    pub fn with_delta(&self, scale_factor: f64, offset_delta: f64) -> Option<Self> {
        Self::new(self.scale * scale_factor, self.offset + offset_delta)
    }

    /// Same scale, with the offset stretched so that the same data window
    /// stays visible when the axis length changes from `from_len` to `to_len`
    /// pixels. Lengths that are not positive leave the transform unchanged.
    pub fn rescaled(&self, from_len: f64, to_len: f64) -> Self {
        if !(from_len > 0.0 && to_len > 0.0) || from_len == to_len {
            return *self;
        }
        Self {
            scale: self.scale,
            offset: self.offset * (to_len / from_len),
        }
    }
}

/// Pan/zoom change: scale factor for both axes plus a pixel offset shift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDelta {
    pub scale: f64,
    pub offset: Point2,
}

impl TransformDelta {
    pub fn pan(offset: Point2) -> Self {
        Self { scale: 1.0, offset }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == Point2::default()
    }

    /// `(scale factor, offset delta)` for one axis
    pub fn component(&self, axis: Axis) -> (f64, f64) {
        (self.scale, self.offset.get(axis))
    }
}

/// Per-plot coordinate pipeline and its derived ticks
#[derive(Debug, Clone)]
pub struct CoordinateTransform {
    rect: PixelRect,
    /// Column ranges after degenerate widening, before margin
    ranges: [DataRange; 2],
    range_margin: f64,
    epsilon: f64,
    inverted: [bool; 2],
    axes: [AxisTransform; 2],
    desired_ticks: usize,
    ticks: [Vec<Tick>; 2],
    tick_generation: u64,
}

impl CoordinateTransform {
    pub fn new(settings: &SplomSettings) -> Self {
        let mut transform = Self {
            rect: PixelRect::default(),
            ranges: [DataRange::default().widened(settings.degenerate_epsilon); 2],
            range_margin: settings.range_margin,
            epsilon: settings.degenerate_epsilon,
            inverted: [false; 2],
            axes: [AxisTransform::default(); 2],
            desired_ticks: settings.desired_tick_count,
            ticks: [Vec::new(), Vec::new()],
            tick_generation: 0,
        };
        transform.recompute_ticks();
        transform
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Set the drawable area. Returns whether it changed.
    pub fn set_rect(&mut self, rect: PixelRect) -> bool {
        if self.rect == rect {
            return false;
        }
        self.rect = rect;
        self.recompute_ticks();
        true
    }

    /// Bind the data extent of both axes; zero-span ranges are widened
    pub fn set_data_ranges(&mut self, x: DataRange, y: DataRange, invert_x: bool, invert_y: bool) {
        let ranges = [x.widened(self.epsilon), y.widened(self.epsilon)];
        let inverted = [invert_x, invert_y];
        if ranges == self.ranges && inverted == self.inverted {
            return;
        }
        self.ranges = ranges;
        self.inverted = inverted;
        self.recompute_ticks();
    }

    /// Column range after degenerate widening
    pub fn data_range(&self, axis: Axis) -> DataRange {
        self.ranges[axis.index()]
    }

    /// Range that maps onto the full plot rectangle
    pub fn padded_range(&self, axis: Axis) -> DataRange {
        self.ranges[axis.index()].with_margin(self.range_margin)
    }

    pub fn is_inverted(&self, axis: Axis) -> bool {
        self.inverted[axis.index()]
    }

    pub fn axis_transform(&self, axis: Axis) -> AxisTransform {
        self.axes[axis.index()]
    }

    pub fn scale(&self, axis: Axis) -> f64 {
        self.axes[axis.index()].scale
    }

    pub fn offset(&self) -> Point2 {
        Point2::new(self.axes[0].offset, self.axes[1].offset)
    }

    /// Map a data value onto the pixel axis
    pub fn data_to_pixel(&self, v: f64, axis: Axis) -> f64 {
        let i = axis.index();
        let (lo, hi) = self.rect.span(axis);
        let len = hi - lo;
        let mut local = self.padded_range(axis).normalize(v) * len;
        if self.inverted[i] {
            local = len - local;
        }
        lo + self.axes[i].apply(local)
    }

    /// Inverse of [`CoordinateTransform::data_to_pixel`].
    ///
    /// The pixel is first clamped into the plot rectangle, so positions past
    /// the plot border map onto the range ends.
    pub fn pixel_to_data(&self, p: f64, axis: Axis) -> f64 {
        let i = axis.index();
        let (lo, hi) = self.rect.span(axis);
        let len = hi - lo;
        let mut local = self.axes[i].invert(p - lo).clamp(0.0, len.max(0.0));
        if self.inverted[i] {
            local = len - local;
        }
        let t = if len > 0.0 { local / len } else { 0.0 };
        self.padded_range(axis).lerp(t)
    }

    pub fn data_to_pixel_point(&self, data: Point2) -> Point2 {
        Point2::new(self.data_to_pixel(data.x, Axis::X), self.data_to_pixel(data.y, Axis::Y))
    }

    pub fn pixel_to_data_point(&self, pixel: Point2) -> Point2 {
        Point2::new(self.pixel_to_data(pixel.x, Axis::X), self.pixel_to_data(pixel.y, Axis::Y))
    }

    /// Data interval currently visible along an axis
    pub fn visible_range(&self, axis: Axis) -> DataRange {
        let (lo, hi) = self.rect.span(axis);
        let a = self.pixel_to_data(lo, axis);
        let b = self.pixel_to_data(hi, axis);
        DataRange::new(a.min(b), a.max(b))
    }

    /// Replace both axes' affine parameters with a uniform scale
    pub fn set_transform(&mut self, scale: f64, offset: Point2) -> Result<bool, ViewError> {
        let invalid = || ViewError::InvalidTransform {
            scale,
            offset_x: offset.x,
            offset_y: offset.y,
        };
        let x = AxisTransform::new(scale, offset.x).ok_or_else(invalid)?;
        let y = AxisTransform::new(scale, offset.y).ok_or_else(invalid)?;
        Ok(self.replace_axes([x, y]))
    }

    /// Multiply the scale and shift the offset of both axes
    pub fn set_transform_delta(&mut self, delta: TransformDelta) -> Result<bool, ViewError> {
        let mut axes = self.axes;
        for axis in Axis::BOTH {
            let (factor, shift) = delta.component(axis);
            axes[axis.index()] = self.axes[axis.index()]
                .with_delta(factor, shift)
                .ok_or(ViewError::InvalidTransform {
                    scale: self.axes[axis.index()].scale * factor,
                    offset_x: delta.offset.x,
                    offset_y: delta.offset.y,
                })?;
        }
        Ok(self.replace_axes(axes))
    }

    /// Replace the affine parameters of one axis
    pub fn set_axis_transform(&mut self, axis: Axis, transform: AxisTransform) -> Result<bool, ViewError> {
        if !transform.is_valid() {
            return Err(ViewError::InvalidTransform {
                scale: transform.scale,
                offset_x: transform.offset,
                offset_y: transform.offset,
            });
        }
        let mut axes = self.axes;
        axes[axis.index()] = transform;
        Ok(self.replace_axes(axes))
    }

    fn replace_axes(&mut self, axes: [AxisTransform; 2]) -> bool {
        if axes == self.axes {
            return false;
        }
        self.axes = axes;
        self.recompute_ticks();
        true
    }

    pub fn ticks(&self, axis: Axis) -> &[Tick] {
        &self.ticks[axis.index()]
    }

    /// Bumped every time the ticks are recomputed
    pub fn tick_generation(&self) -> u64 {
        self.tick_generation
    }

    fn recompute_ticks(&mut self) {
        for axis in Axis::BOTH {
            let visible = self.visible_range(axis);
            let step = nice_step(visible.span(), self.desired_ticks).unwrap_or(0.0);
            let ticks = compute_nice_ticks(visible, self.desired_ticks)
                .into_iter()
                .map(|value| Tick {
                    value,
                    pixel: self.data_to_pixel(value, axis),
                    label: format_tick(value, step),
                })
                .collect();
            self.ticks[axis.index()] = ticks;
        }
        self.tick_generation += 1;
    }
}

impl PixelProjection for CoordinateTransform {
    fn data_to_pixel(&self, data: Point2) -> Point2 {
        self.data_to_pixel_point(data)
    }

    fn pixel_to_data(&self, pixel: Point2) -> Point2 {
        self.pixel_to_data_point(pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> CoordinateTransform {
        let mut t = CoordinateTransform::new(&SplomSettings::default());
        t.set_rect(PixelRect::new(Point2::new(0.0, 0.0), Point2::new(200.0, 100.0)));
        t.set_data_ranges(DataRange::new(-10.0, 10.0), DataRange::new(0.0, 1.0), false, false);
        t
    }

    #[test]
    fn test_margin_keeps_extremes_off_the_border() {
        let t = transform();
        let left = t.data_to_pixel(-10.0, Axis::X);
        let right = t.data_to_pixel(10.0, Axis::X);
        assert!(left > 0.0 && right < 200.0);
        assert!((t.data_to_pixel(0.0, Axis::X) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip_under_pan_zoom_and_inversion() {
        let mut t = transform();
        for (scale, offset, inverted) in [
            (1.0, Point2::new(0.0, 0.0), false),
            (3.5, Point2::new(-250.0, 40.0), false),
            (0.4, Point2::new(60.0, 20.0), true),
        ] {
            t.set_transform(scale, offset).unwrap();
            t.set_data_ranges(DataRange::new(-10.0, 10.0), DataRange::new(0.0, 1.0), inverted, inverted);
            for i in 0..=20 {
                let v = -10.0 + i as f64;
                let back = t.pixel_to_data(t.data_to_pixel(v, Axis::X), Axis::X);
                assert!((back - v).abs() < 1e-9, "{} -> {}", v, back);
                let w = i as f64 / 20.0;
                let back = t.pixel_to_data(t.data_to_pixel(w, Axis::Y), Axis::Y);
                assert!((back - w).abs() < 1e-9, "{} -> {}", w, back);
            }
        }
    }

    #[test]
    fn test_mapping_is_monotonic() {
        let mut t = transform();
        t.set_transform(2.0, Point2::new(-30.0, 0.0)).unwrap();
        let mut last = f64::NEG_INFINITY;
        for i in 0..=40 {
            let p = t.data_to_pixel(-10.0 + i as f64 * 0.5, Axis::X);
            assert!(p > last);
            last = p;
        }
    }

    #[test]
    fn test_inversion_mirrors_axis() {
        let mut t = transform();
        let before = t.data_to_pixel(-10.0, Axis::X);
        t.set_data_ranges(DataRange::new(-10.0, 10.0), DataRange::new(0.0, 1.0), true, false);
        assert!((t.data_to_pixel(10.0, Axis::X) - before).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_to_data_clamps_to_plot() {
        let t = transform();
        let far_right = t.pixel_to_data(10_000.0, Axis::X);
        assert!((far_right - t.padded_range(Axis::X).max).abs() < 1e-9);
        let far_left = t.pixel_to_data(-10_000.0, Axis::X);
        assert!((far_left - t.padded_range(Axis::X).min).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let mut t = transform();
        t.set_transform(2.0, Point2::new(5.0, 5.0)).unwrap();
        assert!(t.set_transform(0.0, Point2::new(0.0, 0.0)).is_err());
        assert!(t.set_transform(-1.0, Point2::new(0.0, 0.0)).is_err());
        assert!(t.set_transform(f64::NAN, Point2::new(0.0, 0.0)).is_err());
        assert!(t
            .set_transform_delta(TransformDelta { scale: 0.0, offset: Point2::default() })
            .is_err());
        assert_eq!(t.scale(Axis::X), 2.0);
        assert_eq!(t.offset(), Point2::new(5.0, 5.0));
    }

    #[test]
    fn test_identical_transform_skips_tick_recompute() {
        let mut t = transform();
        assert!(t.set_transform(2.0, Point2::new(1.0, 2.0)).unwrap());
        let generation = t.tick_generation();
        assert!(!t.set_transform(2.0, Point2::new(1.0, 2.0)).unwrap());
        assert!(!t.set_transform_delta(TransformDelta::pan(Point2::default())).unwrap());
        assert_eq!(t.tick_generation(), generation);

        t.set_transform_delta(TransformDelta::pan(Point2::new(3.0, 0.0))).unwrap();
        assert!(t.tick_generation() > generation);
        assert_eq!(t.offset(), Point2::new(4.0, 2.0));
    }

    #[test]
    fn test_ticks_follow_zoom() {
        let mut t = transform();
        let wide: Vec<f64> = t.ticks(Axis::X).iter().map(|tick| tick.value).collect();
        assert!(wide.contains(&0.0) && wide.contains(&10.0));

        // zoom 4x around the plot center
        t.set_transform(4.0, Point2::new(-300.0, 0.0)).unwrap();
        let visible = t.visible_range(Axis::X);
        assert!(visible.span() < 6.0);
        for tick in t.ticks(Axis::X) {
            assert!(visible.contains(tick.value));
            assert!(tick.pixel >= -1e-9 && tick.pixel <= 200.0 + 1e-9);
        }
    }

    #[test]
    fn test_degenerate_column_is_widened() {
        let mut t = transform();
        t.set_data_ranges(DataRange::new(5.0, 5.0), DataRange::new(5.0, 5.0), false, false);
        let range = t.data_range(Axis::X);
        assert!((range.min - 4.9).abs() < 1e-12 && (range.max - 5.1).abs() < 1e-12);
        assert!(t.data_to_pixel(5.0, Axis::X).is_finite());
        assert!((t.data_to_pixel(5.0, Axis::X) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_preserves_visible_fraction() {
        let axis = AxisTransform::new(3.0, -120.0).unwrap();
        let rescaled = axis.rescaled(100.0, 400.0);
        assert_eq!(rescaled.scale, 3.0);

        // left border of each view shows the same fraction of the axis
        let frac_small = axis.invert(0.0) / 100.0;
        let frac_large = rescaled.invert(0.0) / 400.0;
        assert!((frac_small - frac_large).abs() < 1e-12);
        assert_eq!(axis.rescaled(0.0, 400.0), axis);
        assert_eq!(AxisTransform::default().rescaled(100.0, 400.0), AxisTransform::default());
    }

    #[test]
    fn test_same_transform_same_window_anywhere() {
        let mut origin = transform();
        let mut shifted = transform();
        shifted.set_rect(PixelRect::new(Point2::new(640.0, 310.0), Point2::new(840.0, 410.0)));
        for t in [&mut origin, &mut shifted] {
            t.set_transform(2.0, Point2::new(0.0, 0.0)).unwrap();
        }
        for axis in Axis::BOTH {
            let a = origin.visible_range(axis);
            let b = shifted.visible_range(axis);
            assert!(a.span() > 0.0);
            assert!((a.min - b.min).abs() < 1e-9 && (a.max - b.max).abs() < 1e-9);
        }
        let p = shifted.data_to_pixel(3.0, Axis::X);
        assert!((p - 640.0 - origin.data_to_pixel(3.0, Axis::X)).abs() < 1e-9);
    }
}
