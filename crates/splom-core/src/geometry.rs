//! Geometry primitives shared by the transform, index and plot layers

use serde::{Deserialize, Serialize};

/// One of the two plot axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Both axes in canonical order
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    /// Position of the axis in `[x, y]` style arrays
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// A 2D point, used for both data-space and pixel-space positions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component along the given axis
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn distance_sq(&self, other: Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Axis-aligned rectangle in plot-local pixel space.
///
/// Plot-local pixel space has its y axis pointing up; flipping to the
/// host's screen orientation is left to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub min: Point2,
    pub max: Point2,
}

impl PixelRect {
    /// Create a rectangle from two corners in any order
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_min_size(min: Point2, width: f64, height: f64) -> Self {
        Self::new(min, Point2::new(min.x + width, min.y + height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// `(min, max)` extent along one axis
    pub fn span(&self, axis: Axis) -> (f64, f64) {
        (self.min.get(axis), self.max.get(axis))
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Closest point inside the rectangle
    pub fn clamp(&self, p: Point2) -> Point2 {
        Point2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// Closed interval of data values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
}

impl Default for DataRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0 }
    }
}

impl DataRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range of the finite values in `values`; `[0, 0]` when there are none
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Self {
        let mut range: Option<DataRange> = None;
        for &v in values {
            if !v.is_finite() {
                continue;
            }
            range = Some(match range {
                Some(r) => DataRange::new(r.min.min(v), r.max.max(v)),
                None => DataRange::new(v, v),
            });
        }
        range.unwrap_or_default()
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.span() > 0.0)
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    /// Widen a zero-span range symmetrically by `epsilon`
    pub fn widened(&self, epsilon: f64) -> Self {
        if self.is_degenerate() {
            let center = if self.min.is_finite() { self.min } else { 0.0 };
            DataRange::new(center - epsilon, center + epsilon)
        } else {
            *self
        }
    }

    /// Pad both ends by `fraction` of the span
    pub fn with_margin(&self, fraction: f64) -> Self {
        let pad = self.span() * fraction;
        DataRange::new(self.min - pad, self.max + pad)
    }

    /// Position of `v` inside the range, 0 at `min` and 1 at `max`
    pub fn normalize(&self, v: f64) -> f64 {
        (v - self.min) / self.span()
    }

    pub fn lerp(&self, t: f64) -> f64 {
        self.min + t * self.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_values_skips_non_finite() {
        let values = [3.0, f64::NAN, -1.0, f64::INFINITY, 2.0];
        let range = DataRange::from_values(&values);
        assert_eq!(range, DataRange::new(-1.0, 3.0));
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        let range = DataRange::new(5.0, 5.0).widened(0.1);
        assert!((range.min - 4.9).abs() < 1e-12);
        assert!((range.max - 5.1).abs() < 1e-12);
        assert_eq!(DataRange::new(0.0, 2.0).widened(0.1), DataRange::new(0.0, 2.0));
    }

    #[test]
    fn test_rect_clamp_and_contains() {
        let rect = PixelRect::new(Point2::new(10.0, 20.0), Point2::new(0.0, 0.0));
        assert_eq!(rect.min, Point2::new(0.0, 0.0));
        assert!(rect.contains(Point2::new(5.0, 5.0)));
        assert_eq!(rect.clamp(Point2::new(-3.0, 25.0)), Point2::new(0.0, 20.0));
    }
}
