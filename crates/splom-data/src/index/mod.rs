//! Uniform bucket grid for point queries
//!
//! Rows are bucketed by their data-space position, so the index only has
//! to be rebuilt when the bound columns, their ranges or their inversion
//! change. Pan and zoom never touch it.

use std::ops::RangeInclusive;

use splom_core::{Axis, DataRange, Point2};

use crate::PointTable;

/// Mapping between a plot's data space and its pixel space
pub trait PixelProjection {
    fn data_to_pixel(&self, data: Point2) -> Point2;
    fn pixel_to_data(&self, pixel: Point2) -> Point2;
}

/// Work done by one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub buckets_visited: usize,
    pub rows_visited: usize,
}

/// Row indices bucketed on a fixed-size grid over two columns
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    width: usize,
    height: usize,
    /// Bucket `(bx, by)` lives at `bx * height + by`
    buckets: Vec<Vec<usize>>,
    ranges: [DataRange; 2],
    columns: Option<(usize, usize)>,
    indexed_rows: usize,
}

impl SpatialIndex {
    /// Create an empty index with the given `(width, height)` bucket count
    pub fn new(resolution: (usize, usize)) -> Self {
        let width = resolution.0.max(1);
        let height = resolution.1.max(1);
        Self {
            width,
            height,
            buckets: vec![Vec::new(); width * height],
            ranges: [DataRange::default(); 2],
            columns: None,
            indexed_rows: 0,
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Columns the index was last built for
    pub fn columns(&self) -> Option<(usize, usize)> {
        self.columns
    }

    /// Number of rows held in the buckets
    pub fn len(&self) -> usize {
        self.indexed_rows
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_rows == 0
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.columns = None;
        self.indexed_rows = 0;
    }

    /// Re-bucket every row of `table` for the `(x_col, y_col)` pair.
    ///
    /// `x_range`/`y_range` are the extents the grid spans, normally the
    /// margin-adjusted column ranges. Rows with a non-finite coordinate are
    /// left out.
    pub fn rebuild(
        &mut self,
        table: &PointTable,
        x_col: usize,
        y_col: usize,
        x_range: DataRange,
        y_range: DataRange,
    ) {
        self.clear();
        self.ranges = [x_range, y_range];

        let (Some(xs), Some(ys)) = (table.values(x_col), table.values(y_col)) else {
            tracing::warn!("Cannot index missing column pair ({}, {})", x_col, y_col);
            return;
        };

        for (row, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let bx = self.bucket_coord(x, Axis::X);
            let by = self.bucket_coord(y, Axis::Y);
            self.buckets[bx * self.height + by].push(row);
            self.indexed_rows += 1;
        }
        self.columns = Some((x_col, y_col));

        tracing::debug!(
            "Rebuilt spatial index for columns ({}, {}): {} rows in {}x{} buckets",
            x_col,
            y_col,
            self.indexed_rows,
            self.width,
            self.height
        );
    }

    fn bucket_coord(&self, v: f64, axis: Axis) -> usize {
        let range = self.ranges[axis.index()];
        let count = match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        };
        let t = if range.is_degenerate() { 0.0 } else { range.normalize(v) };
        let coord = (t * count as f64).floor();
        if coord.is_nan() || coord < 0.0 {
            0
        } else {
            (coord as usize).min(count - 1)
        }
    }

    /// Buckets covering the data-space box spanned by `a` and `b`
    fn bucket_window(&self, a: Point2, b: Point2) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
        let x0 = self.bucket_coord(a.x.min(b.x), Axis::X);
        let x1 = self.bucket_coord(a.x.max(b.x), Axis::X);
        let y0 = self.bucket_coord(a.y.min(b.y), Axis::Y);
        let y1 = self.bucket_coord(a.y.max(b.y), Axis::Y);
        (x0..=x1, y0..=y1)
    }

    /// Rows of the given bucket window in scan order: ascending bucket x,
    /// then y, then ascending row index within a bucket.
    fn scan<'a>(
        &'a self,
        xs: RangeInclusive<usize>,
        ys: RangeInclusive<usize>,
        stats: &'a mut ScanStats,
    ) -> impl Iterator<Item = usize> + 'a {
        xs.flat_map(move |bx| ys.clone().map(move |by| bx * self.height + by))
            .flat_map(move |bucket| {
                stats.buckets_visited += 1;
                stats.rows_visited += self.buckets[bucket].len();
                self.buckets[bucket].iter().copied()
            })
    }

    /// Filter-passing row closest to `pixel` within `radius_px`
    pub fn nearest(
        &self,
        table: &PointTable,
        pixel: Point2,
        projection: &impl PixelProjection,
        radius_px: f64,
    ) -> Option<usize> {
        self.nearest_traced(table, pixel, projection, radius_px).0
    }

    /// Like [`SpatialIndex::nearest`], also reporting how much was scanned.
    ///
    /// When distances tie exactly, the row scanned last wins.
    pub fn nearest_traced(
        &self,
        table: &PointTable,
        pixel: Point2,
        projection: &impl PixelProjection,
        radius_px: f64,
    ) -> (Option<usize>, ScanStats) {
        let mut stats = ScanStats::default();
        let Some((x_col, y_col)) = self.columns else {
            return (None, stats);
        };
        if self.is_empty() || !(radius_px > 0.0) || !pixel.is_finite() {
            return (None, stats);
        }
        let (Some(xs), Some(ys)) = (table.values(x_col), table.values(y_col)) else {
            return (None, stats);
        };

        let corner_a = projection.pixel_to_data(Point2::new(pixel.x - radius_px, pixel.y - radius_px));
        let corner_b = projection.pixel_to_data(Point2::new(pixel.x + radius_px, pixel.y + radius_px));
        let (bxs, bys) = self.bucket_window(corner_a, corner_b);

        let max_dist_sq = radius_px * radius_px;
        let mut best: Option<(usize, f64)> = None;
        for row in self.scan(bxs, bys, &mut stats) {
            if !table.matches_filter(row) {
                continue;
            }
            let (Some(&x), Some(&y)) = (xs.get(row), ys.get(row)) else {
                continue;
            };
            let dist_sq = projection.data_to_pixel(Point2::new(x, y)).distance_sq(pixel);
            if dist_sq > max_dist_sq {
                continue;
            }
            if best.map_or(true, |(_, best_sq)| dist_sq <= best_sq) {
                best = Some((row, dist_sq));
            }
        }

        tracing::trace!(
            "nearest query visited {} buckets / {} rows",
            stats.buckets_visited,
            stats.rows_visited
        );
        (best.map(|(row, _)| row), stats)
    }

    /// Filter-passing rows whose data point lies inside `polygon`
    /// (even-odd rule), in ascending order.
    pub fn rows_in_polygon(&self, table: &PointTable, polygon: &[Point2]) -> Vec<usize> {
        self.rows_in_polygon_traced(table, polygon).0
    }

    pub fn rows_in_polygon_traced(&self, table: &PointTable, polygon: &[Point2]) -> (Vec<usize>, ScanStats) {
        let mut stats = ScanStats::default();
        let Some((x_col, y_col)) = self.columns else {
            return (Vec::new(), stats);
        };
        if polygon.len() < 3 || polygon.iter().any(|p| !p.is_finite()) {
            return (Vec::new(), stats);
        }
        let (Some(xs), Some(ys)) = (table.values(x_col), table.values(y_col)) else {
            return (Vec::new(), stats);
        };

        let mut min = polygon[0];
        let mut max = polygon[0];
        for p in polygon {
            min = Point2::new(min.x.min(p.x), min.y.min(p.y));
            max = Point2::new(max.x.max(p.x), max.y.max(p.y));
        }
        if max.x <= min.x || max.y <= min.y {
            return (Vec::new(), stats);
        }
        let grid = [self.ranges[0], self.ranges[1]];
        if max.x < grid[0].min || min.x > grid[0].max || max.y < grid[1].min || min.y > grid[1].max {
            return (Vec::new(), stats);
        }

        let (bxs, bys) = self.bucket_window(min, max);
        let mut rows: Vec<usize> = self
            .scan(bxs, bys, &mut stats)
            .filter(|&row| table.matches_filter(row))
            .filter(|&row| match (xs.get(row), ys.get(row)) {
                (Some(&x), Some(&y)) => point_in_polygon(Point2::new(x, y), polygon),
                _ => false,
            })
            .collect();
        rows.sort_unstable();
        (rows, stats)
    }
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(p: Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps `[0, 1]` data onto a 1000x1000 pixel square
    struct UnitProjection;

    impl PixelProjection for UnitProjection {
        fn data_to_pixel(&self, data: Point2) -> Point2 {
            Point2::new(data.x * 1000.0, data.y * 1000.0)
        }

        fn pixel_to_data(&self, pixel: Point2) -> Point2 {
            Point2::new(pixel.x / 1000.0, pixel.y / 1000.0)
        }
    }

    fn uniform_table(rows: usize) -> PointTable {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let mut xs = Vec::with_capacity(rows);
        let mut ys = Vec::with_capacity(rows);
        for _ in 0..rows {
            xs.push(next());
            ys.push(next());
        }
        PointTable::new(vec![("x".to_string(), xs), ("y".to_string(), ys)]).unwrap()
    }

    fn indexed(table: &PointTable) -> SpatialIndex {
        let mut index = SpatialIndex::new((100, 100));
        index.rebuild(table, 0, 1, DataRange::new(0.0, 1.0), DataRange::new(0.0, 1.0));
        index
    }

    fn brute_force_nearest(table: &PointTable, pixel: Point2, radius: f64) -> Option<f64> {
        let xs = table.values(0).unwrap();
        let ys = table.values(1).unwrap();
        (0..table.row_count())
            .filter(|&row| table.matches_filter(row))
            .map(|row| UnitProjection.data_to_pixel(Point2::new(xs[row], ys[row])).distance_sq(pixel))
            .filter(|&d| d <= radius * radius)
            .min_by(|a, b| a.partial_cmp(b).unwrap())
    }

    #[test]
    fn test_nearest_scans_only_local_buckets() {
        let table = uniform_table(1000);
        let index = indexed(&table);
        assert_eq!(index.len(), 1000);

        let pixel = Point2::new(480.0, 520.0);
        let (row, stats) = index.nearest_traced(&table, pixel, &UnitProjection, 56.0);
        assert!(stats.buckets_visited <= 13 * 13, "visited {} buckets", stats.buckets_visited);
        assert!(stats.rows_visited < 100, "visited {} rows", stats.rows_visited);

        let expected = brute_force_nearest(&table, pixel, 56.0);
        match (row, expected) {
            (Some(row), Some(best)) => {
                let p = Point2::new(table.value(0, row).unwrap(), table.value(1, row).unwrap());
                assert_eq!(UnitProjection.data_to_pixel(p).distance_sq(pixel), best);
            }
            (None, None) => {}
            other => panic!("index and brute force disagree: {:?}", other),
        }
    }

    #[test]
    fn test_nearest_skips_filtered_rows() {
        let mut table = PointTable::new(vec![
            ("x".to_string(), vec![0.5, 0.51]),
            ("y".to_string(), vec![0.5, 0.5]),
        ])
        .unwrap();
        let index = indexed(&table);
        let pixel = Point2::new(500.0, 500.0);
        assert_eq!(index.nearest(&table, pixel, &UnitProjection, 20.0), Some(0));

        table.set_row_filter(0, false).unwrap();
        assert_eq!(index.nearest(&table, pixel, &UnitProjection, 20.0), Some(1));

        table.set_row_filter(1, false).unwrap();
        assert_eq!(index.nearest(&table, pixel, &UnitProjection, 20.0), None);
    }

    #[test]
    fn test_nearest_respects_radius() {
        let table = PointTable::new(vec![("x".to_string(), vec![0.1]), ("y".to_string(), vec![0.1])]).unwrap();
        let index = indexed(&table);
        assert_eq!(index.nearest(&table, Point2::new(900.0, 900.0), &UnitProjection, 5.0), None);
        assert_eq!(index.nearest(&table, Point2::new(103.0, 104.0), &UnitProjection, 5.0), Some(0));
    }

    #[test]
    fn test_equal_distance_tie_goes_to_last_scanned() {
        // Rows 0 and 1 share a bucket and sit at the same distance
        let table = PointTable::new(vec![
            ("x".to_string(), vec![0.5, 0.5]),
            ("y".to_string(), vec![0.502, 0.502]),
        ])
        .unwrap();
        let index = indexed(&table);
        assert_eq!(index.nearest(&table, Point2::new(500.0, 500.0), &UnitProjection, 10.0), Some(1));
    }

    #[test]
    fn test_full_cover_polygon_returns_all_visible_rows() {
        let mut table = uniform_table(500);
        for row in (0..500).step_by(7) {
            table.set_row_filter(row, false).unwrap();
        }
        let index = indexed(&table);
        let polygon = [
            Point2::new(-0.1, -0.1),
            Point2::new(1.1, -0.1),
            Point2::new(1.1, 1.1),
            Point2::new(-0.1, 1.1),
        ];
        let expected: Vec<usize> = (0..500).filter(|&row| table.matches_filter(row)).collect();
        assert_eq!(index.rows_in_polygon(&table, &polygon), expected);
    }

    #[test]
    fn test_triangle_selection() {
        let table = PointTable::new(vec![
            ("x".to_string(), vec![0.1, 0.8, 0.4, 0.6]),
            ("y".to_string(), vec![0.1, 0.1, 0.7, 0.6]),
        ])
        .unwrap();
        let index = indexed(&table);
        let triangle = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert_eq!(index.rows_in_polygon(&table, &triangle), vec![0, 1]);
    }

    #[test]
    fn test_degenerate_polygons_select_nothing() {
        let table = uniform_table(50);
        let index = indexed(&table);
        assert!(index.rows_in_polygon(&table, &[]).is_empty());
        assert!(index
            .rows_in_polygon(&table, &[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)])
            .is_empty());
        let collinear = [Point2::new(0.0, 0.0), Point2::new(0.5, 0.5), Point2::new(1.0, 1.0)];
        assert!(index.rows_in_polygon(&table, &collinear).is_empty());
    }

    #[test]
    fn test_figure_eight_lasso() {
        let table = PointTable::new(vec![
            ("x".to_string(), vec![0.2, 0.8, 0.5, 0.5]),
            ("y".to_string(), vec![0.5, 0.5, 0.2, 0.8]),
        ])
        .unwrap();
        let index = indexed(&table);
        // crossing lobes: signed area cancels to zero, both lobes are inside
        let lasso = [
            Point2::new(0.1, 0.1),
            Point2::new(0.9, 0.9),
            Point2::new(0.9, 0.1),
            Point2::new(0.1, 0.9),
        ];
        assert_eq!(index.rows_in_polygon(&table, &lasso), vec![0, 1]);

        let flat = [Point2::new(0.1, 0.5), Point2::new(0.9, 0.5), Point2::new(0.5, 0.5)];
        assert!(index.rows_in_polygon(&table, &flat).is_empty());
    }

    #[test]
    fn test_empty_table() {
        let table = PointTable::new(vec![("x".to_string(), vec![]), ("y".to_string(), vec![])]).unwrap();
        let index = indexed(&table);
        assert!(index.is_empty());
        assert_eq!(index.nearest(&table, Point2::new(1.0, 1.0), &UnitProjection, 50.0), None);
    }

    #[test]
    fn test_polygon_helpers() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(Point2::new(1.0, 1.0), &square));
        assert!(!point_in_polygon(Point2::new(3.0, 1.0), &square));
    }
}
