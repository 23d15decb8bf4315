//! In-progress rectangle/lasso selection

use splom_core::Point2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Rectangle,
    Polygon,
}

/// Pixel-space outline of a selection being dragged
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionDraft {
    mode: SelectionMode,
    start: Point2,
    vertices: Vec<Point2>,
}

impl SelectionDraft {
    pub fn begin(mode: SelectionMode, start: Point2) -> Self {
        Self {
            mode,
            start,
            vertices: vec![start],
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Extend the outline to `p`.
    ///
    /// A rectangle is rebuilt from the start corner and `p`; a polygon gains
    /// `p` as a new vertex.
    pub fn update(&mut self, p: Point2) {
        match self.mode {
            SelectionMode::Rectangle => {
                let s = self.start;
                self.vertices = vec![s, Point2::new(p.x, s.y), p, Point2::new(s.x, p.y)];
            }
            SelectionMode::Polygon => {
                if self.vertices.last() != Some(&p) {
                    self.vertices.push(p);
                }
            }
        }
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_rebuilds_corners() {
        let mut draft = SelectionDraft::begin(SelectionMode::Rectangle, Point2::new(10.0, 10.0));
        draft.update(Point2::new(50.0, 30.0));
        draft.update(Point2::new(20.0, 40.0));
        assert_eq!(
            draft.vertices(),
            &[
                Point2::new(10.0, 10.0),
                Point2::new(20.0, 10.0),
                Point2::new(20.0, 40.0),
                Point2::new(10.0, 40.0),
            ]
        );
    }

    #[test]
    fn test_polygon_accumulates_vertices() {
        let mut draft = SelectionDraft::begin(SelectionMode::Polygon, Point2::new(0.0, 0.0));
        draft.update(Point2::new(5.0, 0.0));
        draft.update(Point2::new(5.0, 0.0));
        draft.update(Point2::new(5.0, 5.0));
        assert_eq!(draft.vertices().len(), 3);
    }
}
