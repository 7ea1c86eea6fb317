//! Point and edge vector algebra
//!
//! Every function here is pure. Lengths that could reach zero are floored at a
//! caller-supplied `eps` so that downstream divisions stay finite.

use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, BundleResult};

/// A 2D point (or vector) with `f64` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product with another vector
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean norm
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// True when both coordinates are finite
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// A straight input edge. Its identity is its index in the input slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: Point,
    pub target: Point,
}

impl Edge {
    /// Create an edge between two points
    pub const fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    /// Build an edge from a `[x, y, xend, yend]` row.
    ///
    /// Rows with a different arity or any non-finite value are rejected.
    pub fn from_row(row: &[f64]) -> BundleResult<Self> {
        let [x, y, xend, yend] = row else {
            return Err(BundleError::InvalidInput(format!(
                "edge rows need exactly 4 coordinates, got {}",
                row.len()
            )));
        };
        let edge = Edge::new(Point::new(*x, *y), Point::new(*xend, *yend));
        if !edge.is_finite() {
            return Err(BundleError::InvalidInput(format!(
                "edge has non-finite coordinates: {row:?}"
            )));
        }
        Ok(edge)
    }

    /// The `[x, y, xend, yend]` row for this edge
    pub fn to_row(&self) -> [f64; 4] {
        [self.source.x, self.source.y, self.target.x, self.target.y]
    }

    pub fn midpoint(&self) -> Point {
        self.source.midpoint(self.target)
    }

    pub fn is_finite(&self) -> bool {
        self.source.is_finite() && self.target.is_finite()
    }
}

/// Direction vector of an edge (target minus source).
pub fn edge_vector(edge: &Edge) -> Point {
    edge.target - edge.source
}

/// Distance between two points.
pub fn euclidean_distance(p: Point, q: Point) -> f64 {
    (q - p).norm()
}

/// Length of the segment between two points, floored at `eps`.
pub fn segment_length(p: Point, q: Point, eps: f64) -> f64 {
    let length = euclidean_distance(p, q);
    if length < eps { eps } else { length }
}

/// Length of an edge, floored at `eps`.
pub fn edge_length(edge: &Edge, eps: f64) -> f64 {
    segment_length(edge.source, edge.target, eps)
}

/// Orthogonal projection of `point` onto the infinite line through `edge`.
///
/// The denominator is the squared eps-floored edge length, so a degenerate
/// edge projects every point onto (or next to) its source.
pub fn project_point_on_line(point: Point, edge: &Edge, eps: f64) -> Point {
    let s = edge.source;
    let t = edge.target;
    let length = edge_length(edge, eps);
    let r = ((s.y - point.y) * (s.y - t.y) - (s.x - point.x) * (t.x - s.x)) / (length * length);
    Point::new(s.x + r * (t.x - s.x), s.y + r * (t.y - s.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPS: f64 = 1e-8;

    fn edge(x: f64, y: f64, xend: f64, yend: f64) -> Edge {
        Edge::new(Point::new(x, y), Point::new(xend, yend))
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(b - a, Point::new(2.0, -3.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(b / 2.0, Point::new(1.5, -0.5));
        assert_eq!(a.dot(b), 1.0);

        let mut c = a;
        c += b;
        assert_eq!(c, Point::new(4.0, 1.0));
    }

    #[test]
    fn edge_vector_points_from_source_to_target() {
        let e = edge(1.0, 1.0, 4.0, 5.0);
        assert_eq!(edge_vector(&e), Point::new(3.0, 4.0));
    }

    #[test]
    fn edge_length_is_euclidean() {
        assert_abs_diff_eq!(edge_length(&edge(0.0, 0.0, 3.0, 4.0), EPS), 5.0);
    }

    #[test]
    fn edge_length_floors_at_eps() {
        assert_eq!(edge_length(&edge(2.0, 2.0, 2.0, 2.0), EPS), EPS);
        assert_eq!(edge_length(&edge(0.0, 0.0, 1e-12, 0.0), EPS), EPS);
    }

    #[test]
    fn projection_onto_horizontal_line() {
        let line = edge(0.0, 0.0, 10.0, 0.0);
        let projected = project_point_on_line(Point::new(3.0, 7.0), &line, EPS);
        assert_abs_diff_eq!(projected.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(projected.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn projection_extends_beyond_segment() {
        let line = edge(0.0, 0.0, 1.0, 1.0);
        let projected = project_point_on_line(Point::new(4.0, 2.0), &line, EPS);
        assert_abs_diff_eq!(projected.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(projected.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn projection_onto_degenerate_edge_is_finite() {
        let line = edge(5.0, 5.0, 5.0, 5.0);
        let projected = project_point_on_line(Point::new(1.0, 2.0), &line, EPS);
        assert!(projected.is_finite());
        assert_eq!(projected, Point::new(5.0, 5.0));
    }

    #[test]
    fn from_row_accepts_four_finite_values() {
        let e = Edge::from_row(&[0.0, 1.0, 2.0, 3.0]).expect("valid row");
        assert_eq!(e.to_row(), [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn from_row_rejects_wrong_arity() {
        assert!(matches!(
            Edge::from_row(&[0.0, 1.0, 2.0]),
            Err(BundleError::InvalidInput(_))
        ));
        assert!(matches!(
            Edge::from_row(&[0.0, 1.0, 2.0, 3.0, 4.0]),
            Err(BundleError::InvalidInput(_))
        ));
    }

    #[test]
    fn from_row_rejects_non_finite() {
        assert!(Edge::from_row(&[0.0, f64::NAN, 2.0, 3.0]).is_err());
        assert!(Edge::from_row(&[0.0, 1.0, f64::INFINITY, 3.0]).is_err());
    }
}
