//! Control-point skeletons
//!
//! Every edge carries the same number of control points at a given cycle, so
//! all skeletons live in one contiguous buffer with a fixed stride. Point `k`
//! of edge `e` sits at `e * stride + k`. The first and last point of each
//! skeleton are the edge's endpoints and are copied verbatim on every
//! resubdivision.

use crate::error::{BundleError, BundleResult};
use crate::geometry::{Edge, Point, euclidean_distance};

/// Polylines for all edges of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Skeletons {
    stride: usize,
    points: Vec<Point>,
}

impl Skeletons {
    /// Straight two-point skeletons, one per edge
    pub fn from_edges(edges: &[Edge]) -> Self {
        let points = edges
            .iter()
            .flat_map(|e| [e.source, e.target])
            .collect();
        Self { stride: 2, points }
    }

    /// Initial skeletons with `subdivisions` interior points along each
    /// straight edge.
    pub fn seed(edges: &[Edge], subdivisions: usize, eps: f64) -> BundleResult<Self> {
        Self::from_edges(edges).resubdivide(subdivisions, eps)
    }

    /// Resample every skeleton to `subdivisions` interior points.
    pub fn resubdivide(&self, subdivisions: usize, eps: f64) -> BundleResult<Self> {
        let (stride, len) = layout(self.edge_count(), subdivisions)?;
        let mut points = vec![Point::default(); len];
        for (path, out) in self.paths().zip(points.chunks_mut(stride)) {
            resample_path(path, eps, out);
        }
        Ok(Self { stride, points })
    }

    /// Points needed for `edge_count` skeletons of `subdivisions` interior
    /// points each.
    ///
    /// Fails when the buffer cannot be addressed.
    pub fn buffer_len(edge_count: usize, subdivisions: usize) -> BundleResult<usize> {
        layout(edge_count, subdivisions).map(|(_, len)| len)
    }

    pub fn edge_count(&self) -> usize {
        self.points.len() / self.stride
    }

    /// Control points per edge, endpoints included
    pub fn points_per_edge(&self) -> usize {
        self.stride
    }

    /// Interior control points per edge
    pub fn subdivisions(&self) -> usize {
        self.stride - 2
    }

    /// Skeleton of one edge
    pub fn path(&self, edge: usize) -> &[Point] {
        let start = edge * self.stride;
        &self.points[start..start + self.stride]
    }

    /// Skeletons in edge order
    pub fn paths(&self) -> impl Iterator<Item = &[Point]> {
        self.points.chunks(self.stride)
    }

    pub(crate) fn points(&self) -> &[Point] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }
}

/// Stride and total length of a skeleton buffer
fn layout(edge_count: usize, subdivisions: usize) -> BundleResult<(usize, usize)> {
    subdivisions
        .checked_add(2)
        .and_then(|stride| Some((stride, stride.checked_mul(edge_count)?)))
        .filter(|&(_, len)| len <= isize::MAX as usize / size_of::<Point>())
        .ok_or_else(|| {
            BundleError::InvalidConfiguration(format!(
                "{edge_count} edges with {subdivisions} subdivision points each exceed the addressable point buffer"
            ))
        })
}

/// Resample `path` into `out`, keeping both endpoints.
///
/// `out.len() - 2` interior points are placed at equal arc-length spacing along
/// `path`. A single interior point is placed at the midpoint of the endpoints.
/// Segments no longer than `eps` are not advanced along, so a collapsed path
/// keeps every point on its source.
pub fn resample_path(path: &[Point], eps: f64, out: &mut [Point]) {
    let first = path[0];
    let last = path[path.len() - 1];
    let interior = out.len() - 2;
    out[0] = first;
    out[interior + 1] = last;

    match interior {
        0 => return,
        1 => {
            out[1] = first.midpoint(last);
            return;
        }
        _ => {}
    }

    let segment_lengths: Vec<f64> = path
        .windows(2)
        .map(|w| euclidean_distance(w[0], w[1]))
        .collect();
    let total: f64 = segment_lengths.iter().sum();
    let spacing = total / (interior + 1) as f64;

    let mut current = first;
    let mut segment = 0;
    let mut remaining = segment_lengths[0];

    for slot in &mut out[1..=interior] {
        let mut needed = spacing;
        while needed > remaining && segment + 2 < path.len() {
            needed -= remaining;
            segment += 1;
            current = path[segment];
            remaining = segment_lengths[segment];
        }

        let length = segment_lengths[segment];
        if length > eps {
            let direction = (path[segment + 1] - path[segment]) / length;
            current = current + direction * needed;
            remaining -= needed;
        }
        *slot = current;
    }
}
