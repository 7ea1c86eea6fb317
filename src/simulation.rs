//! Spring/electrostatic relaxation of edge skeletons
//!
//! One iteration reads every control point from a front buffer and writes the
//! displaced points to a back buffer; the two are swapped afterwards. Every
//! point therefore sees the same snapshot regardless of the order (or thread)
//! in which edges are processed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::compatibility::CompatibilityGraph;
use crate::config::BundleConfig;
use crate::geometry::{Point, segment_length};
use crate::subdivision::Skeletons;

/// Largest spring displacement per step, as a fraction of the pull toward the
/// neighbors. Explicit steps above 0.5 overshoot and diverge.
pub const MAX_SPRING_GAIN: f64 = 0.5;

/// Pull of a control point toward its two neighbors on the same skeleton.
pub fn spring_force(prev: Point, current: Point, next: Point, stiffness: f64) -> Point {
    ((prev - current) + (next - current)) * stiffness
}

/// Force simulation over a fixed compatibility graph
pub struct ForceSimulator<'a> {
    graph: &'a CompatibilityGraph,
    config: &'a BundleConfig,
    /// Normalized per-edge weights; `None` weighs every edge 1.0
    weights: Option<&'a [f64]>,
}

impl<'a> ForceSimulator<'a> {
    /// Create a simulator for the edges described by `graph`
    pub fn new(graph: &'a CompatibilityGraph, config: &'a BundleConfig) -> Self {
        Self {
            graph,
            config,
            weights: None,
        }
    }

    /// Scale the attraction exerted by each edge by its weight
    pub fn with_weights(mut self, weights: &'a [f64]) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Run `iterations` relaxation steps at `step_size`.
    pub fn relax(&self, skeletons: Skeletons, iterations: usize, step_size: f64) -> Skeletons {
        let mut front = skeletons;
        let mut back = front.clone();
        for _ in 0..iterations {
            self.step(&front, &mut back, step_size);
            std::mem::swap(&mut front, &mut back);
        }
        front
    }

    /// One relaxation step from `front` into `back`.
    ///
    /// `back` must have the same shape as `front`; its previous contents are
    /// overwritten.
    pub fn step(&self, front: &Skeletons, back: &mut Skeletons, step_size: f64) {
        debug_assert_eq!(front.points_per_edge(), back.points_per_edge());
        debug_assert_eq!(front.edge_count(), back.edge_count());
        let stride = front.points_per_edge();

        #[cfg(feature = "parallel")]
        back.points_mut()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(edge, out)| self.relax_edge(edge, front, out, step_size));
        #[cfg(not(feature = "parallel"))]
        back.points_mut()
            .chunks_mut(stride)
            .enumerate()
            .for_each(|(edge, out)| self.relax_edge(edge, front, out, step_size));
    }

    fn relax_edge(&self, edge: usize, front: &Skeletons, out: &mut [Point], step_size: f64) {
        let path = front.path(edge);
        let last = path.len() - 1;
        out[0] = path[0];
        out[last] = path[last];

        // The spring weakens as the skeleton gains segments.
        let length = segment_length(path[0], path[last], self.config.eps);
        let stiffness = self.config.spring_constant / (length * last as f64);
        // Short edges get very stiff springs.
        let spring_gain = (step_size * stiffness).min(MAX_SPRING_GAIN);
        let attraction = self.config.electrostatic_constant * step_size;
        let partners = self.graph.neighbors(edge);

        for i in 1..last {
            let spring = spring_force(path[i - 1], path[i], path[i + 1], spring_gain);
            let electrostatic = self.electrostatic_force(front, partners, i, path[i]);
            out[i] = path[i] + spring + electrostatic * attraction;
        }
    }

    /// Sum of weighted unit vectors from `point` toward the control point with
    /// the same index on every compatible edge.
    fn electrostatic_force(
        &self,
        front: &Skeletons,
        partners: &[usize],
        index: usize,
        point: Point,
    ) -> Point {
        let stride = front.points_per_edge();
        let points = front.points();
        let mut force = Point::default();
        for &other in partners {
            let diff = points[other * stride + index] - point;
            let distance = diff.norm().max(self.config.eps);
            let weight = self.weights.map_or(1.0, |w| w[other]);
            force += diff * weight / distance;
        }
        force
    }
}
