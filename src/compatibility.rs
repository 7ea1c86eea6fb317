//! Pairwise edge compatibility
//!
//! Two edges attract each other during bundling only if they are compatible:
//! the product of their angle, scale, position and visibility scores must
//! reach the configured threshold. The resulting [`CompatibilityGraph`] is
//! computed once, from the original straight edges, and reused for every
//! cycle of the run.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geometry::{
    Edge, edge_length, edge_vector, euclidean_distance, project_point_on_line,
};

/// The four factors of a compatibility score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilityScores {
    pub angle: f64,
    pub scale: f64,
    pub position: f64,
    pub visibility: f64,
}

impl CompatibilityScores {
    /// Combined score
    pub fn product(&self) -> f64 {
        self.angle * self.scale * self.position * self.visibility
    }
}

/// Absolute cosine of the angle between two edges.
pub fn angle_compatibility(p: &Edge, q: &Edge, eps: f64) -> f64 {
    let dot = edge_vector(p).dot(edge_vector(q));
    (dot / (edge_length(p, eps) * edge_length(q, eps))).abs()
}

/// Penalizes length disparity; 1 for equal lengths.
pub fn scale_compatibility(p: &Edge, q: &Edge, eps: f64) -> f64 {
    let lp = edge_length(p, eps);
    let lq = edge_length(q, eps);
    let lavg = (lp + lq) / 2.0;
    2.0 / (lavg / lp.min(lq) + lp.max(lq) / lavg)
}

/// Penalizes midpoint separation relative to the average length.
pub fn position_compatibility(p: &Edge, q: &Edge, eps: f64) -> f64 {
    let lavg = (edge_length(p, eps) + edge_length(q, eps)) / 2.0;
    lavg / (lavg + euclidean_distance(p.midpoint(), q.midpoint()))
}

/// Directed visibility of `q` as seen from `p`.
///
/// `q`'s endpoints are projected onto `p`'s line. The score falls from 1 as
/// `p`'s midpoint moves away from the middle of the projected interval, and is
/// 0 once it leaves the interval or when the interval collapses below `eps`.
pub fn edge_visibility(p: &Edge, q: &Edge, eps: f64) -> f64 {
    let i0 = project_point_on_line(q.source, p, eps);
    let i1 = project_point_on_line(q.target, p, eps);
    let span = euclidean_distance(i0, i1);
    if span < eps {
        return 0.0;
    }
    let offset = euclidean_distance(p.midpoint(), i0.midpoint(i1));
    (1.0 - 2.0 * offset / span).max(0.0)
}

/// Symmetric visibility: the weaker of the two directed scores.
pub fn visibility_compatibility(p: &Edge, q: &Edge, eps: f64) -> f64 {
    edge_visibility(p, q, eps).min(edge_visibility(q, p, eps))
}

/// All four factors for a pair of edges.
pub fn compatibility_scores(p: &Edge, q: &Edge, eps: f64) -> CompatibilityScores {
    CompatibilityScores {
        angle: angle_compatibility(p, q, eps),
        scale: scale_compatibility(p, q, eps),
        position: position_compatibility(p, q, eps),
        visibility: visibility_compatibility(p, q, eps),
    }
}

/// Whether a combined score links two edges.
///
/// A zero score never links, even at threshold 0.
fn passes(score: f64, threshold: f64) -> bool {
    score > 0.0 && score >= threshold
}

/// Counters gathered while building a [`CompatibilityGraph`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompatibilityStats {
    /// Unordered pairs of distinct edges
    pub total_pairs: usize,
    /// Pairs whose angle, scale and position scores all reached the threshold
    pub candidate_pairs: usize,
    /// Pairs linked in the graph
    pub compatible_pairs: usize,
}

/// Symmetric adjacency over edge indices.
///
/// Neighbor lists are sorted ascending; an edge is never its own neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityGraph {
    neighbors: Vec<Vec<usize>>,
    stats: CompatibilityStats,
}

impl CompatibilityGraph {
    /// Score every unordered pair of `edges` and link the compatible ones.
    ///
    /// Visibility, the costliest factor, is only evaluated for pairs whose
    /// other three factors each reach the threshold. Since every factor is at
    /// most 1, skipping the rest cannot change the outcome.
    pub fn build(edges: &[Edge], threshold: f64, eps: f64) -> Self {
        let n = edges.len();
        let row = |i: usize| upper_row(edges, i, threshold, eps);

        #[cfg(feature = "parallel")]
        let rows: Vec<UpperRow> = (0..n).into_par_iter().map(row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<UpperRow> = (0..n).map(row).collect();

        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut stats = CompatibilityStats {
            total_pairs: n * n.saturating_sub(1) / 2,
            ..CompatibilityStats::default()
        };

        // Row i only holds partners j > i, so visiting rows in order keeps
        // every list sorted.
        for (i, row) in rows.into_iter().enumerate() {
            stats.candidate_pairs += row.candidates;
            stats.compatible_pairs += row.partners.len();
            for j in row.partners {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }

        Self { neighbors, stats }
    }

    /// A graph with `n` edges and no links
    pub fn empty(n: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); n],
            stats: CompatibilityStats {
                total_pairs: n * n.saturating_sub(1) / 2,
                ..CompatibilityStats::default()
            },
        }
    }

    /// Compatible partners of `edge`, ascending
    pub fn neighbors(&self, edge: usize) -> &[usize] {
        &self.neighbors[edge]
    }

    pub fn is_compatible(&self, a: usize, b: usize) -> bool {
        self.neighbors
            .get(a)
            .is_some_and(|list| list.binary_search(&b).is_ok())
    }

    /// Number of linked unordered pairs
    pub fn edge_count(&self) -> usize {
        self.stats.compatible_pairs
    }

    /// Number of edges (vertices of this graph)
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn stats(&self) -> CompatibilityStats {
        self.stats
    }
}

/// Compatible partners `j > i` of edge `i`
struct UpperRow {
    partners: Vec<usize>,
    candidates: usize,
}

fn upper_row(edges: &[Edge], i: usize, threshold: f64, eps: f64) -> UpperRow {
    let p = &edges[i];
    let mut partners = Vec::new();
    let mut candidates = 0;

    for (j, q) in edges.iter().enumerate().skip(i + 1) {
        let angle = angle_compatibility(p, q, eps);
        let scale = scale_compatibility(p, q, eps);
        let position = position_compatibility(p, q, eps);
        if angle < threshold || scale < threshold || position < threshold {
            continue;
        }
        candidates += 1;

        let visibility = visibility_compatibility(p, q, eps);
        if passes(angle * scale * position * visibility, threshold) {
            partners.push(j);
        }
    }

    UpperRow {
        partners,
        candidates,
    }
}
