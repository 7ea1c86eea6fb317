//! Bundling orchestration
//!
//! A run validates its input, builds the compatibility graph once from the
//! straight edges, then walks the [`CycleSchedule`]: every cycle resubdivides
//! the skeletons (except the first, which is seeded at the initial level) and
//! relaxes them. The final skeletons are flattened into [`BundledPoint`]
//! records.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compatibility::CompatibilityGraph;
use crate::config::BundleConfig;
use crate::error::{BundleError, BundleResult};
use crate::geometry::Edge;
use crate::simulation::ForceSimulator;
use crate::subdivision::Skeletons;

/// One point of a bundled edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BundledPoint {
    pub x: f64,
    pub y: f64,
    /// Position along the skeleton: 0.0 at the source, 1.0 at the target
    pub index: f64,
    /// Index of the input edge this point belongs to
    pub group: usize,
}

/// Parameters of a single cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePlan {
    pub cycle: usize,
    pub subdivisions: usize,
    pub iterations: usize,
    pub step_size: f64,
}

/// The multiplicative cycle schedule of a configuration.
///
/// Cycle 0 runs at the configured subdivisions, iterations and step size.
/// Each following cycle multiplies the subdivisions by `P_rate`, floors the
/// iterations times `I_rate` and halves the step size.
#[derive(Debug, Clone)]
pub struct CycleSchedule {
    cycles: usize,
    subdivision_rate: usize,
    iteration_rate: f64,
    next: CyclePlan,
}

impl CycleSchedule {
    pub fn new(config: &BundleConfig) -> Self {
        Self {
            cycles: config.cycles,
            subdivision_rate: config.subdivision_rate,
            iteration_rate: config.iteration_rate,
            next: CyclePlan {
                cycle: 0,
                subdivisions: config.subdivisions,
                iterations: config.iterations,
                step_size: config.step_size,
            },
        }
    }
}

impl Iterator for CycleSchedule {
    type Item = CyclePlan;

    fn next(&mut self) -> Option<CyclePlan> {
        let plan = self.next;
        if plan.cycle >= self.cycles {
            return None;
        }
        self.next = CyclePlan {
            cycle: plan.cycle + 1,
            subdivisions: plan.subdivisions.saturating_mul(self.subdivision_rate),
            iterations: (plan.iterations as f64 * self.iteration_rate).floor() as usize,
            step_size: plan.step_size / 2.0,
        };
        Some(plan)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cycles.saturating_sub(self.next.cycle);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CycleSchedule {}

/// Map raw weights onto `[0.5, 1.5]`.
///
/// The smallest weight maps to 0.5 and the largest to 1.5. When every weight
/// is equal they all map to 1.0, which matches an unweighted run.
pub fn normalize_weights(weights: &[f64]) -> BundleResult<Vec<f64>> {
    if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
        return Err(BundleError::InvalidInput(format!(
            "weight {i} is not finite: {}",
            weights[i]
        )));
    }

    let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range > 0.0 {
        Ok(weights.iter().map(|w| 0.5 + (w - min) / range).collect())
    } else {
        Ok(vec![1.0; weights.len()])
    }
}

fn validate_edges(edges: &[Edge]) -> BundleResult<()> {
    match edges.iter().position(|e| !e.is_finite()) {
        Some(i) => Err(BundleError::InvalidInput(format!(
            "edge {i} has non-finite coordinates: {:?}",
            edges[i].to_row()
        ))),
        None => Ok(()),
    }
}

/// Bundle `edges` with every edge weighted equally.
pub fn bundle_edges(edges: &[Edge], config: &BundleConfig) -> BundleResult<Vec<BundledPoint>> {
    run(edges, None, config)
}

/// Bundle `edges`, letting heavier edges pull harder on their partners.
///
/// `weights` must hold one finite value per edge; they are normalized with
/// [`normalize_weights`] first.
pub fn bundle_weighted_edges(
    edges: &[Edge],
    weights: &[f64],
    config: &BundleConfig,
) -> BundleResult<Vec<BundledPoint>> {
    if weights.len() != edges.len() {
        return Err(BundleError::InvalidInput(format!(
            "weights length {} does not match edge count {}",
            weights.len(),
            edges.len()
        )));
    }
    let normalized = normalize_weights(weights)?;
    run(edges, Some(&normalized), config)
}

fn run(
    edges: &[Edge],
    weights: Option<&[f64]>,
    config: &BundleConfig,
) -> BundleResult<Vec<BundledPoint>> {
    config.validate()?;
    validate_edges(edges)?;
    Skeletons::buffer_len(edges.len(), config.final_subdivisions().unwrap_or(usize::MAX))?;

    info!(
        edges = edges.len(),
        cycles = config.cycles,
        weighted = weights.is_some(),
        "Bundling edges"
    );

    let graph = CompatibilityGraph::build(edges, config.compatibility_threshold, config.eps);
    let stats = graph.stats();
    debug!(
        total_pairs = stats.total_pairs,
        candidate_pairs = stats.candidate_pairs,
        compatible_pairs = stats.compatible_pairs,
        "Built compatibility graph"
    );

    let mut simulator = ForceSimulator::new(&graph, config);
    if let Some(weights) = weights {
        simulator = simulator.with_weights(weights);
    }

    let mut skeletons = Skeletons::seed(edges, config.subdivisions, config.eps)?;
    for plan in CycleSchedule::new(config) {
        if plan.cycle > 0 {
            skeletons = skeletons.resubdivide(plan.subdivisions, config.eps)?;
        }
        debug!(
            cycle = plan.cycle + 1,
            of = config.cycles,
            subdivisions = plan.subdivisions,
            iterations = plan.iterations,
            step_size = plan.step_size,
            "Running cycle"
        );
        skeletons = simulator.relax(skeletons, plan.iterations, plan.step_size);
    }

    let records = flatten(&skeletons);
    info!(records = records.len(), "Bundling finished");
    Ok(records)
}

/// Turn skeletons into records, grouped by edge in input order.
pub fn flatten(skeletons: &Skeletons) -> Vec<BundledPoint> {
    let last = (skeletons.points_per_edge() - 1) as f64;
    skeletons
        .paths()
        .enumerate()
        .flat_map(|(group, path)| {
            path.iter().enumerate().map(move |(k, p)| BundledPoint {
                x: p.x,
                y: p.y,
                index: k as f64 / last,
                group,
            })
        })
        .collect()
}

struct CachedRun {
    key: u64,
    edges: Vec<Edge>,
    weights: Option<Vec<f64>>,
    records: Vec<BundledPoint>,
}

impl CachedRun {
    fn matches(&self, key: u64, edges: &[Edge], weights: Option<&[f64]>) -> bool {
        self.key == key && self.edges == edges && self.weights.as_deref() == weights
    }
}

fn input_key(edges: &[Edge], weights: Option<&[f64]>) -> u64 {
    let mut hasher = DefaultHasher::new();
    edges.len().hash(&mut hasher);
    for value in edges.iter().flat_map(|e| e.to_row()) {
        value.to_bits().hash(&mut hasher);
    }
    match weights {
        Some(weights) => {
            true.hash(&mut hasher);
            for w in weights {
                w.to_bits().hash(&mut hasher);
            }
        }
        None => false.hash(&mut hasher),
    }
    hasher.finish()
}

/// A reusable bundler that remembers its last result.
///
/// Calling [`EdgeBundler::bundle`] again with the same edges and weights
/// returns the stored records without rerunning the simulation. Changing the
/// configuration drops the stored result.
pub struct EdgeBundler {
    config: BundleConfig,
    cache: Option<CachedRun>,
}

impl EdgeBundler {
    pub fn new(config: BundleConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Replace the configuration and clear the cache
    pub fn set_config(&mut self, config: BundleConfig) {
        self.config = config;
        self.cache = None;
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Whether a call with these inputs would be served from the cache
    pub fn is_cached(&self, edges: &[Edge], weights: Option<&[f64]>) -> bool {
        let key = input_key(edges, weights);
        self.cache
            .as_ref()
            .is_some_and(|c| c.matches(key, edges, weights))
    }

    /// Bundle `edges`, reusing the previous result when the input is unchanged.
    pub fn bundle(
        &mut self,
        edges: &[Edge],
        weights: Option<&[f64]>,
    ) -> BundleResult<&[BundledPoint]> {
        let key = input_key(edges, weights);
        let hit = self
            .cache
            .as_ref()
            .is_some_and(|c| c.matches(key, edges, weights));

        if hit {
            debug!(edges = edges.len(), "Using cached bundling result");
        } else {
            let records = match weights {
                Some(w) => bundle_weighted_edges(edges, w, &self.config)?,
                None => bundle_edges(edges, &self.config)?,
            };
            self.cache = Some(CachedRun {
                key,
                edges: edges.to_vec(),
                weights: weights.map(<[f64]>::to_vec),
                records,
            });
        }

        Ok(self
            .cache
            .as_ref()
            .map(|c| c.records.as_slice())
            .unwrap_or_default())
    }
}
