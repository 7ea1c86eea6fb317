//! Bundling parameters
//!
//! [`BundleConfig`] is threaded by reference through every stage of a run.
//! It can be built in code, loaded from a YAML or JSON file, or taken from one
//! of the named presets.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, BundleResult};
use crate::io::{IoError, IoResult};

// =============================================================================
// Default Constants
// =============================================================================

/// Default spring constant (stiffness of each edge, resists bundling)
pub const DEFAULT_SPRING_CONSTANT: f64 = 1.0;

/// Default electrostatic constant (strength of attraction between compatible edges)
pub const DEFAULT_ELECTROSTATIC_CONSTANT: f64 = 1.0;

/// Default number of cycles
pub const DEFAULT_CYCLES: usize = 6;

/// Default number of interior subdivision points in the first cycle
pub const DEFAULT_SUBDIVISIONS: usize = 1;

/// Default subdivision growth factor per cycle
pub const DEFAULT_SUBDIVISION_RATE: usize = 2;

/// Default step size of the first cycle (halved every cycle)
pub const DEFAULT_STEP_SIZE: f64 = 0.04;

/// Default iteration count of the first cycle
pub const DEFAULT_ITERATIONS: usize = 50;

/// Default iteration decay factor per cycle
pub const DEFAULT_ITERATION_RATE: f64 = 2.0 / 3.0;

/// Default minimum compatibility score for two edges to interact
pub const DEFAULT_COMPATIBILITY_THRESHOLD: f64 = 0.6;

/// Default floor for lengths and distances used as denominators
pub const DEFAULT_EPS: f64 = 1e-8;

/// Largest number of interior subdivision points any cycle may reach
pub const MAX_SUBDIVISIONS: usize = 1 << 20;

/// Parameters of one bundling run.
///
/// Field names have short aliases (`K`, `E`, `C`, `P`, `S`, `P_rate`, `I`,
/// `I_rate`) so configuration files can use the notation of the FDEB paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Spring constant `K`
    #[serde(alias = "K")]
    pub spring_constant: f64,
    /// Electrostatic constant `E`
    #[serde(alias = "E")]
    pub electrostatic_constant: f64,
    /// Number of cycles `C`
    #[serde(alias = "C")]
    pub cycles: usize,
    /// Interior subdivision points in the first cycle `P`
    #[serde(alias = "P")]
    pub subdivisions: usize,
    /// Subdivision growth factor `P_rate`
    #[serde(alias = "P_rate")]
    pub subdivision_rate: usize,
    /// Step size of the first cycle `S`
    #[serde(alias = "S")]
    pub step_size: f64,
    /// Iterations in the first cycle `I`
    #[serde(alias = "I")]
    pub iterations: usize,
    /// Iteration decay factor `I_rate`
    #[serde(alias = "I_rate")]
    pub iteration_rate: f64,
    /// Minimum compatibility score in `[0, 1]`
    pub compatibility_threshold: f64,
    /// Floor substituted for near-zero denominators
    pub eps: f64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            spring_constant: DEFAULT_SPRING_CONSTANT,
            electrostatic_constant: DEFAULT_ELECTROSTATIC_CONSTANT,
            cycles: DEFAULT_CYCLES,
            subdivisions: DEFAULT_SUBDIVISIONS,
            subdivision_rate: DEFAULT_SUBDIVISION_RATE,
            step_size: DEFAULT_STEP_SIZE,
            iterations: DEFAULT_ITERATIONS,
            iteration_rate: DEFAULT_ITERATION_RATE,
            compatibility_threshold: DEFAULT_COMPATIBILITY_THRESHOLD,
            eps: DEFAULT_EPS,
        }
    }
}

impl BundleConfig {
    /// Parameters of the original reference implementation: a softer spring,
    /// larger steps and more iterations.
    pub fn reference() -> Self {
        Self {
            spring_constant: 0.1,
            step_size: 0.1,
            iterations: 90,
            eps: 1e-6,
            ..Self::default()
        }
    }

    pub fn with_spring_constant(mut self, k: f64) -> Self {
        self.spring_constant = k;
        self
    }

    pub fn with_electrostatic_constant(mut self, e: f64) -> Self {
        self.electrostatic_constant = e;
        self
    }

    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn with_subdivisions(mut self, subdivisions: usize) -> Self {
        self.subdivisions = subdivisions;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_compatibility_threshold(mut self, threshold: f64) -> Self {
        self.compatibility_threshold = threshold;
        self
    }

    /// Interior subdivision points of the last cycle, `None` on overflow.
    pub fn final_subdivisions(&self) -> Option<usize> {
        let mut subdivisions = self.subdivisions;
        for _ in 1..self.cycles {
            if subdivisions == 0 || self.subdivision_rate <= 1 {
                break;
            }
            subdivisions = subdivisions.checked_mul(self.subdivision_rate)?;
        }
        Some(subdivisions)
    }

    /// Check every parameter, returning the first violation found.
    pub fn validate(&self) -> BundleResult<()> {
        fn invalid(message: String) -> BundleResult<()> {
            Err(BundleError::InvalidConfiguration(message))
        }

        if !(self.spring_constant.is_finite() && self.spring_constant > 0.0) {
            return invalid(format!(
                "spring constant K must be positive, got {}",
                self.spring_constant
            ));
        }
        if !(self.electrostatic_constant.is_finite() && self.electrostatic_constant >= 0.0) {
            return invalid(format!(
                "electrostatic constant E must be non-negative, got {}",
                self.electrostatic_constant
            ));
        }
        if self.cycles == 0 {
            return invalid("cycle count C must be at least 1".to_string());
        }
        if self.subdivision_rate == 0 {
            return invalid("subdivision rate P_rate must be at least 1".to_string());
        }
        match self.final_subdivisions() {
            Some(p) if p <= MAX_SUBDIVISIONS => {}
            reached => {
                return invalid(format!(
                    "subdivisions P={} with P_rate={} over {} cycles exceed the limit of {}{}",
                    self.subdivisions,
                    self.subdivision_rate,
                    self.cycles,
                    MAX_SUBDIVISIONS,
                    reached.map_or(String::new(), |p| format!(" (reaching {p})")),
                ));
            }
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return invalid(format!(
                "step size S must be positive, got {}",
                self.step_size
            ));
        }
        if self.iterations == 0 {
            return invalid("iteration count I must be at least 1".to_string());
        }
        if !(self.iteration_rate.is_finite() && self.iteration_rate > 0.0) {
            return invalid(format!(
                "iteration rate I_rate must be positive, got {}",
                self.iteration_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.compatibility_threshold) {
            return invalid(format!(
                "compatibility threshold must lie in [0, 1], got {}",
                self.compatibility_threshold
            ));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return invalid(format!("eps must be positive, got {}", self.eps));
        }
        Ok(())
    }

    /// Parse a YAML document. Missing fields keep their defaults.
    pub fn from_yaml_str(content: &str) -> IoResult<Self> {
        serde_yaml::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(content: &str) -> IoResult<Self> {
        serde_json::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    /// Load a configuration file, choosing the parser from its extension.
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;
        let parse: fn(&str) -> IoResult<Self> = match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_str,
            "json" => Self::from_json_str,
            other => return Err(IoError::UnsupportedFormat(other.to_string())),
        };
        let content = fs::read_to_string(path)?;
        parse(&content)
    }
}
