//! fdeb - Force-directed edge bundling.
//!
//! Straight edges are subdivided into control points that attract the
//! matching points of compatible edges while springs keep each edge in
//! shape. Over a few cycles of finer subdivision and smaller steps, edges that
//! run alongside each other are drawn together into bundles.
//!
//! ```
//! use fdeb::{BundleConfig, Edge, Point, bundle_edges};
//!
//! let edges = [
//!     Edge::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
//!     Edge::new(Point::new(0.0, 0.5), Point::new(10.0, 0.5)),
//! ];
//! let records = bundle_edges(&edges, &BundleConfig::default()).unwrap();
//! assert_eq!(records.first().map(|r| r.index), Some(0.0));
//! ```

pub mod bundler;
pub mod compatibility;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod geometry;
pub mod io;
pub mod json_io;
pub mod simulation;
pub mod subdivision;

pub use bundler::{BundledPoint, EdgeBundler, bundle_edges, bundle_weighted_edges};
pub use config::BundleConfig;
pub use error::{BundleError, BundleResult};
pub use geometry::{Edge, Point};
