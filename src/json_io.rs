//! JSON edge input and record output
//!
//! Two input shapes are accepted:
//!
//! - an edge list: `{"edges": [[x, y, xend, yend], ...], "weights": [...]}`
//!   (a bare array of rows is also accepted)
//! - a laid-out graph: `{"nodes": [{"x": .., "y": .., "name": ..}], "links":
//!   [{"source": .., "target": .., "weight": ..}]}`, where link endpoints are
//!   node indices or node names. Links become edges in order.

use std::collections::HashMap;
use std::io::{Read, Write as _};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundler::BundledPoint;
use crate::error::BundleError;
use crate::geometry::{Edge, Point};
use crate::io::{EdgeTable, IoError, IoResult, Reader, Writer};

/// Edge-list document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeListDocument {
    pub edges: Vec<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

/// A positioned node of a graph document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub x: f64,
    pub y: f64,

    /// Optional identifier links may refer to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Reference to a node, by position in `nodes` or by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(usize),
    Name(String),
}

/// A link between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: NodeRef,
    pub target: NodeRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Graph document: node coordinates from a layout plus links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl EdgeListDocument {
    fn into_table(self) -> IoResult<EdgeTable> {
        let edges = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, row)| {
                Edge::from_row(row).map_err(|e| {
                    BundleError::InvalidInput(format!("edge {i}: {}", error_message(e)))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let table = EdgeTable::new(edges);
        match self.weights {
            Some(weights) => Ok(table.with_weights(weights)?),
            None => Ok(table),
        }
    }
}

impl GraphDocument {
    fn resolve(&self, link: usize, node: &NodeRef, names: &HashMap<&str, usize>) -> IoResult<Point> {
        let index = match node {
            NodeRef::Index(i) => *i,
            NodeRef::Name(name) => *names.get(name.as_str()).ok_or_else(|| {
                BundleError::InvalidInput(format!("link {link} references unknown node '{name}'"))
            })?,
        };
        let node = self.nodes.get(index).ok_or_else(|| {
            BundleError::InvalidInput(format!(
                "link {link} references node {index}, but there are only {} nodes",
                self.nodes.len()
            ))
        })?;
        Ok(Point::new(node.x, node.y))
    }

    fn into_table(self) -> IoResult<EdgeTable> {
        if let Some(i) = self
            .nodes
            .iter()
            .position(|n| !Point::new(n.x, n.y).is_finite())
        {
            return Err(BundleError::InvalidInput(format!("node {i} has non-finite coordinates")).into());
        }

        let names: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.name.as_deref().map(|name| (name, i)))
            .collect();

        let mut edges = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            let source = self.resolve(i, &link.source, &names)?;
            let target = self.resolve(i, &link.target, &names)?;
            edges.push(Edge::new(source, target));
        }

        let weights: Vec<f64> = self.links.iter().filter_map(|l| l.weight).collect();
        let table = EdgeTable::new(edges);
        if weights.is_empty() {
            Ok(table)
        } else if weights.len() == self.links.len() {
            Ok(table.with_weights(weights)?)
        } else {
            Err(BundleError::InvalidInput(format!(
                "{} of {} links carry a weight; weight all links or none",
                weights.len(),
                self.links.len()
            ))
            .into())
        }
    }
}

fn error_message(err: BundleError) -> String {
    match err {
        BundleError::InvalidInput(message) | BundleError::InvalidConfiguration(message) => message,
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> IoResult<T> {
    serde_json::from_value(value).map_err(|e| IoError::Parse(e.to_string()))
}

/// Reader for JSON edge lists and graph documents
pub struct JsonReader;

impl JsonReader {
    /// Create a new JSON reader
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for JsonReader {
    fn read_from(&self, input: &mut dyn Read) -> IoResult<EdgeTable> {
        let value: Value =
            serde_json::from_reader(input).map_err(|e| IoError::Parse(e.to_string()))?;

        if value.is_array() {
            let edges: Vec<Vec<f64>> = parse(value)?;
            EdgeListDocument {
                edges,
                weights: None,
            }
            .into_table()
        } else if value.get("edges").is_some() {
            parse::<EdgeListDocument>(value)?.into_table()
        } else if value.get("nodes").is_some() || value.get("links").is_some() {
            parse::<GraphDocument>(value)?.into_table()
        } else {
            Err(IoError::Parse(
                "expected an `edges` list or a graph with `nodes` and `links`".to_string(),
            ))
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Writer for a JSON array of records
pub struct JsonWriter;

impl JsonWriter {
    /// Create a new JSON writer
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for JsonWriter {
    fn write_to(&self, records: &[BundledPoint], output: &mut dyn std::io::Write) -> IoResult<()> {
        serde_json::to_writer_pretty(&mut *output, records)
            .map_err(|e| IoError::Write(format!("JSON serialization failed: {}", e)))?;
        writeln!(output)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "json"
    }
}
