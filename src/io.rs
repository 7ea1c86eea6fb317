//! Reader/Writer traits and format dispatch
//!
//! Readers turn an input file into an [`EdgeTable`]; writers serialize the
//! [`BundledPoint`] records of a run. The [`FormatRegistry`] picks a reader
//! from a file extension and a writer from a format id.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write as _};
use std::path::Path;

use thiserror::Error;

use crate::bundler::BundledPoint;
use crate::csv_io::{CsvReader, CsvWriter};
use crate::error::{BundleError, BundleResult};
use crate::geometry::Edge;
use crate::json_io::{JsonReader, JsonWriter};

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A serialization/writing error occurred
    #[error("write error: {0}")]
    Write(String),

    /// The parsed data was rejected
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// Edges read from a file, with optional per-edge weights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeTable {
    pub edges: Vec<Edge>,
    pub weights: Option<Vec<f64>>,
}

impl EdgeTable {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            edges,
            weights: None,
        }
    }

    /// Attach one weight per edge.
    pub fn with_weights(mut self, weights: Vec<f64>) -> BundleResult<Self> {
        if weights.len() != self.edges.len() {
            return Err(BundleError::InvalidInput(format!(
                "weights length {} does not match edge count {}",
                weights.len(),
                self.edges.len()
            )));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A reader parses an input format into an [`EdgeTable`]
pub trait Reader {
    /// Parse edges from an open stream
    fn read_from(&self, input: &mut dyn Read) -> IoResult<EdgeTable>;

    /// Parse the input file
    fn read(&self, input: &Path) -> IoResult<EdgeTable> {
        let mut file = BufReader::new(File::open(input)?);
        self.read_from(&mut file)
    }

    /// File extensions this reader can handle (e.g., ["csv"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer outputs bundled records in a specific format
pub trait Writer {
    /// Write the records to an open stream
    fn write_to(&self, records: &[BundledPoint], output: &mut dyn std::io::Write) -> IoResult<()>;

    /// Write the records to the output path, replacing any existing file
    fn write(&self, records: &[BundledPoint], output: &Path) -> IoResult<()> {
        let mut file = BufWriter::new(File::create(output)?);
        self.write_to(records, &mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Identifier for this output format (e.g., "csv", "json")
    fn format_id(&self) -> &str;
}

/// The edge readers and record writers known to the CLI, looked up by file
/// extension and format id.
pub struct FormatRegistry {
    readers: Vec<Box<dyn Reader>>,
    writers: Vec<Box<dyn Writer>>,
}

impl FormatRegistry {
    /// CSV and JSON, for both edge input and record output
    pub fn with_defaults() -> Self {
        Self {
            readers: vec![Box::new(CsvReader::new()), Box::new(JsonReader::new())],
            writers: vec![Box::new(CsvWriter::new()), Box::new(JsonWriter::new())],
        }
    }

    /// Find a writer by format id, ignoring case
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    fn reader_for(&self, path: &Path) -> IoResult<&dyn Reader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Read an edge file, choosing the reader from its extension
    pub fn read_path(&self, path: &Path) -> IoResult<EdgeTable> {
        self.reader_for(path)?.read(path)
    }
}
