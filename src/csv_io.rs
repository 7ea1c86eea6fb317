//! CSV edge tables and record output
//!
//! Input is either headed (`x,y,xend,yend` plus an optional `weight` column,
//! in any order, extra columns ignored) or header-less with 4 or 5 numeric
//! columns. Output has the columns `x,y,index,group`.

use std::fmt::Display;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::bundler::BundledPoint;
use crate::error::BundleError;
use crate::geometry::{Edge, Point};
use crate::io::{EdgeTable, IoError, IoResult, Reader, Writer};

const REQUIRED_COLUMNS: [&str; 4] = ["x", "y", "xend", "yend"];
const WEIGHT_COLUMN: &str = "weight";
const OUTPUT_HEADER: [&str; 4] = ["x", "y", "index", "group"];

fn invalid(line: u64, message: impl Display) -> IoError {
    BundleError::InvalidInput(format!("line {line}: {message}")).into()
}

/// Field positions of the edge columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    coords: [usize; 4],
    weight: Option<usize>,
}

impl ColumnLayout {
    fn from_header(header: &StringRecord) -> IoResult<Self> {
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|&name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(BundleError::InvalidInput(format!(
                "missing required columns: {}",
                missing.join(", ")
            ))
            .into());
        }

        let mut coords = [0; 4];
        for (slot, name) in coords.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).unwrap_or_default();
        }
        Ok(Self {
            coords,
            weight: find(WEIGHT_COLUMN),
        })
    }

    fn positional(columns: usize, line: u64) -> IoResult<Self> {
        match columns {
            4 => Ok(Self {
                coords: [0, 1, 2, 3],
                weight: None,
            }),
            5 => Ok(Self {
                coords: [0, 1, 2, 3],
                weight: Some(4),
            }),
            n => Err(invalid(
                line,
                format!("expected 4 or 5 columns without a header, got {n}"),
            )),
        }
    }
}

fn looks_numeric(record: &StringRecord) -> bool {
    record.get(0).is_some_and(|f| f.parse::<f64>().is_ok())
}

fn parse_number(record: &StringRecord, column: usize, line: u64) -> IoResult<f64> {
    let field = record
        .get(column)
        .ok_or_else(|| invalid(line, format!("missing column {}", column + 1)))?;
    let value: f64 = field
        .parse()
        .map_err(|_| invalid(line, format!("'{field}' is not a number")))?;
    if !value.is_finite() {
        return Err(invalid(line, format!("'{field}' is not finite")));
    }
    Ok(value)
}

/// Reader for CSV edge tables
pub struct CsvReader;

impl CsvReader {
    /// Create a new CSV reader
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for CsvReader {
    fn read_from(&self, input: &mut dyn Read) -> IoResult<EdgeTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);
        let mut records = rdr.records();

        let Some(first) = records
            .next()
            .transpose()
            .map_err(|e| IoError::Parse(e.to_string()))?
        else {
            return Ok(EdgeTable::default());
        };

        let (layout, pending) = if looks_numeric(&first) {
            (ColumnLayout::positional(first.len(), 1)?, Some(first))
        } else {
            (ColumnLayout::from_header(&first)?, None)
        };

        let mut edges = Vec::new();
        let mut weights = Vec::new();
        for result in pending.into_iter().map(Ok).chain(records) {
            let record = result.map_err(|e| IoError::Parse(e.to_string()))?;
            let line = record.position().map_or(0, |p| p.line());

            let [x, y, xend, yend] = layout.coords.map(|c| parse_number(&record, c, line));
            edges.push(Edge::new(Point::new(x?, y?), Point::new(xend?, yend?)));
            if let Some(column) = layout.weight {
                weights.push(parse_number(&record, column, line)?);
            }
        }

        let table = EdgeTable::new(edges);
        if layout.weight.is_some() {
            Ok(table.with_weights(weights)?)
        } else {
            Ok(table)
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }
}

/// Writer for `x,y,index,group` CSV records
pub struct CsvWriter;

impl CsvWriter {
    /// Create a new CSV writer
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for CsvWriter {
    fn write_to(&self, records: &[BundledPoint], output: &mut dyn std::io::Write) -> IoResult<()> {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(output);
        let write_error = |e: csv::Error| IoError::Write(e.to_string());

        wtr.write_record(OUTPUT_HEADER).map_err(write_error)?;
        for record in records {
            wtr.serialize(record).map_err(write_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn read_str(content: &str) -> IoResult<EdgeTable> {
        CsvReader::new().read_from(&mut content.as_bytes())
    }

    #[test]
    fn csv_reader_supports_csv_extension() {
        let reader = CsvReader::new();
        assert!(reader.supports_extension("csv"));
        assert!(reader.supports_extension("CSV"));
        assert!(!reader.supports_extension("json"));
    }

    #[test]
    fn reads_headed_table() {
        let table = read_str("x,y,xend,yend\n0,0,10,0\n0,0.5,10,0.5\n").expect("valid CSV");
        assert_eq!(table.len(), 2);
        assert_eq!(table.edges[1].to_row(), [0.0, 0.5, 10.0, 0.5]);
        assert!(table.weights.is_none());
    }

    #[test]
    fn reads_columns_by_name_in_any_order() {
        let table = read_str("label,yend,xend,weight,y,x\na,4,3,2.5,2,1\n").expect("valid CSV");
        assert_eq!(table.edges[0].to_row(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(table.weights, Some(vec![2.5]));
    }

    #[test]
    fn reads_headerless_rows() {
        let table = read_str("0,0,1,1\n2,2,3,3\n").expect("valid CSV");
        assert_eq!(table.len(), 2);
        assert!(table.weights.is_none());

        let table = read_str("0,0,1,1,10\n2,2,3,3,1\n").expect("valid CSV");
        assert_eq!(table.weights, Some(vec![10.0, 1.0]));
    }

    #[test]
    fn trims_whitespace() {
        let table = read_str("x, y, xend, yend\n 1 , 2 , 3 , 4 \n").expect("valid CSV");
        assert_eq!(table.edges[0].to_row(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_input_is_empty_table() {
        assert!(read_str("").expect("empty CSV").is_empty());
        assert!(read_str("x,y,xend,yend\n").expect("header only").is_empty());
    }

    #[test]
    fn rejects_missing_columns() {
        let err = read_str("x,y,xend\n0,0,1\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: missing required columns: yend");
    }

    #[test]
    fn rejects_wrong_headerless_arity() {
        let err = read_str("0,0,1\n").unwrap_err();
        assert!(matches!(err, IoError::Bundle(BundleError::InvalidInput(_))));
    }

    #[test]
    fn rejects_non_numeric_field_with_line() {
        let err = read_str("x,y,xend,yend\n0,0,1,1\n0,zero,1,1\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: line 3: 'zero' is not a number");
    }

    #[test]
    fn rejects_non_finite_field() {
        let err = read_str("0,0,1,1\n0,NaN,1,1\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: line 2: 'NaN' is not finite");
    }

    #[test]
    fn rejects_short_row() {
        let err = read_str("x,y,xend,yend\n0,0,1\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: line 2: missing column 4");
    }

    #[test]
    fn reads_fixture_file() {
        let table = CsvReader::new()
            .read(Path::new("tests/fixtures/two_columns.csv"))
            .expect("Should read fixture");
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn csv_writer_format_id_is_csv() {
        assert_eq!(CsvWriter::new().format_id(), "csv");
    }

    #[test]
    fn csv_writer_writes_header_for_empty_output() {
        let mut buffer = Vec::new();
        CsvWriter::new()
            .write_to(&[], &mut buffer)
            .expect("Write should succeed");
        assert_eq!(String::from_utf8(buffer).unwrap(), "x,y,index,group\n");
    }

    #[test]
    fn csv_writer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundled.csv");
        let records = [BundledPoint {
            x: 1.5,
            y: -2.0,
            index: 0.0,
            group: 3,
        }];

        CsvWriter::new()
            .write(&records, &path)
            .expect("Write should succeed");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "x,y,index,group\n1.5,-2.0,0.0,3\n");
    }

    // Snapshot tests using insta
    mod snapshots {
        use super::*;

        #[test]
        fn snapshot_csv_records() {
            let records: Vec<BundledPoint> = (0..2)
                .flat_map(|group| {
                    (0..3).map(move |k| BundledPoint {
                        x: k as f64 * 2.5,
                        y: group as f64,
                        index: k as f64 / 2.0,
                        group,
                    })
                })
                .collect();

            let mut buffer = Vec::new();
            CsvWriter::new().write_to(&records, &mut buffer).unwrap();
            let output = String::from_utf8(buffer).unwrap();
            insta::assert_snapshot!(output);
        }
    }
}
