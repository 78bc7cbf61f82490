//! Raw abundance matrix as delivered by upstream search engines.

use crate::error::{DiaError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

/// Tokens treated as an absent measurement at ingestion.
const MISSING_TOKENS: &[&str] = &["", "NA", "NaN", "nan", "N/A", "#N/A", "null", "NULL"];

/// A single raw cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Finite numeric value.
    Number(f64),
    /// Anything that does not coerce to a number.
    Text(String),
    /// Absent value.
    Missing,
}

impl Cell {
    /// Parse a raw field, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            Ok(_) => Cell::Missing,
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    /// Numeric value, if this cell coerces to one.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Check if this is a missing value.
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Render the cell for delimited output.
    pub fn render(&self) -> String {
        match self {
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Missing
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::parse(s)
    }
}

/// A rectangular table of features (rows) by columns.
///
/// Column names are unique and shared by every row. Stages never mutate a
/// matrix in place; derived matrices are built with [`Matrix::subset_rows`]
/// and [`Matrix::with_column`].
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    index: HashMap<String, usize>,
}

impl Matrix {
    /// Create a new Matrix, validating that every row matches the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(DiaError::DuplicateColumn(name.clone()));
            }
        }
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DiaError::Ingestion {
                    // +2: one-based, after the header line
                    line: row_idx + 2,
                    message: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        row.len()
                    ),
                });
            }
        }
        Ok(Self {
            columns,
            rows,
            index,
        })
    }

    /// Load a matrix from a tab- or comma-separated file.
    ///
    /// The delimiter is taken from the header line: tab if it contains more
    /// tabs than commas, otherwise comma.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut header_line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut header_line)?;
        let delimiter = sniff_delimiter(&header_line);
        Self::from_reader(File::open(path)?, delimiter)
    }

    /// Load a matrix from any reader with a known delimiter.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(DiaError::EmptyData("Matrix header is empty".to_string()));
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::parse).collect());
        }
        if rows.is_empty() {
            return Err(DiaError::EmptyData("No feature rows in matrix".to_string()));
        }

        Self::new(columns, rows)
    }

    /// Write the matrix as delimited text.
    pub fn to_delimited<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Cell::render))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_delimited(File::create(path)?, b'\t')
    }

    /// Number of feature rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check if the matrix has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in order.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    #[inline]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Position of a column by name.
    #[inline]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Cell at (row, col).
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Iterate over the cells of a named column.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let col = self
            .column_index(name)
            .ok_or_else(|| DiaError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(move |row| &row[col]))
    }

    /// Keep only the given rows, in the given order.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut rows = Vec::with_capacity(indices.len());
        for &idx in indices {
            let row = self.rows.get(idx).ok_or_else(|| {
                DiaError::InvalidParameter(format!("Row index {} out of bounds", idx))
            })?;
            rows.push(row.clone());
        }
        Ok(Self {
            columns: self.columns.clone(),
            rows,
            index: self.index.clone(),
        })
    }

    /// Return a new matrix with `name` set to `cells`.
    ///
    /// An existing column of that name is replaced in place; otherwise the
    /// column is appended.
    pub fn with_column(&self, name: &str, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != self.n_rows() {
            return Err(DiaError::InvalidParameter(format!(
                "Column '{}' has {} cells, matrix has {} rows",
                name,
                cells.len(),
                self.n_rows()
            )));
        }
        if let Some(col) = self.column_index(name) {
            let rows = self
                .rows
                .iter()
                .zip(cells)
                .map(|(row, cell)| {
                    let mut row = row.clone();
                    row[col] = cell;
                    row
                })
                .collect();
            return Ok(Self {
                columns: self.columns.clone(),
                rows,
                index: self.index.clone(),
            });
        }
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = self
            .rows
            .iter()
            .zip(cells)
            .map(|(row, cell)| {
                let mut row = row.clone();
                row.push(cell);
                row
            })
            .collect();
        Self::new(columns, rows)
    }
}

fn sniff_delimiter(header_line: &str) -> u8 {
    let tabs = header_line.matches('\t').count();
    let commas = header_line.matches(',').count();
    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}
