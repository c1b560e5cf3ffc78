use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::{CountyError, Result};

/// A CSV table held in memory. Cells keep the exact text of the source file;
/// an empty cell is treated as a missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading CSV file: {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        self.write_rows(writer, 0..self.rows.len())
    }

    /// Write the header plus the given rows, in the order given.
    pub(crate) fn write_rows<W, I>(&self, writer: W, rows: I) -> Result<()>
    where
        W: Write,
        I: IntoIterator<Item = usize>,
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for idx in rows {
            let row = self.rows.get(idx).ok_or_else(|| {
                CountyError::InvalidArgument(format!("row {} out of range ({} rows)", idx, self.rows.len()))
            })?;
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Resolve column positions, failing on the first absent column.
    pub fn require_columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut indices = [0; N];
        for (slot, name) in indices.iter_mut().zip(names) {
            *slot = self
                .column_index(name)
                .ok_or_else(|| CountyError::MissingColumn(name.to_string()))?;
        }
        Ok(indices)
    }

    /// Cell text, or `None` when the cell is empty.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Raw cell text; empty for short rows.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }

    /// Iterate over one column's cells, `None` for empty cells.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.rows.len()).map(move |row| self.value(row, col))
    }
}
