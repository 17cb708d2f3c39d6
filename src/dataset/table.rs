use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A delimited dataset held in memory: header names and rows in source order.
///
/// Cells keep their exact source text. Every row has as many fields as the
/// header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(Error::MalformedData("missing header row".to_string()));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(Error::MalformedData(format!(
                "row {} has {} fields, header has {}",
                index + 1,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Parses comma-delimited text whose first record is the header row.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(data);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(Error::MalformedData("empty document, no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
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

    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Serializes the table as comma-delimited text: header first, `\n`
    /// terminated, quoting only where a field needs it. No index column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Writes the table to `path`, replacing any existing file only once the
    /// whole document has been written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp_path = part_path(path);

        let written = File::create(&temp_path).map_err(Error::from).and_then(|file| {
            let mut writer = BufWriter::new(file);
            self.write_csv(&mut writer)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            Ok(())
        });

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, path)?;
        tracing::debug!("Renamed {} to {}", temp_path.display(), path.display());
        Ok(())
    }

    /// Renders the first `n` rows as an aligned text block with a positional
    /// row number, for a quick look at the terminal.
    pub fn preview(&self, n: usize) -> String {
        let head = self.head(n);

        let index_width = head.len().saturating_sub(1).to_string().len();
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in head {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (header, width) in self.headers.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", header, width = *width));
        }
        out.push('\n');

        for (i, row) in head.iter().enumerate() {
            out.push_str(&format!("{:<width$}", i, width = index_width));
            for (cell, width) in row.iter().zip(&widths) {
                out.push_str(&format!("  {:>width$}", cell, width = *width));
            }
            out.push('\n');
        }

        if self.rows.len() > head.len() {
            out.push_str(&format!("... {} more rows\n", self.rows.len() - head.len()));
        }
        out
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
