use crate::report::{Measurement, ReportSink};
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

pub enum TableFormat {
    Csv,
    Tsv,
    Json,
}

/// Collected measurements, exportable as CSV, TSV or JSON.
///
/// Implements [`ReportSink`], so it can be handed directly to the `write`
/// hooks of accumulators and sets.
pub struct ReportTable {
    rows: Vec<Measurement>,
}

impl ReportTable {
    pub fn push(&mut self, measurement: Measurement) {
        self.rows.push(measurement)
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    /// Value of the first entry named `name`, if present.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.rows.iter().find(|m| m.name == name).map(|m| m.value)
    }

    pub fn export<P: AsRef<Path>>(&self, path: P, fmt: TableFormat) -> Result<(), Error> {
        match fmt {
            TableFormat::Csv => self.export_with_delimiter(path, ','),
            TableFormat::Tsv => self.export_with_delimiter(path, '\t'),
            TableFormat::Json => self.export_json(path),
        }
    }

    fn export_with_delimiter<P: AsRef<Path>>(&self, path: P, delimiter: char) -> Result<(), Error> {
        let mut w = File::create(path)?;
        writeln!(w, "name{d}value", d = delimiter)?;
        for m in &self.rows {
            writeln!(w, "{}{d}{:.12}", m.name, m.value, d = delimiter)?;
        }
        Ok(())
    }

    fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut w = File::create(path)?;
        serde_json::to_writer(&mut w, &self.rows)?;
        writeln!(w)?;
        Ok(())
    }
}

impl ReportSink for ReportTable {
    fn entry(&mut self, key: &str, value: f64) {
        self.rows.push(Measurement::new(key, value));
    }
}

impl Default for ReportTable {
    fn default() -> Self {
        Self { rows: vec![] }
    }
}
