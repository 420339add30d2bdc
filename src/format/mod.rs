//! CSV output for scraped records.

use crate::catalog::models::Record;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Column header, in field order.
pub const CSV_HEADER: [&str; 5] = ["title", "description", "price", "rating", "num_of_reviews"];

/// Renders records as CSV text with a header row.
///
/// Numbers use their shortest round-trip form (`10.0`, `99.99`) and
/// fields containing delimiters, quotes or newlines are quoted.
pub fn to_csv(records: &[Record]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).context("Failed to write CSV header")?;
    for record in records {
        writer.serialize(record).context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Writes one CSV file per page into an output directory.
pub struct CsvWriter {
    dir: PathBuf,
}

impl CsvWriter {
    /// Creates a writer targeting `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the path a file named `file_name` would be written to.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Serializes `records` and writes them to `<dir>/<file_name>`,
    /// replacing any previous file. The file only appears once the whole
    /// content has been rendered.
    pub fn write(&self, file_name: &str, records: &[Record]) -> Result<PathBuf> {
        let content = to_csv(records)?;

        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create output directory: {}", self.dir.display())
        })?;

        let path = self.path_for(file_name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }
}
