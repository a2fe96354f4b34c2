//! CSV bulk import: semicolon-delimited file in, one bulk insert out.

use crate::domain::model::ImportRow;
use crate::domain::ports::RecordStore;
use crate::utils::error::{AppError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CSV_DELIMITER: u8 = b';';

pub struct CsvImport {
    store: Arc<dyn RecordStore>,
    max_rows: usize,
}

impl CsvImport {
    pub fn new(store: Arc<dyn RecordStore>, max_rows: usize) -> Self {
        Self { store, max_rows }
    }

    /// Imports `path` and leaves the file in place.
    pub async fn import_file(&self, path: &Path) -> Result<u64> {
        let rows = self.extract(path.to_path_buf()).await.inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read CSV");
        })?;
        self.load(rows).await
    }

    /// Imports an uploaded artifact and removes it once the rows are stored.
    pub async fn import_upload(&self, path: &Path) -> Result<u64> {
        let inserted = self.import_file(path).await?;

        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove imported upload");
        }

        Ok(inserted)
    }

    async fn extract(&self, path: PathBuf) -> Result<Vec<ImportRow>> {
        let max_rows = self.max_rows;
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&path)?;
            read_batch(file, max_rows)
        })
        .await
        .map_err(|e| AppError::IoError(std::io::Error::other(e)))?
    }

    pub async fn load(&self, rows: Vec<ImportRow>) -> Result<u64> {
        if rows.is_empty() {
            return Err(AppError::EmptyImport);
        }

        tracing::debug!("Inserting {} imported rows", rows.len());
        let inserted = self.store.insert_many(&rows).await.inspect_err(|e| {
            tracing::error!(error = %e, rows = rows.len(), "Failed to insert imported rows");
        })?;
        tracing::info!("📥 Imported {} records", inserted);

        Ok(inserted)
    }
}

/// Reads every data row, cleaning each and discarding blank lines.
/// Fails once more than `max_rows` rows survive.
pub fn read_batch<R: Read>(reader: R, max_rows: usize) -> Result<Vec<ImportRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let Some(row) = clean_record(&headers, &record) else {
            continue;
        };

        if rows.len() == max_rows {
            return Err(AppError::ImportTooLarge { limit: max_rows });
        }
        rows.push(row);
    }

    Ok(rows)
}

/// `None` for a row whose values are all empty after trimming.
/// Cells past the last header are kept under `_<column index>`.
pub fn clean_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Option<ImportRow> {
    let pairs = record.iter().enumerate().map(|(i, value)| {
        let key = match headers.get(i) {
            Some(header) => header.to_string(),
            None => format!("_{}", i),
        };
        (key, value)
    });

    let row = ImportRow::from_pairs(pairs);
    (!row.is_blank()).then_some(row)
}
