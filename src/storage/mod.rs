// src/storage/mod.rs
use crate::chinamoney::models::BondRow;
use crate::extractors::rules::ExtractionResult;
use crate::utils::error::StorageError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// Lets spreadsheet tools detect UTF-8 when opening the CSV.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Writes bond rows as a BOM-prefixed UTF-8 CSV with a header row.
    pub fn save_bond_csv(&self, file_name: &str, rows: &[BondRow]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(file_name);

        let mut file = fs::File::create(&file_path)
            .map_err(StorageError::IoError)?;
        file.write_all(UTF8_BOM)
            .map_err(StorageError::IoError)?;

        write_bond_rows(file, rows)?;

        tracing::info!("Saved {} bond rows to {}", rows.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves extraction results as a pretty-printed JSON array.
    pub fn save_results(&self, file_stem: &str, results: &[ExtractionResult]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}_fields.json", file_stem));

        let results_str = serde_json::to_string_pretty(results)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, results_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved results to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves the results, then their metadata. Nothing is described that was not written.
    pub fn save_extraction(
        &self,
        file_stem: &str,
        source_path: &str,
        results: &[ExtractionResult],
    ) -> Result<(PathBuf, PathBuf), StorageError> {
        let results_path = self.save_results(file_stem, results)?;
        let metadata_path = self.save_results_metadata(file_stem, source_path, results)?;
        Ok((results_path, metadata_path))
    }

    /// Saves metadata about an extraction run in JSON format
    pub fn save_results_metadata(
        &self,
        file_stem: &str,
        source_path: &str,
        results: &[ExtractionResult],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}_fields_meta.json", file_stem));

        let found = results
            .iter()
            .flat_map(|r| r.iter())
            .filter(|(_, value)| value.is_found())
            .count();
        let total: usize = results.iter().map(|r| r.len()).sum();

        let metadata = serde_json::json!({
            "source": source_path,
            "rule_sets": results.len(),
            "fields_total": total,
            "fields_found": found,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

/// Writes the header and one record per row. Column names come from [`BondRow`]'s serde renames.
pub fn write_bond_rows<W: Write>(writer: W, rows: &[BondRow]) -> Result<(), StorageError> {
    // CRLF row endings (RFC 4180).
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    if rows.is_empty() {
        // serde only emits the header alongside the first record.
        csv_writer.write_record(["ISIN", "Bond Code", "Issuer", "Bond Type", "Issue Date", "Latest Rating"])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(StorageError::IoError)?;
    Ok(())
}
