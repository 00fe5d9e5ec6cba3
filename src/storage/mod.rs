// src/storage/mod.rs
use crate::summary::{BatchOutcome, Cohort};
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

const SUMMARY_FILE: &str = "summary.json";

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Directory for per-client section dumps.
    pub fn debug_dir(&self) -> PathBuf {
        self.base_dir.join("debug")
    }

    /// Writes records, cohorts (with their document titles) and failures of
    /// one batch to `summary.json`.
    pub fn save_summary(&self, outcome: &BatchOutcome, cohorts: &[Cohort]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(SUMMARY_FILE);

        let cohort_docs: Vec<serde_json::Value> = cohorts
            .iter()
            .map(|cohort| {
                serde_json::json!({
                    "title": cohort.document_title(),
                    "language": cohort.language(),
                    "years": cohort.years(),
                    "cohort": cohort,
                })
            })
            .collect();

        let summary = serde_json::json!({
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
            "records_count": outcome.records.len(),
            "failures_count": outcome.failures.len(),
            "records": outcome.records,
            "cohorts": cohort_docs,
            "failures": outcome.failures,
        });

        let summary_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, summary_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved summary to {}", file_path.display());

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::summary::record::tests::english_lines;
    use crate::summary::{build_record, group_cohorts, run_batch_with, ClientFile};

    #[test]
    fn creates_missing_output_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out").join("2024");
        let storage = StorageManager::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.debug_dir(), nested.join("debug"));
    }

    #[test]
    fn malformed_documents_are_reported_but_not_grouped() {
        let clients = [
            ClientFile::new("/clients/cover_only.pdf", "Cover"),
            ClientFile::new("/clients/smith.pdf", "John Smith"),
        ];
        let outcome = run_batch_with(&clients, |client| {
            let lines = if client.label == "Cover" {
                vec![
                    "Executive summary".to_string(),
                    "for the 2023 taxation year".to_string(),
                    "Nothing recognizable".to_string(),
                ]
            } else {
                english_lines("John", "Smith", "Ontario", 2023)
            };
            build_record(client, &lines, &ExtractionConfig::default())
        });
        let cohorts = group_cohorts(outcome.records.clone());

        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(tmp.path()).unwrap();
        let path = storage.save_summary(&outcome, &cohorts).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["records_count"], 1);
        assert_eq!(json["failures"][0]["path"], "/clients/cover_only.pdf");
        assert!(json["failures"][0]["error"].as_str().unwrap().contains("No recognizable section titles"));
        assert_eq!(json["cohorts"].as_array().unwrap().len(), 1);
        assert_eq!(json["cohorts"][0]["title"], "Summary John Smith 2023");
        assert_eq!(json["cohorts"][0]["cohort"]["kind"], "individual");
        assert_eq!(
            json["cohorts"][0]["cohort"]["records"][0]["client"]["path"],
            "/clients/smith.pdf"
        );
        assert!(json["extraction_timestamp"].is_string());
    }
}
