//! Writes result sets to timestamped JSON records.
//!
//! A record is an object from category label to the ordered list of links
//! in that category. Write failures are returned to the caller, who still
//! owns the [`ResultSet`] and may retry or pick another location.

use crate::error::PersistError;
use crate::results::ResultSet;
use crate::utils;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes results into a directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the next write would use, named after the current local time
    pub fn next_path(&self) -> PathBuf {
        self.output_dir
            .join(utils::results_filename(&Local::now()))
    }

    /// Writes the results to a new timestamped file and returns its path
    pub fn write(&self, results: &ResultSet) -> Result<PathBuf, PersistError> {
        let path = self.next_path();
        write_to(&path, results)?;
        Ok(path)
    }
}

/// Writes the results as pretty-printed JSON to an explicit path
pub fn write_to(path: &Path, results: &ResultSet) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ::log::info!("Results saved to {}", path.display());
    Ok(())
}

/// Reads a record written by [`write_to`]
pub fn load(path: &Path) -> Result<ResultSet, PersistError> {
    let contents = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::engines::Engine;
    use crate::results::{CategorizedLink, ResultAggregator};

    fn sample() -> ResultSet {
        let mut aggregator = ResultAggregator::new();
        let mut link = CategorizedLink::new("https://a.com/b.pdf", Category::Pdfs, Engine::Google);
        link.title = Some("B".to_string());
        aggregator.insert(link);
        aggregator.insert(CategorizedLink::new(
            "https://a.com/a.pdf",
            Category::Pdfs,
            Engine::Bing,
        ));
        aggregator.insert(CategorizedLink::new(
            "https://github.com/org/repo",
            Category::Other,
            Engine::Bing,
        ));
        aggregator.snapshot()
    }

    #[test]
    fn test_write_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path());
        let results = sample();

        let path = writer.write(&results).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("webscavanger_results_"));
        assert!(name.ends_with(".json"));
        assert_eq!(load(&path).unwrap(), results);
    }

    #[test]
    fn test_record_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_to(&path, &sample()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let pdfs = value["pdfs"].as_array().unwrap();
        assert_eq!(pdfs.len(), 2);
        assert_eq!(pdfs[0]["url"], "https://a.com/b.pdf");
        assert_eq!(pdfs[0]["title"], "B");
        assert_eq!(pdfs[0]["source_engine"], "google");
        assert!(pdfs[0]["discovered_at"].is_string());
        assert!(pdfs[1].get("title").is_none());
        assert_eq!(value["other"][0]["url"], "https://github.com/org/repo");
        assert_eq!(value["images"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_failed_write_is_reported_and_results_survive() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("missing").join("nested"));
        let results = sample();

        let err = writer.write(&results).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));

        // the same results can still be written elsewhere
        let retry = ResultWriter::new(dir.path());
        let path = retry.write(&results).unwrap();
        assert_eq!(load(&path).unwrap().len(), 3);
    }
}
