//! Persistence of the most recent analysis.
//!
//! A tiny key-value seam: `FileStore` keeps one JSON document per key under the
//! data directory, `MemoryStore` backs tests. `AnalysisStore` layers the
//! versioned envelope on top.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::usage::AnalysisResult;

/// Key the latest analysis is stored under
pub const ANALYSIS_KEY: &str = "ai-usage-optimizer-data";

pub const STORE_VERSION: u32 = 1;

/// Minimal string store addressed by key
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // Readers never see a partial document
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Envelope written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnalysis {
    pub version: u32,
    pub analysis_data: AnalysisResult,
    pub saved_at: DateTime<Utc>,
}

/// Save, load and clear the latest analysis
pub struct AnalysisStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> AnalysisStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Replace the stored analysis, returning the envelope that was written
    pub fn save(&self, analysis: &AnalysisResult) -> Result<SavedAnalysis> {
        let saved = SavedAnalysis {
            version: STORE_VERSION,
            analysis_data: analysis.clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string(&saved).context("Failed to serialize analysis")?;
        self.store.set(ANALYSIS_KEY, &json)?;
        Ok(saved)
    }

    /// The stored analysis, or `None` when absent, unreadable or from another version
    pub fn load(&self) -> Result<Option<SavedAnalysis>> {
        let Some(json) = self.store.get(ANALYSIS_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<SavedAnalysis>(&json) {
            Ok(saved) if saved.version == STORE_VERSION => Ok(Some(saved)),
            Ok(saved) => {
                warn!(
                    version = saved.version,
                    expected = STORE_VERSION,
                    "ignoring saved analysis from another version"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable saved analysis");
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(ANALYSIS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::UsageRow;
    use crate::usage::{analyze, AnalysisOptions};
    use tempfile::TempDir;

    fn sample() -> AnalysisResult {
        let rows = vec![
            UsageRow::from_pairs(&[("model", "GPT-4"), ("cost", "10.00")]),
            UsageRow::from_pairs(&[("model", "GPT-4"), ("cost", "10.00")]),
            UsageRow::from_pairs(&[("model", "Claude"), ("cost", "5.00")]),
        ];
        analyze(&rows, 1, &AnalysisOptions::default())
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = AnalysisStore::new(MemoryStore::new());
        assert!(store.load().unwrap().is_none());

        let analysis = sample();
        store.save(&analysis).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.version, STORE_VERSION);
        assert_eq!(loaded.analysis_data.models, analysis.models);
        assert_eq!(loaded.analysis_data.recommendations, analysis.recommendations);
        assert_eq!(loaded.analysis_data.weekly_usage, analysis.weekly_usage);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_writes_json_under_key() {
        let dir = TempDir::new().unwrap();
        let store = AnalysisStore::new(FileStore::new(dir.path().join("data")));
        store.save(&sample()).unwrap();

        let path = store.inner().path_for(ANALYSIS_KEY);
        assert!(path.ends_with("ai-usage-optimizer-data.json"));
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"analysisData\""));
        assert!(raw.contains("\"savedAt\""));

        assert!(store.load().unwrap().is_some());
        store.clear().unwrap();
        assert!(!path.exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_huge_costs_still_round_trip() {
        let rows = vec![
            UsageRow::from_pairs(&[("model", "a"), ("cost", "1e308")]),
            UsageRow::from_pairs(&[("model", "b"), ("cost", "1e308")]),
        ];
        let analysis = analyze(&rows, 1, &AnalysisOptions::default());
        assert!(analysis.total_spent.is_finite());

        let store = AnalysisStore::new(MemoryStore::new());
        store.save(&analysis).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.analysis_data.total_requests, 2);
        assert!(loaded.analysis_data.total_spent.is_finite());
    }

    #[test]
    fn test_corrupt_payload_is_treated_as_absent() {
        let mem = MemoryStore::new();
        mem.set(ANALYSIS_KEY, "{not json").unwrap();
        let store = AnalysisStore::new(mem);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_other_version_is_treated_as_absent() {
        let store = AnalysisStore::new(MemoryStore::new());
        store.save(&sample()).unwrap();

        let json = store.inner().get(ANALYSIS_KEY).unwrap().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["version"] = serde_json::json!(99);
        store
            .inner()
            .set(ANALYSIS_KEY, &value.to_string())
            .unwrap();

        assert!(store.load().unwrap().is_none());
    }
}
