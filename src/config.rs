use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ingest::IngestOptions;
use crate::ingest::scanner::DEFAULT_MAX_FILE_SIZE_MB;
use crate::usage::{AnalysisOptions, ModelKeywords, DEFAULT_TOP_MODELS};

pub const APP_NAME: &str = "ai-usage-optimizer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the latest analysis is kept; the platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_size_mb: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_models: usize,
    pub expensive_model_keywords: Vec<String>,
    pub claude_model_keywords: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let keywords = ModelKeywords::default();
        Self {
            top_models: DEFAULT_TOP_MODELS,
            expensive_model_keywords: keywords.expensive,
            claude_model_keywords: keywords.claude,
        }
    }
}

impl Config {
    /// Resolve the data directory: explicit override, then config, then platform default
    pub fn data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(path) = self.storage.path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(shellexpand::tilde(path).as_ref()));
        }
        dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .ok_or_else(|| anyhow::anyhow!("No data directory available; set --data-dir"))
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_file_size_mb: self.ingest.max_file_size_mb,
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            top_models: self.analysis.top_models,
            keywords: ModelKeywords {
                expensive: self.analysis.expensive_model_keywords.clone(),
                claude: self.analysis.claude_model_keywords.clone(),
            },
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config as TOML")
    }
}

/// Load configuration, writing defaults when the file does not exist yet
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config: Config = match path {
        Some(p) => confy::load_path(p)
            .with_context(|| format!("Failed to load config from {}", p.display()))?,
        None => confy::load(APP_NAME, None).context("Failed to load config")?,
    };
    Ok(config)
}

pub fn save_config(config: &Config, path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => confy::store_path(p, config)
            .with_context(|| format!("Failed to save config to {}", p.display()))?,
        None => confy::store(APP_NAME, None, config).context("Failed to save config")?,
    }
    Ok(())
}

pub fn config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => confy::get_configuration_file_path(APP_NAME, None)
            .context("Failed to resolve config path"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ingest.max_file_size_mb, 50);
        assert_eq!(config.analysis.top_models, 8);
        assert!(config
            .analysis
            .expensive_model_keywords
            .contains(&"gpt-4".to_string()));
        assert_eq!(config.analysis.claude_model_keywords, vec!["claude"]);
    }

    #[test]
    fn test_load_writes_defaults_then_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let mut changed = config.clone();
        changed.analysis.top_models = 3;
        changed.storage.path = Some("~/usage-data".to_string());
        save_config(&changed, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), changed);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\ntop_models = 4\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.analysis.top_models, 4);
        assert_eq!(config.ingest.max_file_size_mb, 50);
        assert!(!config.analysis.expensive_model_keywords.is_empty());
    }

    #[test]
    fn test_data_dir_resolution() {
        let mut config = Config::default();
        let explicit = PathBuf::from("/tmp/explicit");
        assert_eq!(config.data_dir(Some(&explicit)).unwrap(), explicit);

        config.storage.path = Some("/var/lib/usage".to_string());
        assert_eq!(config.data_dir(None).unwrap(), PathBuf::from("/var/lib/usage"));

        config.storage.path = Some("~/usage".to_string());
        let resolved = config.data_dir(None).unwrap();
        assert!(!resolved.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = Config::default();
        config.ingest.max_file_size_mb = 5;
        config.analysis.top_models = 2;
        config.analysis.expensive_model_keywords = vec!["o1".to_string()];

        assert_eq!(config.ingest_options().max_file_size_mb, 5);
        let options = config.analysis_options();
        assert_eq!(options.top_models, 2);
        assert_eq!(options.keywords.expensive, vec!["o1"]);
    }

    #[test]
    fn test_to_toml_lists_sections() {
        let toml = Config::default().to_toml().unwrap();
        assert!(toml.contains("[ingest]"));
        assert!(toml.contains("max_file_size_mb = 50"));
        assert!(toml.contains("[analysis]"));
    }
}
