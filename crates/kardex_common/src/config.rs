//! Kardex Configuration
//!
//! Config file: ~/.config/kardex/config.toml or /etc/kardex/config.toml
//!
//! ```toml
//! [taxonomy]
//! path = "/etc/kardex/fault_categories.yaml"
//!
//! [analytics]
//! endpoint = "http://localhost:11434"
//! model = "llama3.2:3b"
//! timeout_secs = 30
//! max_retries = 1
//!
//! [output]
//! list_limit = 20
//! default_top_n = 3
//! ```

use crate::analytics_client::AnalyticsConfig;
use crate::answer_format::DEFAULT_LIST_LIMIT;
use crate::error::TaxonomyError;
use crate::query_intent::DEFAULT_TOP_N;
use crate::taxonomy::Taxonomy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "KARDEX_CONFIG";

/// Fills `[analytics] api_key` when the file leaves it out
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// YAML taxonomy file; the bundled taxonomy when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Records listed before "… and N more"
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    /// Ranking size when a question names none
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            list_limit: DEFAULT_LIST_LIMIT,
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

/// Main Kardex configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KardexConfig {
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl KardexConfig {
    /// User config path: $XDG_CONFIG_HOME/kardex/config.toml or ~/.config/kardex/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        let config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;
        Some(config_dir.join("kardex").join("config.toml"))
    }

    /// System config path: /etc/kardex/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/kardex/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (`--config`), which must exist
    /// 2. $KARDEX_CONFIG, which must exist
    /// 3. User config (~/.config/kardex/config.toml)
    /// 4. System config (/etc/kardex/config.toml)
    /// 5. Defaults
    ///
    /// `OPENAI_API_KEY` is applied afterwards in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let mut config = if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
            Self::load_from(&path)?
        } else if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            Self::load_from(&path)?
        } else if Self::system_config_path().exists() {
            Self::load_from(&Self::system_config_path())?
        } else {
            tracing::debug!("No config file found, using defaults");
            Self::default()
        };

        config.fill_api_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load one config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: KardexConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Use `key` unless the file already set one
    pub fn fill_api_key(&mut self, key: Option<String>) {
        if self.analytics.api_key.is_none() {
            self.analytics.api_key = key.filter(|k| !k.trim().is_empty());
        }
    }

    /// The configured taxonomy, or the bundled one
    pub fn load_taxonomy(&self) -> std::result::Result<Taxonomy, TaxonomyError> {
        match &self.taxonomy.path {
            Some(path) => Taxonomy::load(path),
            None => Taxonomy::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = KardexConfig::default();
        assert!(config.taxonomy.path.is_none());
        assert_eq!(config.output.list_limit, 20);
        assert_eq!(config.output.default_top_n, 3);
        assert_eq!(config.analytics, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = KardexConfig::from_toml_str(
            r#"
[analytics]
model = "gpt-4o-mini"
max_retries = 2

[output]
list_limit = 5
"#,
        )
        .unwrap();
        assert_eq!(config.analytics.model, "gpt-4o-mini");
        assert_eq!(config.analytics.max_retries, 2);
        assert_eq!(config.analytics.timeout_secs, 30);
        assert_eq!(config.output.list_limit, 5);
        assert_eq!(config.output.default_top_n, 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[taxonomy]\npath = \"/tmp/custom.yaml\"").unwrap();
        let config = KardexConfig::load_from(file.path()).unwrap();
        assert_eq!(config.taxonomy.path, Some(PathBuf::from("/tmp/custom.yaml")));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(KardexConfig::load(Some(Path::new("/nonexistent/kardex.toml"))).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(KardexConfig::from_toml_str("[output]\nlist_limit = \"many\"").is_err());
    }

    #[test]
    fn test_api_key_fill() {
        let mut config = KardexConfig::default();
        config.fill_api_key(Some("sk-env".to_string()));
        assert_eq!(config.analytics.api_key.as_deref(), Some("sk-env"));

        // a key from the file wins
        config.fill_api_key(Some("sk-other".to_string()));
        assert_eq!(config.analytics.api_key.as_deref(), Some("sk-env"));

        let mut config = KardexConfig::default();
        config.fill_api_key(Some("  ".to_string()));
        assert!(config.analytics.api_key.is_none());
    }

    #[test]
    fn test_builtin_taxonomy_when_unset() {
        let taxonomy = KardexConfig::default().load_taxonomy().unwrap();
        assert_eq!(taxonomy.categories()[0].name, "Brakes");
    }
}
