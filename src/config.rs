//! Configuration: where the database lives and how to call the model.
//!
//! Layering, lowest to highest: built-in defaults, an optional TOML file
//! (`./askql.toml`, else `~/.askql/config.toml`), environment overrides
//! (`ASKQL_DB`, `ASKQL_MODEL`), then command-line flags. The API key is
//! environment-only and never appears here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::llm::{LlmSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Environment override for the database path.
pub const DB_VAR: &str = "ASKQL_DB";

/// Environment override for the model name.
pub const MODEL_VAR: &str = "ASKQL_MODEL";

const CONFIG_FILE: &str = "askql.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; `~` is expanded.
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_db_path() -> String {
    "student.db".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f64 {
    0.0
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_db_path(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration, applying the file and environment layers.
    /// `explicit` points at a config file named on the command line and
    /// must exist; otherwise the default locations are tried in order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::find_file(explicit)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment layer: `ASKQL_DB` and `ASKQL_MODEL` override the file.
    fn apply_env(&mut self) {
        if let Some(db) = non_empty_env(DB_VAR) {
            self.database.path = db;
        }
        if let Some(model) = non_empty_env(MODEL_VAR) {
            self.llm.model = model;
        }
    }

    fn find_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }
        if let Some(home) = dirs::home_dir() {
            let user = home.join(".askql").join("config.toml");
            if user.exists() {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::load_from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            anyhow::bail!("database.path must not be empty");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0.0 and 2.0");
        }
        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).into_owned())
    }

    /// Settings for the chat client.
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            temperature: self.llm.temperature,
            timeout_secs: self.llm.timeout_secs,
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.path, "student.db");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_str_full() {
        let config = Config::load_from_str(
            r#"
            [database]
            path = "~/data/school.db"

            [llm]
            model = "llama-3.1-70b-versatile"
            temperature = 0.2
            timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, "~/data/school.db");
        assert_eq!(config.llm.model, "llama-3.1-70b-versatile");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.timeout_secs, 10);
        // base_url falls back to the default
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_from_str_partial_sections() {
        let config = Config::load_from_str("[database]\npath = \"other.db\"\n").unwrap();
        assert_eq!(config.database.path, "other.db");
        assert_eq!(config.llm.model, DEFAULT_MODEL);

        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.database.path, "student.db");
    }

    #[test]
    fn test_load_from_str_rejects_bad_values() {
        assert!(Config::load_from_str("[llm]\ntimeout_secs = 0\n").is_err());
        assert!(Config::load_from_str("[llm]\ntemperature = 3.0\n").is_err());
        assert!(Config::load_from_str("[database]\npath = \"\"\n").is_err());
        assert!(Config::load_from_str("not toml at all [").is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::load_from_str("[database]\npath = \"~/school.db\"\n").unwrap();
        let expanded = config.database_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("school.db"));
    }

    #[test]
    fn test_llm_settings_mirror_config() {
        let config = Config::load_from_str("[llm]\nmodel = \"m\"\ntimeout_secs = 5\n").unwrap();
        let settings = config.llm_settings();
        assert_eq!(settings.model, "m");
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    // The only test that touches ASKQL_* variables; keep it that way, the
    // test harness shares one environment across threads.
    #[test]
    fn test_env_layer_overrides_file_values() {
        let mut config =
            Config::load_from_str("[database]\npath = \"file.db\"\n[llm]\nmodel = \"from-file\"\n")
                .unwrap();

        std::env::set_var(DB_VAR, "env.db");
        std::env::set_var(MODEL_VAR, "from-env");
        config.apply_env();
        std::env::remove_var(DB_VAR);
        std::env::remove_var(MODEL_VAR);

        assert_eq!(config.database.path, "env.db");
        assert_eq!(config.llm.model, "from-env");

        // Empty variables do not count as overrides
        let mut config = Config::default();
        std::env::set_var(DB_VAR, "");
        config.apply_env();
        std::env::remove_var(DB_VAR);
        assert_eq!(config.database.path, "student.db");
    }
}
