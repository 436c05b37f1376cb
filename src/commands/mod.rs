pub mod ask;
pub mod create;
pub mod history;
pub mod init;
pub mod insert;
pub mod serve;
pub mod sql;
pub mod tables;

use anyhow::Result;
use std::path::Path;

use askql::{Config, Store};

/// Resolve configuration and open the store. The `--db` flag wins over the
/// config file and the `ASKQL_DB` environment variable.
pub(crate) fn open_store(db: Option<&Path>, config: Option<&Path>) -> Result<(Config, Store)> {
    let config = Config::load(config)?;
    let path = match db {
        Some(p) => p.to_path_buf(),
        None => config.database_path(),
    };
    Ok((config, Store::new(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_db_flag_wins_over_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("askql.toml");
        std::fs::write(&config_path, "[database]\npath = \"from-config.db\"\n").unwrap();

        let flag_path = dir.path().join("from-flag.db");
        let (_, store) = open_store(Some(&flag_path), Some(&config_path)).unwrap();
        assert_eq!(store.path(), flag_path.as_path());

        // Without the flag the config file decides
        let (_, store) = open_store(None, Some(&config_path)).unwrap();
        assert!(store.path().to_string_lossy().ends_with("from-config.db"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(open_store(None, Some(Path::new("/nonexistent/askql.toml"))).is_err());
    }
}
