use anchorage_console::{DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_OPERATIONS, DEFAULT_PROMPT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub prompt: String,
    pub history_limit: usize,
    /// Operation budget per evaluation; 0 disables the limit
    pub max_operations: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where bookmarks are persisted between sessions
    pub bookmarks_path: PathBuf,
    pub console: ConsoleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookmarks_path: Self::config_dir().join("bookmarks.toml"),
            console: ConsoleConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded bookmarks path
        config.bookmarks_path =
            Self::expand_path(&config.bookmarks_path).unwrap_or(config.bookmarks_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load the config file, falling back to defaults when there is none
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    fn config_dir() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/anchorage");
        PathBuf::from(config_dir.as_ref())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/anchorage/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(config.bookmarks_path.ends_with(".config/anchorage/bookmarks.toml"));
        assert_eq!(config.console.prompt, DEFAULT_PROMPT);
        assert_eq!(config.console.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.console.max_operations, DEFAULT_MAX_OPERATIONS);
    }

    #[test]
    fn test_console_defaults_match_session_defaults() {
        let console = ConsoleConfig::default();
        let session = anchorage_console::SessionOptions::default();

        assert_eq!(console.prompt, session.prompt);
        assert_eq!(console.history_limit, session.history_limit);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
[console]
prompt = "rhai> "
"#,
        )
        .unwrap();

        assert_eq!(config.console.prompt, "rhai> ");
        assert_eq!(config.console.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.bookmarks_path, Config::default().bookmarks_path);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_bookmarks_path_with_env_var_in_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        unsafe {
            env::set_var("ANCHORAGE_TEST_ROOT", "/custom/data");
        }
        std::fs::write(
            &config_file,
            "bookmarks_path = \"$ANCHORAGE_TEST_ROOT/marks.toml\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.bookmarks_path, PathBuf::from("/custom/data/marks.toml"));
        unsafe {
            env::remove_var("ANCHORAGE_TEST_ROOT");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_parse_error_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "console = 3").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            bookmarks_path: PathBuf::from("/tmp/test-bookmarks.toml"),
            console: ConsoleConfig {
                prompt: "> ".to_string(),
                history_limit: 7,
                max_operations: 0,
            },
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
