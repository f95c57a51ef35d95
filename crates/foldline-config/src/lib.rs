use foldline_syntax::{DEFAULT_TODO_KEYWORDS, HeadlineSyntax};
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Words recognized as Org TODO keywords.
    pub todo_keywords: Vec<String>,
    /// Keywords the TODO cycle command steps through, in order.
    pub todo_cycle: Vec<String>,
    /// Where the terminal host writes its log. Tilde and `$VARS` expand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub delays: FoldDelays,
    pub documents: DocumentPatterns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            todo_keywords: DEFAULT_TODO_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            todo_cycle: vec!["TODO".to_string(), "DONE".to_string()],
            log_file: None,
            delays: FoldDelays::default(),
            documents: DocumentPatterns::default(),
        }
    }
}

/// Settle pauses around renderer calls, in milliseconds. Slow hosts need
/// larger values; zero disables a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldDelays {
    pub caret_ms: u64,
    pub settle_ms: u64,
    pub child_ms: u64,
    pub verify_ms: u64,
}

impl Default for FoldDelays {
    fn default() -> Self {
        Self {
            caret_ms: 10,
            settle_ms: 50,
            child_ms: 20,
            verify_ms: 100,
        }
    }
}

/// File name globs choosing the headline syntax of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPatterns {
    pub markdown: Vec<String>,
    pub org: Vec<String>,
}

impl Default for DocumentPatterns {
    fn default() -> Self {
        Self {
            markdown: vec!["*.md".into(), "*.qmd".into(), "*.markdown".into()],
            org: vec!["*.org".into()],
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

        config.log_file = config
            .log_file
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
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
        let config_dir = shellexpand::tilde("~/.config/foldline");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Headline syntax for a document path, by file name. Org patterns are
    /// tried first; invalid patterns never match.
    pub fn syntax_for_path(&self, path: &Path) -> Option<HeadlineSyntax> {
        let file_name = path.file_name()?.to_string_lossy();
        let matches = |patterns: &[String]| {
            patterns.iter().any(|pattern| {
                glob::Pattern::new(pattern).is_ok_and(|pattern| pattern.matches(&file_name))
            })
        };

        if matches(&self.documents.org) {
            Some(HeadlineSyntax::Org)
        } else if matches(&self.documents.markdown) {
            Some(HeadlineSyntax::Markdown)
        } else {
            None
        }
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
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/foldline/config.toml"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            todo_cycle: vec!["NEXT".to_string(), "WAITING".to_string(), "DONE".to_string()],
            delays: FoldDelays {
                caret_ms: 0,
                settle_ms: 5,
                child_ms: 0,
                verify_ms: 25,
            },
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = toml::from_str(
            r#"
todo_cycle = ["TODO", "NEXT", "DONE"]

[delays]
settle_ms = 200
"#,
        )
        .unwrap();

        assert_eq!(config.todo_cycle, vec!["TODO", "NEXT", "DONE"]);
        assert_eq!(config.todo_keywords, Config::default().todo_keywords);
        assert_eq!(config.delays.settle_ms, 200);
        assert_eq!(config.delays.verify_ms, 100);
        assert_eq!(config.documents, DocumentPatterns::default());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "todo_cycle = [").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_log_file_expands_env_vars() {
        unsafe {
            env::set_var("FOLDLINE_TEST_LOGS", "/var/log/foldline");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "log_file = \"$FOLDLINE_TEST_LOGS/cli.log\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.log_file,
            Some(PathBuf::from("/var/log/foldline/cli.log"))
        );
        unsafe {
            env::remove_var("FOLDLINE_TEST_LOGS");
        }
    }

    #[test]
    fn test_syntax_for_path() {
        let mut config = Config::default();
        config.documents.markdown.push("README".to_string());

        assert_eq!(
            config.syntax_for_path(Path::new("notes/todo.org")),
            Some(HeadlineSyntax::Org)
        );
        assert_eq!(
            config.syntax_for_path(Path::new("report.qmd")),
            Some(HeadlineSyntax::Markdown)
        );
        assert_eq!(
            config.syntax_for_path(Path::new("README")),
            Some(HeadlineSyntax::Markdown)
        );
        assert_eq!(config.syntax_for_path(Path::new("main.rs")), None);
    }
}
