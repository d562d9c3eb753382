//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment (`GITHUB_OWNER`, `GITHUB_REPO`)
//! 4. CLI flags (applied with [`Config::with_overrides`])
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. `$FORGETREE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/forgetree/config.toml`
//! 3. `~/.forgetree/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Tokens
//!
//! The access token is never stored in the config file. The file names the
//! environment variable that holds it (`token_env`, default `GITHUB_TOKEN`)
//! and [`Config::token`] reads that variable on demand.
//!
//! # Example
//!
//! ```no_run
//! use forgetree::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let repo = config.repo().unwrap();
//! println!("{} on {}", repo, config.api_base());
//! ```

pub mod schema;

pub use schema::{CommitDefaults, FileConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::{BranchName, ErrorKind, RepoId};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default branch name.
pub const DEFAULT_BRANCH: &str = "main";

/// Default environment variable holding the access token.
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Default number of concurrent blob uploads.
pub const DEFAULT_BLOB_CONCURRENCY: usize = 4;

/// Default message for scaffold commits.
pub const DEFAULT_SCAFFOLD_MESSAGE: &str = "Initialize project scaffold";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no repository configured (set owner/repo in the config file, GITHUB_OWNER/GITHUB_REPO, or --owner/--repo)")]
    NoRepository,

    #[error("no access token found in ${0}")]
    MissingToken(String),
}

impl ConfigError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::RemoteRejected
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub api_base: Option<String>,
}

/// Resolved configuration.
///
/// Built once at startup and passed to the components that need it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    file: FileConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// any resolved value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.file.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Build a configuration directly from schema values.
    pub fn from_file_config(file: FileConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self {
            file,
            loaded_from: None,
        })
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FORGETREE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("forgetree/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".forgetree/config.toml"))
            .filter(|path| path.exists())
    }

    /// Apply `GITHUB_OWNER` / `GITHUB_REPO` from a variable lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(owner) = lookup("GITHUB_OWNER").filter(|v| !v.is_empty()) {
            self.file.owner = Some(owner);
        }
        if let Some(repo) = lookup("GITHUB_REPO").filter(|v| !v.is_empty()) {
            self.file.repo = Some(repo);
        }
    }

    /// Apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an override is invalid.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(owner) = overrides.owner {
            self.file.owner = Some(owner);
        }
        if let Some(repo) = overrides.repo {
            self.file.repo = Some(repo);
        }
        if let Some(api_base) = overrides.api_base {
            self.file.api_base = Some(api_base);
        }
        self.file.validate()?;
        Ok(self)
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// The configured repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoRepository` if owner or repo is unset.
    pub fn repo(&self) -> Result<RepoId, ConfigError> {
        match (&self.file.owner, &self.file.repo) {
            (Some(owner), Some(repo)) => RepoId::new(owner.as_str(), repo.as_str())
                .map_err(|e| ConfigError::InvalidValue(e.to_string())),
            _ => Err(ConfigError::NoRepository),
        }
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.file
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    /// Branch used when a command does not name one. Defaults to `main`.
    pub fn default_branch(&self) -> Result<BranchName, ConfigError> {
        let name = self
            .file
            .default_branch
            .as_deref()
            .unwrap_or(DEFAULT_BRANCH);
        BranchName::new(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Name of the environment variable holding the token.
    pub fn token_env(&self) -> &str {
        self.file.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Read the access token from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` if the variable is unset or empty.
    pub fn token(&self) -> Result<String, ConfigError> {
        let var = self.token_env();
        std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingToken(var.to_string()))
    }

    /// Maximum concurrent blob uploads per tree build.
    pub fn blob_concurrency(&self) -> usize {
        self.file
            .commit
            .as_ref()
            .and_then(|c| c.blob_concurrency)
            .unwrap_or(DEFAULT_BLOB_CONCURRENCY)
    }

    /// Commit message used for scaffold commits.
    pub fn scaffold_message(&self) -> &str {
        self.file
            .commit
            .as_ref()
            .and_then(|c| c.scaffold_message.as_deref())
            .unwrap_or(DEFAULT_SCAFFOLD_MESSAGE)
    }

    /// Path of the loaded config file, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.default_branch().unwrap().as_str(), "main");
        assert_eq!(config.token_env(), "GITHUB_TOKEN");
        assert_eq!(config.blob_concurrency(), 4);
        assert_eq!(config.scaffold_message(), DEFAULT_SCAFFOLD_MESSAGE);
        assert!(matches!(config.repo(), Err(ConfigError::NoRepository)));
    }

    #[test]
    fn load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            owner = "octocat"
            repo = "hello-world"
            api_base = "https://github.example.com/api/v3/"
            default_branch = "develop"

            [commit]
            blob_concurrency = 2
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.repo().unwrap().to_string(), "octocat/hello-world");
        assert_eq!(config.api_base(), "https://github.example.com/api/v3");
        assert_eq!(config.default_branch().unwrap().as_str(), "develop");
        assert_eq!(config.blob_concurrency(), 2);
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "owner = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn invalid_value_in_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[commit]\nblob_concurrency = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_file_config(FileConfig {
            owner: Some("file-owner".to_string()),
            repo: Some("file-repo".to_string()),
            ..Default::default()
        })
        .unwrap();

        config.apply_env(|key| match key {
            "GITHUB_OWNER" => Some("env-owner".to_string()),
            "GITHUB_REPO" => Some(String::new()),
            _ => None,
        });

        let repo = config.repo().unwrap();
        assert_eq!(repo.owner(), "env-owner");
        // Empty variables are ignored
        assert_eq!(repo.name(), "file-repo");
    }

    #[test]
    fn cli_overrides_apply_last() {
        let config = Config::default()
            .with_overrides(Overrides {
                owner: Some("cli-owner".to_string()),
                repo: Some("cli-repo".to_string()),
                api_base: Some("http://127.0.0.1:9999".to_string()),
            })
            .unwrap();

        assert_eq!(config.repo().unwrap().to_string(), "cli-owner/cli-repo");
        assert_eq!(config.api_base(), "http://127.0.0.1:9999");
    }

    #[test]
    fn invalid_override_rejected() {
        let result = Config::default().with_overrides(Overrides {
            api_base: Some("ftp://nope".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_token_names_variable() {
        let config = Config::from_file_config(FileConfig {
            token_env: Some("FORGETREE_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
            ..Default::default()
        })
        .unwrap();

        let err = config.token().unwrap_err();
        assert!(err
            .to_string()
            .contains("FORGETREE_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }
}
