//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$FORGETREE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/forgetree/config.toml`
//! 3. `~/.forgetree/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing so that a typo in the file surfaces
//! at startup instead of as a remote rejection.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, RepoId};

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// owner = "octocat"
/// repo = "hello-world"
/// api_base = "https://api.github.com"
/// default_branch = "main"
/// token_env = "GITHUB_TOKEN"
///
/// [commit]
/// blob_concurrency = 4
/// scaffold_message = "Initialize project scaffold"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Default repository owner
    pub owner: Option<String>,

    /// Default repository name
    pub repo: Option<String>,

    /// API base URL (GitHub Enterprise installs use `https://host/api/v3`)
    pub api_base: Option<String>,

    /// Branch used when a command does not name one
    pub default_branch: Option<String>,

    /// Environment variable holding the access token
    pub token_env: Option<String>,

    /// Commit pipeline settings
    pub commit: Option<CommitDefaults>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(owner), Some(repo)) = (&self.owner, &self.repo) {
            RepoId::new(owner.as_str(), repo.as_str())
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if let Some(api_base) = &self.api_base {
            if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base '{}' must be an http(s) URL",
                    api_base
                )));
            }
        }

        if let Some(token_env) = &self.token_env {
            if token_env.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "token_env cannot be empty".to_string(),
                ));
            }
        }

        if let Some(commit) = &self.commit {
            commit.validate()?;
        }

        Ok(())
    }
}

/// Commit pipeline defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CommitDefaults {
    /// Maximum blob uploads in flight during one tree build
    pub blob_concurrency: Option<usize>,

    /// Message used by `scaffold`
    pub scaffold_message: Option<String>,
}

impl CommitDefaults {
    /// Validate the commit settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blob_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "blob_concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(message) = &self.scaffold_message {
            if message.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "scaffold_message cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
