//! Repository-level configuration file
//!
//! An optional `.shepr.yaml` at the checkout root carries per-repository
//! defaults; command-line flags always win over it.
//!
//! ```yaml
//! target: main
//! label: stalled
//! changelog: CHANGELOG.md
//! order: incoming-first
//! side: theirs
//! max_resolve_passes: 20
//! bot:
//!   name: shepr bot
//!   email: shepr-bot@users.noreply.github.com
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::git::ConflictSide;
use crate::resolve::BlockOrder;

/// Default config file name, looked up at the checkout root
pub const DEFAULT_CONFIG_FILE: &str = ".shepr.yaml";

/// Default target branch when neither flag nor config names one
pub const DEFAULT_TARGET: &str = "main";

/// Default changelog path, relative to the checkout root
pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

/// Default label marking PRs that want backporting
pub const DEFAULT_BACKPORT_LABEL: &str = "backport";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Committer identity used for commits this tool creates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotIdentity {
    pub name: String,
    pub email: String,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            name: "shepr bot".to_string(),
            email: "shepr-bot@users.noreply.github.com".to_string(),
        }
    }
}

/// Contents of `.shepr.yaml`. Every field is optional; absent fields fall
/// back to flag values or built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Target branch PRs are rebased onto
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Label selecting candidate PRs when no number is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Changelog path, relative to the checkout root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    /// Order of merged changelog blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<BlockOrder>,

    /// Side taken for non-changelog conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<ConflictSide>,

    /// Upper bound on conflict-resolution passes per operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resolve_passes: Option<u32>,

    /// Committer identity for created commits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotIdentity>,
}

impl FileConfig {
    /// Load a config file from a path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: FileConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config for a checkout.
    ///
    /// An explicitly named file must exist; the default `.shepr.yaml` is
    /// optional and its absence yields an empty config.
    pub fn load_optional(
        checkout_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = checkout_root.join(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate config contents
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(passes) = self.max_resolve_passes {
            if passes == 0 {
                return Err(ConfigError::Validation(
                    "max_resolve_passes must be at least 1".to_string(),
                ));
            }
        }

        if let Some(ref changelog) = self.changelog {
            if changelog.is_empty() {
                return Err(ConfigError::Validation(
                    "changelog path must not be empty".to_string(),
                ));
            }
            if Path::new(changelog).is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "changelog path '{}' must be relative to the checkout root",
                    changelog
                )));
            }
            if changelog.split('/').any(|part| part == "..") {
                return Err(ConfigError::Validation(format!(
                    "changelog path '{}' must not leave the checkout root",
                    changelog
                )));
            }
        }

        if let Some(ref target) = self.target {
            if target.is_empty() {
                return Err(ConfigError::Validation(
                    "target branch must not be empty".to_string(),
                ));
            }
        }

        if let Some(ref label) = self.label {
            if label.is_empty() {
                return Err(ConfigError::Validation(
                    "label must not be empty".to_string(),
                ));
            }
        }

        if let Some(ref bot) = self.bot {
            if bot.name.is_empty() || bot.email.is_empty() {
                return Err(ConfigError::Validation(
                    "bot identity needs both a name and an email".to_string(),
                ));
            }
        }

        Ok(())
    }
}
