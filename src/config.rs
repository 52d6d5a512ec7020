//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/qtree/qtree.toml`
//! 3. Local config: `<dir>/.qtree.toml` (usually the working directory)
//! 4. Environment variables: `QTREE_*` prefix, `__` between section and key
//!    (e.g. `QTREE_ORACLE__RESOLVE_MODEL`)
//!
//! API keys left unset fall back to `OPENAI_API_KEY` and `SPORTRADAR_API_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::retry::CallPolicy;
use crate::application::services::BuildPolicy;
use crate::application::ApplicationError;
use crate::domain::DEPTH_CEILING;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const SPORTRADAR_API_KEY_VAR: &str = "SPORTRADAR_API_KEY";

/// Language-model oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model used to generate subquestions
    pub decompose_model: String,
    /// Model used for tool-augmented answering
    pub resolve_model: String,
    /// Evidence lookups allowed per resolve call
    pub tool_call_budget: usize,
    /// Model turns before a final answer is forced
    pub max_turns: usize,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per call, including the first
    pub max_attempts: usize,
    /// Initial retry backoff in milliseconds
    pub backoff_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            decompose_model: "gpt-5-nano".into(),
            resolve_model: "gpt-5-mini".into(),
            tool_call_budget: 2,
            max_turns: 5,
            timeout_secs: 120,
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl OracleConfig {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.backoff_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Statistics provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvidenceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_attempts: usize,
    /// HTTP timeout per request in seconds
    pub timeout_secs: u64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sportradar.us/nba/trial/v8/en".into(),
            api_key: None,
            max_attempts: 3,
            timeout_secs: 30,
        }
    }
}

/// Tree construction and resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeConfig {
    /// Depth used when `ask` is given no `--depth`
    pub default_depth: usize,
    /// Largest depth accepted by the builder
    pub max_depth_limit: usize,
    /// Concurrent resolve calls
    pub concurrency: usize,
    pub build_policy: BuildPolicy,
    /// Where `ask` writes the tree document
    pub output: PathBuf,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_depth: 2,
            max_depth_limit: 3,
            concurrency: 4,
            build_policy: BuildPolicy::Abort,
            output: PathBuf::from("nba_question_tree.json"),
        }
    }
}

/// Unified configuration for qtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub oracle: OracleConfig,
    pub evidence: EvidenceConfig,
    pub tree: TreeConfig,
}

/// Get the XDG config directory for qtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "qtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("qtree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".qtree.toml")
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl Settings {
    /// Load settings with layered precedence, reading the local config from `local_dir`.
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir)
    }

    /// Load settings from explicit config locations.
    ///
    /// Missing files are skipped; unreadable or invalid files are errors.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let defaults = Config::try_from(&Settings::default()).map_err(config_err)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = global_path {
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(dir) = local_dir {
            builder = builder.add_source(File::from(local_config_path(dir)).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("QTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        settings.apply_key_fallbacks();
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_key_fallbacks(&mut self) {
        if self.oracle.api_key.is_none() {
            self.oracle.api_key = std::env::var(OPENAI_API_KEY_VAR).ok();
        }
        if self.evidence.api_key.is_none() {
            self.evidence.api_key = std::env::var(SPORTRADAR_API_KEY_VAR).ok();
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let output = expand(self.tree.output.to_string_lossy().as_ref());
        self.tree.output = PathBuf::from(output);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        let problem = if self.tree.concurrency == 0 {
            Some("tree.concurrency must be at least 1")
        } else if self.tree.max_depth_limit > DEPTH_CEILING {
            Some("tree.max_depth_limit must not exceed 8")
        } else if self.tree.default_depth > self.tree.max_depth_limit {
            Some("tree.default_depth exceeds tree.max_depth_limit")
        } else if self.oracle.max_turns == 0 {
            Some("oracle.max_turns must be at least 1")
        } else {
            None
        };
        match problem {
            Some(message) => Err(ApplicationError::Config {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut settings = self.clone();
        settings.oracle.api_key = mask(&self.oracle.api_key);
        settings.evidence.api_key = mask(&self.evidence.api_key);
        settings
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# qtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/qtree/qtree.toml
#   Local:  ./.qtree.toml
#   Env:    QTREE_<SECTION>__<KEY>, e.g. QTREE_TREE__CONCURRENCY=8
#
# API keys may also come from OPENAI_API_KEY and SPORTRADAR_API_KEY
# (a .env file in the working directory is honoured).

[oracle]
# base_url = "https://api.openai.com/v1"
# decompose_model = "gpt-5-nano"
# resolve_model = "gpt-5-mini"
# tool_call_budget = 2
# max_turns = 5
# timeout_secs = 120
# max_attempts = 3
# backoff_ms = 500

[evidence]
# base_url = "https://api.sportradar.us/nba/trial/v8/en"
# max_attempts = 3
# timeout_secs = 30

[tree]
# default_depth = 2
# max_depth_limit = 3 (at most 8)
# concurrency = 4
# "abort" stops on the first decompose failure, "partial" keeps going
# build_policy = "abort"
# output = "nba_question_tree.json"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
