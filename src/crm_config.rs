//! Configuration for dealflow, read from `.dealflow/dealflow.toml`.
//!
//! Settings are layered file → environment → CLI, later layers winning:
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:3000/api"
//! timeout_secs = 30
//!
//! [session]
//! token_file = "session.json"
//! ```
//!
//! When the project has no `.dealflow/dealflow.toml`, the per-user file under
//! the platform config directory (`~/.config/dealflow/dealflow.toml` on Linux)
//! is used instead, and failing that the built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_BASE_URL;

pub const CONFIG_FILE: &str = "dealflow.toml";
pub const DEALFLOW_DIR: &str = ".dealflow";
pub const API_URL_ENV: &str = "DEALFLOW_API_URL";

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL of the CRM service, including the `/api` prefix
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    /// Token file, relative to `.dealflow/` unless absolute
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

fn default_token_file() -> String {
    "session.json".to_string()
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

/// The complete dealflow.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealflowToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub session: SessionSection,
}

impl DealflowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse dealflow.toml")
    }

    /// Load `<dealflow_dir>/dealflow.toml`, then the per-user file, then defaults.
    pub fn load_or_default(dealflow_dir: &Path) -> Result<Self> {
        let project_file = dealflow_dir.join(CONFIG_FILE);
        if project_file.exists() {
            return Self::load(&project_file);
        }
        match user_config_file() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize dealflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Base URL with the environment layered over the file.
    pub fn base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(url) = &self.api.base_url
            && let Some(problem) = check_url(url)
        {
            warnings.push(problem);
        }
        if self.api.timeout_secs == 0 {
            warnings.push("timeout_secs must be greater than zero".to_string());
        }
        if self.session.token_file.trim().is_empty() {
            warnings.push("token_file must not be empty".to_string());
        }
        warnings
    }
}

/// Per-user config file, if the platform has a config directory.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dealflow").join(CONFIG_FILE))
}

fn check_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Some("base_url must not be empty".to_string());
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Some(format!(
            "Invalid base_url '{}': should start with http:// or https://",
            url
        ));
    }
    None
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct DealflowConfig {
    pub project_dir: PathBuf,
    pub dealflow_dir: PathBuf,
    pub toml: DealflowToml,
    pub verbose: bool,
    /// CLI override for the base URL
    pub cli_api_url: Option<String>,
}

impl DealflowConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let dealflow_dir = project_dir.join(DEALFLOW_DIR);
        let toml = DealflowToml::load_or_default(&dealflow_dir)?;
        Ok(Self {
            project_dir,
            dealflow_dir,
            toml,
            verbose: false,
            cli_api_url: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        api_url: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_api_url = api_url.filter(|u| !u.trim().is_empty());
        Ok(config)
    }

    /// Base URL (CLI → env → file → default).
    pub fn base_url(&self) -> String {
        self.cli_api_url
            .clone()
            .unwrap_or_else(|| self.toml.base_url())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.api.timeout_secs)
    }

    pub fn config_file(&self) -> PathBuf {
        self.dealflow_dir.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        let token_file = Path::new(&self.toml.session.token_file);
        if token_file.is_absolute() {
            token_file.to_path_buf()
        } else {
            self.dealflow_dir.join(token_file)
        }
    }

    /// File warnings plus problems with the resolved URL.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if self.toml.api.base_url.is_none()
            && let Some(problem) = check_url(&self.base_url())
        {
            warnings.push(problem);
        }
        warnings
    }
}
