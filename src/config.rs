use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::CrmClient;
use crate::crm_config::DealflowConfig;
use crate::session::{FileTokenStore, TokenStore};

/// Runtime configuration for one command.
///
/// Bridges the layered [`DealflowConfig`] with what commands actually need:
/// a token store and a ready-to-use API client.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub dealflow_dir: PathBuf,
    pub session_file: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub verbose: bool,
}

impl Config {
    pub fn new(project_dir: PathBuf, verbose: bool, api_url: Option<String>) -> Result<Self> {
        let resolved = DealflowConfig::with_cli_args(project_dir, verbose, api_url)?;
        Ok(Self::from_resolved(&resolved))
    }

    pub fn from_resolved(resolved: &DealflowConfig) -> Self {
        Self {
            project_dir: resolved.project_dir.clone(),
            dealflow_dir: resolved.dealflow_dir.clone(),
            session_file: resolved.session_file(),
            base_url: resolved.base_url(),
            timeout: resolved.timeout(),
            verbose: resolved.verbose,
        }
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::new(FileTokenStore::new(self.session_file.clone()))
    }

    /// The session directory is only created when a token is stored.
    pub fn client(&self) -> Result<CrmClient> {
        CrmClient::new(&self.base_url, self.timeout, self.token_store())
            .context("Failed to build HTTP client")
    }
}
