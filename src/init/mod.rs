//! `dealflow init`: create the per-project `.dealflow/` directory.
//!
//! ```text
//! .dealflow/
//! ├── dealflow.toml    # API and session settings
//! ├── .gitignore       # keeps the session token out of version control
//! └── session.json     # written by `dealflow login`
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_BASE_URL;
use crate::crm_config::{CONFIG_FILE, DEALFLOW_DIR, DealflowToml};

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    pub dealflow_dir: PathBuf,
    /// False when `.dealflow/` already existed
    pub created: bool,
    /// False when an existing dealflow.toml was left untouched
    pub config_written: bool,
}

/// Create `.dealflow/` with a default config. An existing config is never
/// overwritten.
pub fn init_project(project_dir: &Path, api_url: Option<&str>) -> Result<InitResult> {
    let dealflow_dir = project_dir.join(DEALFLOW_DIR);
    let created = !dealflow_dir.exists();
    std::fs::create_dir_all(&dealflow_dir)
        .with_context(|| format!("Failed to create directory: {}", dealflow_dir.display()))?;

    let config_path = dealflow_dir.join(CONFIG_FILE);
    let config_written = if config_path.exists() {
        false
    } else {
        let mut toml = DealflowToml::default();
        toml.api.base_url = Some(api_url.unwrap_or(DEFAULT_BASE_URL).to_string());
        toml.save(&config_path)?;
        true
    };

    let gitignore = dealflow_dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, "session.json\n")
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    Ok(InitResult {
        dealflow_dir,
        created,
        config_written,
    })
}

pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(DEALFLOW_DIR).join(CONFIG_FILE).exists()
}
