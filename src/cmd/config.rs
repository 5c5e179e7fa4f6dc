//! Configuration view and validation commands: `dealflow config`.

use anyhow::Result;

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(
    project_dir: &std::path::Path,
    cli: &Cli,
    command: Option<ConfigCommands>,
) -> Result<()> {
    use dealflow::crm_config::{API_URL_ENV, DealflowConfig, user_config_file};
    use dealflow::session::FileTokenStore;

    let config =
        DealflowConfig::with_cli_args(project_dir.to_path_buf(), cli.verbose, cli.api_url.clone())?;
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("dealflow Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else if let Some(user_file) = user_config_file().filter(|p| p.exists()) {
                println!("Config file: {} (user)", user_file.display());
            } else {
                println!("No dealflow.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let toml = &config.toml;
            println!("[api]");
            match &toml.api.base_url {
                Some(url) => println!("  base_url = \"{}\"", url),
                None => println!("  base_url = (unset)"),
            }
            println!("  timeout_secs = {}", toml.api.timeout_secs);
            println!();
            println!("[session]");
            println!("  token_file = \"{}\"", toml.session.token_file);
            println!();

            let source = if config.cli_api_url.is_some() {
                "--api-url"
            } else if std::env::var(API_URL_ENV).is_ok_and(|v| !v.trim().is_empty()) {
                API_URL_ENV
            } else if toml.api.base_url.is_some() {
                "dealflow.toml"
            } else {
                "default"
            };
            println!("Effective values (with env/CLI overrides):");
            println!("  base_url = \"{}\" ({})", config.base_url(), source);
            println!("  session_file = \"{}\"", config.session_file().display());
            let signed_in = FileTokenStore::new(config.session_file())
                .load()
                .map(|s| match s.user {
                    Some(user) => format!("{} <{}>", user.name, user.email),
                    None => "yes".to_string(),
                })
                .unwrap_or_else(|| "no".to_string());
            println!("  signed_in = {}", signed_in);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
                println!();
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
                println!();
                anyhow::bail!("{} configuration problem(s) found", warnings.len());
            }
        }
    }

    Ok(())
}
