//! `dealflow login` and `dealflow logout`.

use anyhow::Result;
use dialoguer::{Input, Password};

use dealflow::config::Config;
use dealflow::ui::Spinner;

pub async fn cmd_login(
    config: &Config,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let client = config.client()?;
    let spinner = Spinner::start(format!("Signing in to {}", config.base_url));
    match client.login(&email, &password).await {
        Ok(response) => {
            spinner.success(format!(
                "Signed in as {} ({})",
                response.user.name,
                response.user.role.as_str()
            ));
            Ok(())
        }
        Err(e) => {
            let message = e.user_message("Login failed. Please try again.");
            spinner.failure(&message);
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

pub fn cmd_logout(config: &Config) -> Result<()> {
    let client = config.client()?;
    client.logout()?;
    println!("Signed out.");
    Ok(())
}
