use anyhow::{Context, Result};
use dialoguer::Password;

use dealflow::config::Config;
use dealflow::forms::{Form, UserDraft};
use dealflow::models::Role;
use dealflow::ui::icons::CHECK;
use dealflow::ui::render;

use super::super::UsersCommands;

pub async fn cmd_users(config: &Config, command: UsersCommands) -> Result<()> {
    let client = config.client()?;

    match command {
        UsersCommands::List => {
            let users = client.list_users().await.context("Failed to load users")?;
            print!("{}", render::users_table(&users));
        }
        UsersCommands::Create {
            name,
            email,
            password,
            role,
        } => {
            let role = role
                .map(|r| r.parse::<Role>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let password = match password {
                Some(password) => password,
                None => Password::new()
                    .with_prompt("Password for the new account")
                    .with_confirmation("Repeat password", "Passwords do not match")
                    .interact()?,
            };
            let mut form = Form::new(UserDraft {
                name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                password,
                role,
            });
            let user = form.submit(&client, |_| {}).await?;
            println!(
                "{}Created {} account for {} <{}>",
                CHECK,
                user.role.as_str(),
                user.name,
                user.email
            );
        }
    }

    Ok(())
}
