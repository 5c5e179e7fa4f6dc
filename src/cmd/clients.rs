//! Client listing, detail, creation, editing and deletion.

use anyhow::{Context, Result};

use dealflow::config::Config;
use dealflow::errors::FormError;
use dealflow::forms::{ClientDirectory, ClientDraft, ClientEdit, Form};
use dealflow::ui::icons::CHECK;
use dealflow::ui::render;

use super::super::ClientsCommands;
use super::confirm;

pub async fn cmd_clients(config: &Config, command: ClientsCommands) -> Result<()> {
    let client = config.client()?;

    match command {
        ClientsCommands::List => {
            let clients = client.list_clients().await.context("Failed to load clients")?;
            if clients.is_empty() {
                println!("No clients yet. Add one with `dealflow clients create`.");
            } else {
                print!("{}", render::clients_table(&clients));
            }
        }
        ClientsCommands::Show { id } => {
            let record = client
                .get_client(id)
                .await
                .with_context(|| format!("Failed to load client {}", id))?;
            print!("{}", render::client_detail(&record));
        }
        ClientsCommands::Create {
            company,
            contact,
            email,
            phone,
            board_id,
        } => {
            let mut form = Form::new(ClientDraft {
                company: company.unwrap_or_default(),
                contact_name: contact.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                monday_board_id: board_id.unwrap_or_default(),
            });
            form.draft.validate()?;
            let mut directory = ClientDirectory::new(
                client.list_clients().await.context("Failed to load clients")?,
            );
            let created = form.submit(&client, |c| directory.add(c)).await?;
            println!("{}Created client {} ({})", CHECK, created.company, created.id);
            println!();
            print!("{}", render::clients_table(directory.clients()));
        }
        ClientsCommands::Update {
            id,
            company,
            contact,
            email,
            phone,
            board_id,
        } => {
            let update = ClientEdit {
                company,
                contact_name: contact,
                email,
                phone,
                monday_board_id: board_id,
            }
            .validate()?;
            client
                .update_client(id, &update)
                .await
                .map_err(|e| FormError::from_api(e, "Failed to update client."))?;
            let record = client
                .get_client(id)
                .await
                .with_context(|| format!("Failed to load client {}", id))?;
            println!("{}Updated client {}", CHECK, id);
            print!("{}", render::client_detail(&record));
        }
        ClientsCommands::Delete { id, force } => {
            if !confirm(&format!("Delete client {}?", id), force)? {
                println!("Cancelled.");
                return Ok(());
            }
            client
                .delete_client(id)
                .await
                .with_context(|| format!("Failed to delete client {}", id))?;
            println!("{}Deleted client {}", CHECK, id);
        }
    }

    Ok(())
}
