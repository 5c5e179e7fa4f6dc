//! Action items of a deal.

use anyhow::{Context, Result};

use dealflow::config::Config;
use dealflow::forms::{ActionItemDraft, Form};
use dealflow::ui::icons::CHECK;
use dealflow::ui::render;

use super::super::ActionsCommands;

pub async fn cmd_actions(config: &Config, command: ActionsCommands) -> Result<()> {
    let client = config.client()?;

    match command {
        ActionsCommands::List { deal } => {
            let items = client
                .list_action_items(deal)
                .await
                .with_context(|| format!("Failed to load action items for deal {}", deal))?;
            if items.is_empty() {
                println!("No action items for deal-{}.", deal);
            } else {
                print!("{}", render::actions_table(&items));
            }
        }
        ActionsCommands::Add {
            deal,
            description,
            owner,
            due,
        } => {
            let mut form = Form::new(ActionItemDraft {
                deal_id: Some(deal),
                description: description.unwrap_or_default(),
                owner_id: owner,
                due_date: due.unwrap_or_default(),
            });
            let item = form.submit(&client, |_| {}).await?;
            println!("{}Added action item {} to deal-{}", CHECK, item.id, deal);
        }
    }

    Ok(())
}
