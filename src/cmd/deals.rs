//! Deal listing, detail, creation, editing, deletion and stage history.

use anyhow::{Context, Result};

use dealflow::config::Config;
use dealflow::errors::FormError;
use dealflow::forms::{DealDraft, DealEdit, Form, sales_reps};
use dealflow::models::{Stage, check_history};
use dealflow::ui::icons::{CHECK, WARN};
use dealflow::session::FileTokenStore;
use dealflow::stats::{summarize_deals, visible_deals};
use dealflow::ui::{Spinner, render};

use super::super::DealsCommands;
use super::{confirm, now};

pub async fn cmd_deals(config: &Config, command: DealsCommands) -> Result<()> {
    let client = config.client()?;

    match command {
        DealsCommands::List => {
            let deals = client.list_deals().await.context("Failed to load deals")?;
            let viewer = FileTokenStore::new(config.session_file.clone())
                .load()
                .and_then(|session| session.user);
            let deals = visible_deals(deals, viewer.as_ref());
            if deals.is_empty() {
                println!("No deals yet. Create one with `dealflow deals create`.");
                return Ok(());
            }
            let spinner = Spinner::start("Loading payments and stage history");
            let rows = summarize_deals(&client, &deals, now()).await;
            spinner.clear();
            let rows = rows.context("Failed to load deal details")?;
            print!("{}", render::deal_summaries_table(&rows));
        }
        DealsCommands::Show { id } => {
            let deal = client
                .get_deal(id)
                .await
                .with_context(|| format!("Failed to load deal {}", id))?;
            print!("{}", render::deal_detail(&deal));
        }
        DealsCommands::Create {
            client: client_id,
            sales_rep,
            stage,
            value,
            probability,
            close,
        } => {
            let stage: Stage = stage.parse().map_err(anyhow::Error::msg)?;
            if let Some(rep) = sales_rep {
                let users = client.list_users().await.context("Failed to load users")?;
                if !sales_reps(&users).iter().any(|u| u.id == rep) {
                    anyhow::bail!("User {} is not a sales rep", rep);
                }
            }
            let mut form = Form::new(DealDraft {
                client_id,
                sales_rep_id: sales_rep,
                stage,
                estimated_value: value.unwrap_or_default(),
                probability: probability.unwrap_or_default(),
                expected_close: close.unwrap_or_default(),
            });
            let deal = form
                .submit(&client, |deal| {
                    println!("{}Created {}", CHECK, deal.card_id());
                })
                .await?;
            print!("{}", render::deal_detail(&deal));
        }
        DealsCommands::Update {
            id,
            client: client_id,
            sales_rep,
            stage,
            value,
            probability,
            close,
            won_on,
            lost_on,
        } => {
            let update = DealEdit {
                client_id,
                sales_rep_id: sales_rep,
                stage,
                estimated_value: value,
                probability,
                expected_close: close,
                won_on,
                lost_on,
            }
            .validate()?;
            let deal = client
                .update_deal(id, &update)
                .await
                .map_err(|e| FormError::from_api(e, "Failed to update deal."))?;
            println!("{}Updated {}", CHECK, deal.card_id());
            print!("{}", render::deal_detail(&deal));
        }
        DealsCommands::Delete { id, force } => {
            if !confirm(&format!("Delete deal {}?", id), force)? {
                println!("Cancelled.");
                return Ok(());
            }
            client
                .delete_deal(id)
                .await
                .with_context(|| format!("Failed to delete deal {}", id))?;
            println!("{}Deleted deal-{}", CHECK, id);
        }
    }

    Ok(())
}

pub async fn cmd_history(config: &Config, deal_id: i64) -> Result<()> {
    let client = config.client()?;
    let entries = client
        .stage_history(deal_id)
        .await
        .with_context(|| format!("Failed to load stage history for deal {}", deal_id))?;
    if entries.is_empty() {
        println!("No stage history for deal-{}.", deal_id);
        return Ok(());
    }
    print!("{}", render::history_table(&entries, now()));
    if !check_history(&entries).is_empty() {
        println!(
            "{}deal-{} has more than one open stage entry",
            WARN, deal_id
        );
    }
    Ok(())
}
