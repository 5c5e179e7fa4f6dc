//! Pipeline board and stage moves.

use anyhow::{Context, Result};

use dealflow::api::{CrmClient, StageGateway};
use dealflow::board::{BoardCoordinator, MoveOutcome};
use dealflow::config::Config;
use dealflow::errors::BoardError;
use dealflow::ui::icons::ARROW;
use dealflow::ui::{Spinner, render};

async fn load_board(client: &CrmClient) -> Result<BoardCoordinator> {
    let mut board = BoardCoordinator::new();
    let ticket = board.begin_load();
    let spinner = Spinner::start("Loading deals");
    let deals = client.list_deals().await;
    spinner.clear();
    let deals = deals.context("Failed to load deals")?;
    for deal in &deals {
        for problem in deal.validate() {
            tracing::warn!("{}", problem);
        }
    }
    board.load(deals, ticket);
    Ok(board)
}

pub async fn cmd_board(config: &Config) -> Result<()> {
    let client = config.client()?;
    let board = load_board(&client).await?;
    print!("{}", render::board(&board.columns()));
    Ok(())
}

pub async fn cmd_move(config: &Config, deal_id: i64, target: &str) -> Result<()> {
    let client = config.client()?;
    let mut board = load_board(&client).await?;

    let Some(pending) = board.begin_move(deal_id, target)? else {
        println!("deal-{} is already in that stage.", deal_id);
        return Ok(());
    };
    let (from, to) = (pending.from, pending.to);

    let spinner = Spinner::start(format!("deal-{}: {} {}{}", deal_id, from, ARROW, to));
    let result = client.confirm_stage(deal_id, to).await;
    match board.finish_move(pending, result) {
        Ok(MoveOutcome::Committed) => {
            spinner.success(format!("deal-{}: {} {}{}", deal_id, from, ARROW, to));
            Ok(())
        }
        Ok(outcome) => {
            spinner.clear();
            tracing::debug!(?outcome, "move settled without commit");
            Ok(())
        }
        Err(err @ BoardError::Confirm(_)) => {
            spinner.failure(err.to_string());
            if let Some(deal) = board.deal(deal_id) {
                println!("deal-{} remains in {}.", deal_id, deal.stage);
            }
            Err(err.into())
        }
        Err(err) => {
            spinner.clear();
            Err(err.into())
        }
    }
}
