//! `dealflow stats`.

use anyhow::{Context, Result};
use futures::future::join_all;

use dealflow::config::Config;
use dealflow::stats::{PipelineStats, collect_history};
use dealflow::ui::{Spinner, render};

use super::now;

pub async fn cmd_stats(config: &Config, include_payments: bool) -> Result<()> {
    let client = config.client()?;
    let spinner = Spinner::start("Computing pipeline statistics");

    let deals = match client.list_deals().await {
        Ok(deals) => deals,
        Err(e) => {
            spinner.clear();
            return Err(e).context("Failed to load deals");
        }
    };
    let history = match collect_history(&client, &deals).await {
        Ok(history) => history,
        Err(e) => {
            spinner.clear();
            return Err(e).context("Failed to load stage history");
        }
    };

    let mut stats = PipelineStats::compute(&deals, &history, now());

    if include_payments {
        let results = join_all(deals.iter().map(|d| client.list_payments(d.id))).await;
        let mut payments = Vec::new();
        for (deal, result) in deals.iter().zip(results) {
            match result {
                Ok(list) => payments.extend(list),
                Err(e) if e.is_unauthorized() => {
                    spinner.clear();
                    return Err(e).context("Failed to load payments");
                }
                Err(e) => tracing::debug!(deal_id = deal.id, error = %e, "skipping payments"),
            }
        }
        stats = stats.with_payments(&payments);
    }

    spinner.clear();
    print!("{}", render::stats(&stats));
    Ok(())
}
