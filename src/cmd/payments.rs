//! Payment milestones of a deal.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use dealflow::config::Config;
use dealflow::forms::{Form, PaymentDraft};
use dealflow::models::{PaymentStatus, PaymentUpdate};
use dealflow::ui::icons::CHECK;
use dealflow::ui::render;

use super::super::PaymentsCommands;
use super::today;

pub async fn cmd_payments(config: &Config, command: PaymentsCommands) -> Result<()> {
    let client = config.client()?;

    match command {
        PaymentsCommands::List { deal } => {
            let payments = client
                .list_payments(deal)
                .await
                .with_context(|| format!("Failed to load payments for deal {}", deal))?;
            if payments.is_empty() {
                println!("No payment milestones for deal-{}.", deal);
            } else {
                print!("{}", render::payments_table(&payments));
            }
        }
        PaymentsCommands::Add {
            deal,
            name,
            amount,
            due,
            status,
            paid_on,
        } => {
            let status: PaymentStatus = status.parse().map_err(anyhow::Error::msg)?;
            let mut form = Form::new(PaymentDraft {
                deal_id: Some(deal),
                milestone_name: name.unwrap_or_default(),
                amount_due: amount.unwrap_or_default(),
                due_date: due.unwrap_or_default(),
                status,
                paid_on: paid_on.unwrap_or_default(),
            });
            let payment = form.submit(&client, today(), |_| {}).await?;
            println!(
                "{}Added milestone '{}' to deal-{}",
                CHECK, payment.milestone_name, deal
            );
            print!("{}", render::payments_table(std::slice::from_ref(&payment)));
        }
        PaymentsCommands::MarkPaid { payment, on } => {
            let paid_on = on
                .map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d"))
                .transpose()
                .context("--on must be a YYYY-MM-DD date")?;
            let update = PaymentUpdate::with_status(PaymentStatus::Paid, paid_on, today());
            let updated = client
                .update_payment(payment, &update)
                .await
                .with_context(|| format!("Failed to update payment {}", payment))?;
            println!(
                "{}Marked '{}' paid on {}",
                CHECK,
                updated.milestone_name,
                updated
                    .paid_on
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    Ok(())
}
