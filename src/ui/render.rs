//! Plain-text renderings of CRM records for the terminal.
//!
//! Every function returns a `String` so commands decide where it goes and
//! tests can inspect it.

use chrono::NaiveDateTime;
use console::style;
use std::fmt::Write;

use crate::board::ColumnView;
use crate::models::{
    ActionItem, Client, Deal, PaymentMilestone, PaymentStatus, StageHistoryEntry, User,
};
use crate::stats::{DealSummary, PipelineStats, occupancy_days};
use crate::ui::icons::{CHART, CLOCK, MONEY};

/// `$12,345.60`. Negative zero renders as zero.
pub fn money(value: f64) -> String {
    let value = value + 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Probability in `[0, 1]` as a whole percentage.
pub fn percent(probability: f64) -> String {
    format!("{:.0}%", probability * 100.0)
}

fn days(value: f64) -> String {
    format!("{:.1} days", value)
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

pub fn board(columns: &[ColumnView]) -> String {
    let mut out = String::new();
    for column in columns {
        let _ = writeln!(
            out,
            "{} {} {}  {}",
            style(column.stage.as_str()).bold().cyan(),
            style(format!("({})", column.deals.len())).dim(),
            money(column.total_value()),
            style(format!("[{}]", column.stage.column_id())).dim()
        );
        if column.deals.is_empty() {
            let _ = writeln!(out, "  {}", style("no deals").dim());
        }
        for deal in &column.deals {
            let _ = writeln!(
                out,
                "  {:<8} {:<28} {:>14} {:>5}",
                deal.card_id(),
                deal.client_company.as_deref().unwrap_or("-"),
                money(deal.estimated_value),
                percent(deal.probability)
            );
        }
        out.push('\n');
    }
    out
}

/// The deals dashboard: value, payments and elapsed days per deal.
pub fn deal_summaries_table(rows: &[DealSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<22} {:<18} {:>13} {:>13} {:>13} {:>8} {:>8}",
        "ID", "Company", "Stage", "Value", "Paid", "Outstanding", "Process", "In stage"
    );
    for row in rows {
        let deal = &row.deal;
        let in_stage = if row.days_in_stage > 0 {
            row.days_in_stage.to_string()
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:<6} {:<22} {:<18} {:>13} {:>13} {:>13} {:>8} {:>8}",
            deal.id,
            deal.client_company
                .clone()
                .unwrap_or_else(|| format!("client {}", deal.client_id)),
            deal.stage.as_str(),
            money(deal.estimated_value),
            money(row.total_paid),
            money(row.outstanding),
            row.days_in_process,
            in_stage
        );
    }
    out
}

pub fn deal_detail(deal: &Deal) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style(deal.display_name()).bold());
    let _ = writeln!(out, "  Stage:          {}", deal.stage);
    let _ = writeln!(out, "  Value:          {}", money(deal.estimated_value));
    let _ = writeln!(out, "  Probability:    {}", percent(deal.probability));
    let _ = writeln!(
        out,
        "  Sales rep:      {}",
        deal.sales_rep_name
            .clone()
            .unwrap_or_else(|| format!("user {}", deal.sales_rep_id))
    );
    let _ = writeln!(out, "  Expected close: {}", opt(&deal.expected_close));
    if let Some(won) = deal.won_on {
        let _ = writeln!(out, "  Won on:         {}", won);
    }
    if let Some(lost) = deal.lost_on {
        let _ = writeln!(out, "  Lost on:        {}", lost);
    }
    let _ = writeln!(out, "  Created:        {}", deal.created_at.format("%Y-%m-%d %H:%M"));
    out
}

pub fn clients_table(clients: &[Client]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<28} {:<22} {:<30} {:<16}",
        "ID", "Company", "Contact", "Email", "Phone"
    );
    let _ = writeln!(
        out,
        "{:<6} {:<28} {:<22} {:<30} {:<16}",
        "------", "----------------------------", "----------------------", "------------------------------", "----------------"
    );
    for client in clients {
        let _ = writeln!(
            out,
            "{:<6} {:<28} {:<22} {:<30} {:<16}",
            client.id,
            client.company,
            client.contact_name,
            client.email,
            opt(&client.phone)
        );
    }
    out
}

pub fn client_detail(client: &Client) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style(&client.company).bold());
    let _ = writeln!(out, "  Contact:  {}", client.contact_name);
    let _ = writeln!(out, "  Email:    {}", client.email);
    let _ = writeln!(out, "  Phone:    {}", opt(&client.phone));
    if let Some(board) = &client.monday_board_id {
        let _ = writeln!(out, "  Board ID: {}", board);
    }
    out
}

pub fn payments_table(payments: &[PaymentMilestone]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<24} {:>14} {:<10}  {:<8} {:<10}",
        "ID", "Milestone", "Amount", "Due", "Status", "Paid on"
    );
    for payment in payments {
        let status = match payment.status {
            PaymentStatus::Paid => style(payment.status.as_str()).green(),
            PaymentStatus::Pending => style(payment.status.as_str()).yellow(),
        };
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:>14} {:<10}  {:<8} {:<10}",
            payment.id,
            payment.milestone_name,
            money(payment.amount_due),
            payment.due_date,
            status,
            opt(&payment.paid_on)
        );
    }
    out
}

pub fn history_table(entries: &[StageHistoryEntry], now: NaiveDateTime) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18} {:<17} {:<17} {:>5}",
        "Stage", "Entered", "Exited", "Days"
    );
    for entry in entries {
        let exited = entry
            .exited_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "(current)".to_string());
        let _ = writeln!(
            out,
            "{:<18} {:<17} {:<17} {:>5}",
            entry.stage,
            entry.entered_at.format("%Y-%m-%d %H:%M"),
            exited,
            occupancy_days(entry, now)
        );
    }
    out
}

pub fn users_table(users: &[User]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<24} {:<30} {:<10}", "ID", "Name", "Email", "Role");
    for user in users {
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<30} {:<10}",
            user.id,
            user.name,
            user.email,
            user.role.as_str()
        );
    }
    out
}

pub fn actions_table(items: &[ActionItem]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<40} {:<18} {:<10}  {:<5}",
        "ID", "Description", "Owner", "Due", "Done"
    );
    for item in items {
        let _ = writeln!(
            out,
            "{:<6} {:<40} {:<18} {:<10}  {:<5}",
            item.id,
            item.description,
            item.owner_name
                .clone()
                .unwrap_or_else(|| format!("user {}", item.owner_id)),
            item.due_date,
            if item.completed_at.is_some() { "yes" } else { "no" }
        );
    }
    out
}

/// Stat cards followed by the per-stage lead times.
pub fn stats(stats: &PipelineStats) -> String {
    let mut out = String::new();
    let card = |out: &mut String, label: &str, value: String| {
        let _ = writeln!(out, "  {:<26} {}", style(label).dim(), style(value).bold());
    };

    let _ = writeln!(out, "{}{}", CHART, style("Pipeline").bold());
    card(&mut out, "Deals", stats.deal_count.to_string());
    card(&mut out, "Total pipeline value", money(stats.total_pipeline_value));
    card(&mut out, "Average deal size", money(stats.average_deal_size));
    out.push('\n');

    let _ = writeln!(out, "{}{}", MONEY, style("Revenue").bold());
    card(&mut out, "Contracted value", money(stats.contracted_value));
    card(&mut out, "Receivables", money(stats.receivables));
    if let Some(outstanding) = stats.outstanding_payments {
        card(&mut out, "Outstanding payments", money(outstanding));
    }
    out.push('\n');

    let _ = writeln!(out, "{}{}", CLOCK, style("Velocity").bold());
    card(
        &mut out,
        "Avg lead time per stage",
        stats.average_lead_time_per_stage.map(days).unwrap_or_else(|| "-".into()),
    );
    card(
        &mut out,
        "Avg time in stage",
        stats.average_time_in_stage.map(days).unwrap_or_else(|| "-".into()),
    );
    for stage in &stats.by_stage {
        let _ = writeln!(
            out,
            "    {:<22} {:>10}  {}",
            stage.stage,
            days(stage.average_days),
            style(format!("({} entries)", stage.entries)).dim()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardCoordinator;
    use crate::models::Stage;
    use chrono::NaiveDate;

    fn plain() {
        console::set_colors_enabled(false);
    }

    fn deal(id: i64, stage: Stage, value: f64) -> Deal {
        Deal {
            id,
            client_id: 1,
            sales_rep_id: 2,
            stage,
            estimated_value: value,
            probability: 0.4,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            updated_at: None,
            expected_close: None,
            won_on: None,
            lost_on: None,
            client_company: Some("Acme".into()),
            sales_rep_name: None,
        }
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(-0.0), "$0.00");
        assert_eq!(money(1234.5), "$1,234.50");
        assert_eq!(money(1_000_000.0), "$1,000,000.00");
        assert_eq!(money(999.999), "$1,000.00");
        assert_eq!(money(-42.1), "-$42.10");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.4), "40%");
        assert_eq!(percent(1.0), "100%");
    }

    #[test]
    fn test_board_lists_every_column_with_totals() {
        plain();
        let board_state = BoardCoordinator::with_deals(vec![
            deal(1, Stage::Lead, 1000.0),
            deal(2, Stage::Lead, 500.0),
            deal(3, Stage::Contract, 2000.0),
        ]);
        let text = board(&board_state.columns());
        for stage in Stage::ALL {
            assert!(text.contains(stage.as_str()), "missing {}", stage);
        }
        assert!(text.contains("Lead (2) $1,500.00"));
        assert!(text.contains("[column-Staged Payments]"));
        assert!(text.contains("deal-3"));
        assert!(text.contains("no deals"));
    }

    #[test]
    fn test_stats_cards_show_dash_without_history() {
        plain();
        let computed = PipelineStats::compute(&[deal(1, Stage::Deposit, 300.0)], &[], deal(1, Stage::Lead, 0.0).created_at);
        let text = stats(&computed);
        assert!(text.contains("Total pipeline value"));
        assert!(text.contains("$300.00"));
        assert!(text.contains("Avg time in stage"));
        assert!(!text.contains("Outstanding payments"));
    }

    #[test]
    fn test_history_marks_current_stage() {
        plain();
        let entered = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let text = history_table(
            &[StageHistoryEntry {
                id: 1,
                deal_id: 1,
                stage: "Proposal".into(),
                entered_at: entered,
                exited_at: None,
            }],
            now,
        );
        assert!(text.contains("(current)"));
        assert!(text.contains("10"));
    }

    #[test]
    fn test_deal_summaries_show_paid_outstanding_and_days() {
        plain();
        let created = deal(4, Stage::Deposit, 5000.0).created_at;
        let history = [StageHistoryEntry {
            id: 1,
            deal_id: 4,
            stage: "Deposit".into(),
            entered_at: created,
            exited_at: None,
        }];
        let row = DealSummary::compute(
            &deal(4, Stage::Deposit, 5000.0),
            Some(&[][..]),
            Some(&history[..]),
            created + chrono::Duration::days(3),
        );
        let text = deal_summaries_table(&[row]);
        assert!(text.contains("Outstanding"));
        assert!(text.contains("$5,000.00"));
        assert!(text.contains("$0.00"));
        assert!(text.contains("       3        3"));
    }
}
