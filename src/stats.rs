//! Pipeline statistics and per-deal dashboard figures.
//!
//! Everything is recomputed from the fetched deals, milestones and stage
//! history on each call; nothing is maintained incrementally.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use futures::future::join_all;
use serde::Serialize;

use crate::api::{HistorySource, PaymentSource};
use crate::errors::ApiError;
use crate::models::{Deal, PaymentMilestone, PaymentStatus, Role, Stage, StageHistoryEntry, User};

const MS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Mean occupancy of one stage label.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageDuration {
    pub stage: String,
    pub entries: usize,
    pub average_days: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineStats {
    pub deal_count: usize,
    pub total_pipeline_value: f64,
    pub contracted_value: f64,
    /// Total value minus the value of deals sitting in `Deposit`.
    pub receivables: f64,
    pub average_deal_size: f64,
    /// Mean lead time across stages, from `by_stage`.
    pub average_lead_time_per_stage: Option<f64>,
    /// Mean occupancy across all history entries; open entries run to `now`.
    pub average_time_in_stage: Option<f64>,
    pub by_stage: Vec<StageDuration>,
    /// Sum of pending milestone amounts, when milestones were supplied.
    pub outstanding_payments: Option<f64>,
}

/// Whole days from `since` to `until`, rounded, never less than one.
pub fn elapsed_days(since: NaiveDateTime, until: NaiveDateTime) -> i64 {
    let millis = (until - since).num_milliseconds();
    let days = (millis as f64 / MS_PER_DAY).round() as i64;
    days.max(1)
}

/// Whole days spent in a stage, rounded, never less than one.
pub fn occupancy_days(entry: &StageHistoryEntry, now: NaiveDateTime) -> i64 {
    elapsed_days(entry.entered_at, entry.exited_at.unwrap_or(now))
}

fn sum_value<'a>(deals: impl Iterator<Item = &'a Deal>) -> f64 {
    deals.map(|d| d.estimated_value).sum()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

fn stage_durations(history: &[StageHistoryEntry], now: NaiveDateTime) -> Vec<StageDuration> {
    let mut grouped: HashMap<&str, Vec<i64>> = HashMap::new();
    for entry in history {
        grouped
            .entry(entry.stage.as_str())
            .or_default()
            .push(occupancy_days(entry, now));
    }

    let mut durations: Vec<StageDuration> = grouped
        .into_iter()
        .map(|(stage, days)| StageDuration {
            stage: stage.to_string(),
            entries: days.len(),
            average_days: days.iter().sum::<i64>() as f64 / days.len() as f64,
        })
        .collect();
    // Board order first, labels outside the current stage set after, alphabetically.
    durations.sort_by(|a, b| {
        let rank = |label: &str| label.parse::<Stage>().ok();
        match (rank(&a.stage), rank(&b.stage)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.stage.cmp(&b.stage),
        }
    });
    durations
}

impl PipelineStats {
    pub fn compute(deals: &[Deal], history: &[StageHistoryEntry], now: NaiveDateTime) -> Self {
        let total_pipeline_value = sum_value(deals.iter());
        let contracted_value = sum_value(deals.iter().filter(|d| d.stage.is_contracted()));
        let deposit_value = sum_value(deals.iter().filter(|d| d.stage == Stage::Deposit));
        let average_deal_size = if deals.is_empty() {
            0.0
        } else {
            total_pipeline_value / deals.len() as f64
        };

        let by_stage = stage_durations(history, now);

        Self {
            deal_count: deals.len(),
            total_pipeline_value,
            contracted_value,
            receivables: total_pipeline_value - deposit_value,
            average_deal_size,
            average_lead_time_per_stage: mean(by_stage.iter().map(|s| s.average_days)),
            average_time_in_stage: mean(history.iter().map(|e| occupancy_days(e, now) as f64)),
            by_stage,
            outstanding_payments: None,
        }
    }

    pub fn with_payments(mut self, payments: &[PaymentMilestone]) -> Self {
        self.outstanding_payments = Some(
            payments
                .iter()
                .filter(|p| p.is_outstanding())
                .map(|p| p.amount_due)
                .sum(),
        );
        self
    }
}

/// Fetch stage history for every deal concurrently.
///
/// A failure for one deal drops that deal's entries; only an expired
/// session aborts the whole collection.
pub async fn collect_history<S: HistorySource + ?Sized>(
    source: &S,
    deals: &[Deal],
) -> Result<Vec<StageHistoryEntry>, ApiError> {
    let results = join_all(deals.iter().map(|d| source.stage_history(d.id))).await;
    let mut history = Vec::new();
    for (deal, result) in deals.iter().zip(results) {
        match result {
            Ok(entries) => history.extend(entries),
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => tracing::debug!(deal_id = deal.id, error = %e, "skipping stage history"),
        }
    }
    Ok(history)
}

/// One row of the deals dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DealSummary {
    pub deal: Deal,
    /// Sum of paid milestone amounts.
    pub total_paid: f64,
    /// Estimated value minus `total_paid`.
    pub outstanding: f64,
    pub days_in_process: i64,
    /// Days in the current stage; `0` when no open stage entry is known.
    pub days_in_stage: i64,
}

impl DealSummary {
    /// `None` for payments or history means the fetch failed: nothing paid,
    /// and no days in stage.
    pub fn compute(
        deal: &Deal,
        payments: Option<&[PaymentMilestone]>,
        history: Option<&[StageHistoryEntry]>,
        now: NaiveDateTime,
    ) -> Self {
        let total_paid: f64 = payments
            .unwrap_or_default()
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .map(|p| p.amount_due)
            .sum();
        let days_in_stage = history
            .unwrap_or_default()
            .iter()
            .find(|e| e.is_open())
            .map(|e| elapsed_days(e.entered_at, now))
            .unwrap_or(0);

        Self {
            deal: deal.clone(),
            total_paid,
            outstanding: deal.estimated_value - total_paid,
            days_in_process: elapsed_days(deal.created_at, now),
            days_in_stage,
        }
    }
}

/// Deals a user works on: sales reps see their own, everyone else sees all.
pub fn visible_deals(deals: Vec<Deal>, viewer: Option<&User>) -> Vec<Deal> {
    match viewer {
        Some(user) if user.role == Role::SalesRep => deals
            .into_iter()
            .filter(|d| d.sales_rep_id == user.id)
            .collect(),
        _ => deals,
    }
}

/// Fetch milestones and stage history for every deal concurrently and build
/// the dashboard rows, in the order of `deals`.
///
/// A failed fetch for one deal falls back to empty figures for that deal;
/// only an expired session aborts.
pub async fn summarize_deals<S: HistorySource + PaymentSource + ?Sized>(
    source: &S,
    deals: &[Deal],
    now: NaiveDateTime,
) -> Result<Vec<DealSummary>, ApiError> {
    let fetches = deals
        .iter()
        .map(|d| async move { futures::join!(source.list_payments(d.id), source.stage_history(d.id)) });
    let results = join_all(fetches).await;

    let mut summaries = Vec::with_capacity(deals.len());
    for (deal, (payments, history)) in deals.iter().zip(results) {
        let payments = tolerate(deal.id, "payment milestones", payments)?;
        let history = tolerate(deal.id, "stage history", history)?;
        summaries.push(DealSummary::compute(
            deal,
            payments.as_deref(),
            history.as_deref(),
            now,
        ));
    }
    Ok(summaries)
}

fn tolerate<T>(deal_id: i64, what: &str, result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::debug!(deal_id, error = %e, "falling back without {}", what);
            Ok(None)
        }
    }
}
