use std::collections::HashMap;

use serde::Serialize;

use super::target::DropTarget;
use crate::api::StageGateway;
use crate::errors::{ApiError, BoardError};
use crate::fetch::{FetchGeneration, FetchTicket};
use crate::models::{Deal, Stage};

/// One rendered board column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub stage: Stage,
    pub deals: Vec<Deal>,
}

impl ColumnView {
    pub fn total_value(&self) -> f64 {
        self.deals.iter().map(|d| d.estimated_value).sum()
    }
}

/// A move that has been applied locally and awaits confirmation.
#[derive(Debug)]
pub struct PendingMove {
    pub deal_id: i64,
    pub from: Stage,
    pub to: Stage,
    generation: u64,
    revision: u64,
    snapshot: Vec<Deal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Target stage equals the current stage; nothing was sent.
    Unchanged,
    Committed,
    /// A newer move of the same deal (or a reload) was issued; this response
    /// did not change what the board shows.
    Stale,
}

/// Move bookkeeping for one deal.
#[derive(Debug, Clone, Copy)]
struct DealMoves {
    /// Generation of the most recent move issued for the deal.
    latest: u64,
    /// Whether the most recent move has had its answer.
    latest_settled: bool,
    /// Last stage the service accepted (or the stage it was loaded in).
    confirmed: Stage,
    confirmed_generation: u64,
}

impl DealMoves {
    fn loaded(stage: Stage, generation: u64) -> Self {
        Self {
            latest: generation,
            latest_settled: true,
            confirmed: stage,
            confirmed_generation: generation,
        }
    }
}

/// Holds the board's deals and applies stage moves optimistically.
///
/// The deal list is the only stored state; columns are derived from it on
/// every call to [`columns`](Self::columns).
#[derive(Debug, Default)]
pub struct BoardCoordinator {
    deals: Vec<Deal>,
    moves: HashMap<i64, DealMoves>,
    /// Monotonic across deals and loads, so answers to moves issued before a
    /// reload can never match a current generation.
    generation: u64,
    /// Bumped on every local mutation of `deals`.
    revision: u64,
    last_error: Option<String>,
    loads: FetchGeneration,
}

impl BoardCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deals(deals: Vec<Deal>) -> Self {
        let mut board = Self::default();
        board.replace_deals(deals);
        board
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn deal(&self, id: i64) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Group deals by stage in board order. Every stage gets a column, even when empty.
    pub fn columns(&self) -> Vec<ColumnView> {
        Stage::ALL
            .iter()
            .map(|stage| ColumnView {
                stage: *stage,
                deals: self
                    .deals
                    .iter()
                    .filter(|d| d.stage == *stage)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Start a board load. Any load still in flight is superseded.
    pub fn begin_load(&self) -> FetchTicket {
        self.loads.begin()
    }

    /// Drop every outstanding load, e.g. when the board view goes away.
    pub fn cancel_loads(&self) {
        self.loads.cancel();
    }

    /// Replace the board contents with a fetch result if `ticket` is still current.
    ///
    /// Moves still awaiting an answer become stale: the fetched stages win.
    pub fn load(&mut self, deals: Vec<Deal>, ticket: FetchTicket) -> bool {
        if !self.loads.is_current(ticket) {
            tracing::debug!("discarding superseded board load");
            return false;
        }
        self.replace_deals(deals);
        true
    }

    fn replace_deals(&mut self, deals: Vec<Deal>) {
        self.generation += 1;
        let generation = self.generation;
        self.moves = deals
            .iter()
            .map(|d| (d.id, DealMoves::loaded(d.stage, generation)))
            .collect();
        self.deals = deals;
        self.revision += 1;
        self.last_error = None;
    }

    fn set_stage(&mut self, deal_id: i64, stage: Stage) {
        if let Some(deal) = self.deals.iter_mut().find(|d| d.id == deal_id)
            && deal.stage != stage
        {
            deal.stage = stage;
            self.revision += 1;
        }
    }

    fn resolve_target(&self, target: &str) -> Result<Stage, BoardError> {
        let unknown = || BoardError::UnknownTarget {
            target: target.to_string(),
        };
        match target.parse::<DropTarget>().map_err(|_| unknown())? {
            DropTarget::Column(stage) => Ok(stage),
            DropTarget::Card(id) => self.deal(id).map(|d| d.stage).ok_or_else(unknown),
        }
    }

    /// Apply a move locally. Returns `None` when the deal is already in the target stage.
    pub fn begin_move(
        &mut self,
        deal_id: i64,
        target: &str,
    ) -> Result<Option<PendingMove>, BoardError> {
        let from = self
            .deal(deal_id)
            .map(|d| d.stage)
            .ok_or(BoardError::DealNotFound { id: deal_id })?;
        let to = self.resolve_target(target)?;
        if from == to {
            tracing::debug!(deal_id, stage = %to, "drop on same stage; nothing to do");
            return Ok(None);
        }

        let snapshot = self.deals.clone();
        self.set_stage(deal_id, to);
        self.generation += 1;
        let generation = self.generation;
        let moves = self
            .moves
            .entry(deal_id)
            .or_insert_with(|| DealMoves::loaded(from, 0));
        moves.latest = generation;
        moves.latest_settled = false;
        self.last_error = None;

        Ok(Some(PendingMove {
            deal_id,
            from,
            to,
            generation,
            revision: self.revision,
            snapshot,
        }))
    }

    /// Settle a move with the service's answer.
    ///
    /// A failure puts the deal back in the last stage the service accepted.
    /// When nothing else changed since the move, that is exactly the
    /// pre-move snapshot. An answer for a superseded move only updates the
    /// accepted stage, and is shown only once the newest move has settled.
    pub fn finish_move(
        &mut self,
        pending: PendingMove,
        result: Result<(), ApiError>,
    ) -> Result<MoveOutcome, BoardError> {
        let Some(moves) = self.moves.get_mut(&pending.deal_id) else {
            tracing::debug!(deal_id = pending.deal_id, "ignoring response for a deal no longer on the board");
            return Ok(MoveOutcome::Stale);
        };
        if result.is_ok() && pending.generation > moves.confirmed_generation {
            moves.confirmed = pending.to;
            moves.confirmed_generation = pending.generation;
        }
        let confirmed = moves.confirmed;
        let latest = moves.latest;

        if pending.generation != latest {
            tracing::debug!(
                deal_id = pending.deal_id,
                generation = pending.generation,
                latest,
                "ignoring response for superseded move"
            );
            if moves.latest_settled {
                self.set_stage(pending.deal_id, confirmed);
            }
            return Ok(MoveOutcome::Stale);
        }
        moves.latest_settled = true;

        match result {
            Ok(()) => {
                tracing::info!(deal_id = pending.deal_id, from = %pending.from, to = %pending.to, "stage move confirmed");
                Ok(MoveOutcome::Committed)
            }
            Err(e) => {
                tracing::warn!(deal_id = pending.deal_id, error = %e, "stage move rejected; rolling back");
                if self.revision == pending.revision && pending.from == confirmed {
                    self.deals = pending.snapshot;
                    self.revision += 1;
                } else {
                    self.set_stage(pending.deal_id, confirmed);
                }
                let err = BoardError::Confirm(e);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Apply, confirm, then commit or roll back.
    pub async fn move_deal<G: StageGateway + ?Sized>(
        &mut self,
        gateway: &G,
        deal_id: i64,
        target: &str,
    ) -> Result<MoveOutcome, BoardError> {
        let Some(pending) = self.begin_move(deal_id, target)? else {
            return Ok(MoveOutcome::Unchanged);
        };
        let result = gateway.confirm_stage(pending.deal_id, pending.to).await;
        self.finish_move(pending, result)
    }
}
