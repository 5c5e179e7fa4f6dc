//! Pipeline board: deals grouped into stage columns, moved by drag and drop.
//!
//! ## Move protocol
//!
//! 1. `begin_move` resolves the drop target, snapshots the deal list and
//!    applies the new stage locally so the board reflects it at once.
//! 2. The caller confirms the stage with the service (`StageGateway`).
//! 3. `finish_move` commits on success. On failure the deal goes back to
//!    the last stage the service accepted, which is the pre-move snapshot
//!    when nothing else changed. An answer for a move superseded by a newer
//!    move of the same deal, or by a reload, is `Stale` and never rolls
//!    anything back.
//!
//! `move_deal` chains the three steps for callers that only run one move
//! at a time.

pub mod coordinator;
pub mod target;

pub use coordinator::{BoardCoordinator, ColumnView, MoveOutcome, PendingMove};
pub use target::DropTarget;
