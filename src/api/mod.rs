//! CRM REST client.
//!
//! [`CrmClient`] is constructed explicitly with a base URL, a timeout and a
//! [`TokenStore`](crate::session::TokenStore); there is no process-wide
//! instance. The traits below are the seams the board coordinator, the
//! create forms and the statistics depend on, so all of them can run
//! against test doubles.
//!
//! | Trait           | Used by                     | Real implementation |
//! |-----------------|-----------------------------|---------------------|
//! | `StageGateway`  | `board::BoardCoordinator`   | `CrmClient`         |
//! | `RecordGateway` | `forms::Form::submit`       | `CrmClient`         |
//! | `HistorySource` | `stats::collect_history`, `stats::summarize_deals` | `CrmClient` |
//! | `PaymentSource` | `stats::summarize_deals`    | `CrmClient`         |

pub mod client;

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::models::{
    ActionItem, Client, Deal, NewActionItem, NewClient, NewDeal, NewPayment, NewUser,
    PaymentMilestone, Stage, StageHistoryEntry, User,
};

pub use client::{CrmClient, DEFAULT_BASE_URL};

/// Confirms a stage move with the service.
#[async_trait]
pub trait StageGateway: Send + Sync {
    async fn confirm_stage(&self, deal_id: i64, stage: Stage) -> Result<(), ApiError>;
}

/// Creates records on behalf of the create forms.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    async fn create_deal(&self, deal: &NewDeal) -> Result<Deal, ApiError>;
    async fn create_client(&self, client: &NewClient) -> Result<Client, ApiError>;
    async fn create_payment(
        &self,
        deal_id: i64,
        payment: &NewPayment,
    ) -> Result<PaymentMilestone, ApiError>;
    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;
    async fn create_action_item(
        &self,
        deal_id: i64,
        item: &NewActionItem,
    ) -> Result<ActionItem, ApiError>;
}

/// Per-deal stage history, for the statistics view.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn stage_history(&self, deal_id: i64) -> Result<Vec<StageHistoryEntry>, ApiError>;
}

/// Per-deal payment milestones.
#[async_trait]
pub trait PaymentSource: Send + Sync {
    async fn list_payments(&self, deal_id: i64) -> Result<Vec<PaymentMilestone>, ApiError>;
}
