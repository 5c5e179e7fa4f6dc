use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::serde_util::{money, option_timestamp, timestamp};

/// Pipeline stages in board order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Lead,
    Prospect,
    Proposal,
    Contract,
    Deposit,
    #[serde(rename = "Staged Payments")]
    StagedPayments,
    #[serde(rename = "Project Delivery")]
    ProjectDelivery,
    #[serde(rename = "Final Payment")]
    FinalPayment,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Lead,
        Stage::Prospect,
        Stage::Proposal,
        Stage::Contract,
        Stage::Deposit,
        Stage::StagedPayments,
        Stage::ProjectDelivery,
        Stage::FinalPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Prospect => "Prospect",
            Self::Proposal => "Proposal",
            Self::Contract => "Contract",
            Self::Deposit => "Deposit",
            Self::StagedPayments => "Staged Payments",
            Self::ProjectDelivery => "Project Delivery",
            Self::FinalPayment => "Final Payment",
        }
    }

    /// Stages from `Contract` onwards count as signed business.
    pub fn is_contracted(&self) -> bool {
        *self >= Stage::Contract
    }

    /// Column identifier used as a drop target (`column-Staged Payments`).
    pub fn column_id(&self) -> String {
        format!("column-{}", self.as_str())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    /// Case-insensitive; spaces, dashes and underscores are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "lead" => Ok(Self::Lead),
            "prospect" => Ok(Self::Prospect),
            "proposal" => Ok(Self::Proposal),
            "contract" => Ok(Self::Contract),
            "deposit" => Ok(Self::Deposit),
            "stagedpayments" => Ok(Self::StagedPayments),
            "projectdelivery" => Ok(Self::ProjectDelivery),
            "finalpayment" => Ok(Self::FinalPayment),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    SalesRep,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::SalesRep => "SalesRep",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "salesrep" => Ok(Self::SalesRep),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// A sales opportunity on the pipeline board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub id: i64,
    pub client_id: i64,
    pub sales_rep_id: i64,
    pub stage: Stage,
    #[serde(with = "money")]
    pub estimated_value: f64,
    pub probability: f64,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default, with = "option_timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub expected_close: Option<NaiveDate>,
    #[serde(default)]
    pub won_on: Option<NaiveDate>,
    #[serde(default)]
    pub lost_on: Option<NaiveDate>,
    #[serde(default)]
    pub client_company: Option<String>,
    #[serde(default)]
    pub sales_rep_name: Option<String>,
}

impl Deal {
    /// Report invariant violations; an empty list means the record is sound.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.estimated_value >= 0.0) {
            problems.push(format!(
                "deal {}: estimated value {} is negative",
                self.id, self.estimated_value
            ));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            problems.push(format!(
                "deal {}: probability {} is outside [0, 1]",
                self.id, self.probability
            ));
        }
        problems
    }

    /// Drag handle identifier (`deal-17`).
    pub fn card_id(&self) -> String {
        format!("deal-{}", self.id)
    }

    pub fn display_name(&self) -> String {
        match &self.client_company {
            Some(company) => format!("#{} {}", self.id, company),
            None => format!("#{} client {}", self.id, self.client_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: i64,
    pub company: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub monday_board_id: Option<String>,
    #[serde(default, with = "option_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "option_timestamp")]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, with = "option_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

/// A scheduled partial payment on a deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentMilestone {
    pub id: i64,
    pub deal_id: i64,
    pub milestone_name: String,
    #[serde(with = "money")]
    pub amount_due: f64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
    #[serde(default, with = "option_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

impl PaymentMilestone {
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.paid_on.is_some() && self.status != PaymentStatus::Paid {
            problems.push(format!(
                "payment {}: paid-on date set while status is {}",
                self.id,
                self.status.as_str()
            ));
        }
        if self.amount_due < 0.0 {
            problems.push(format!("payment {}: amount due is negative", self.id));
        }
        problems
    }

    pub fn is_outstanding(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

/// One stage occupancy interval of a deal.
///
/// `stage` stays a raw label: history rows outlive renames of the stage set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageHistoryEntry {
    pub id: i64,
    pub deal_id: i64,
    pub stage: String,
    #[serde(with = "timestamp")]
    pub entered_at: NaiveDateTime,
    #[serde(default, with = "option_timestamp")]
    pub exited_at: Option<NaiveDateTime>,
}

impl StageHistoryEntry {
    pub fn is_open(&self) -> bool {
        self.exited_at.is_none()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage.parse().ok()
    }
}

/// Deals that have more than one open history entry, sorted by id.
pub fn check_history(entries: &[StageHistoryEntry]) -> Vec<i64> {
    let mut open: HashMap<i64, usize> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_open()) {
        *open.entry(entry.deal_id).or_default() += 1;
    }
    let mut offenders: Vec<i64> = open
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(deal_id, _)| deal_id)
        .collect();
    offenders.sort_unstable();
    offenders
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionItem {
    pub id: i64,
    pub deal_id: i64,
    pub description: String,
    pub owner_id: i64,
    pub due_date: NaiveDate,
    #[serde(default, with = "option_timestamp")]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub owner_name: Option<String>,
}

// Request payloads

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewDeal {
    pub client_id: i64,
    pub sales_rep_id: i64,
    pub stage: Stage,
    #[serde(with = "money")]
    pub estimated_value: f64,
    pub probability: f64,
    pub expected_close: NaiveDate,
}

/// Partial deal update; only populated fields are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DealUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_rep_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_close: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub won_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_on: Option<NaiveDate>,
}

impl DealUpdate {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewClient {
    pub company: String,
    pub contact_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday_board_id: Option<String>,
}

/// Partial client update; the service keeps any field left out.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday_board_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPayment {
    pub milestone_name: String,
    #[serde(with = "money")]
    pub amount_due: f64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PaymentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    /// `Some(None)` clears the date on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<Option<NaiveDate>>,
}

impl PaymentUpdate {
    /// Status change that keeps the paid-on invariant: paid gets a date,
    /// pending clears it.
    pub fn with_status(status: PaymentStatus, paid_on: Option<NaiveDate>, today: NaiveDate) -> Self {
        let paid_on = match status {
            PaymentStatus::Paid => Some(Some(paid_on.unwrap_or(today))),
            PaymentStatus::Pending => Some(None),
        };
        Self {
            status: Some(status),
            paid_on,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewActionItem {
    pub description: String,
    pub owner_id: i64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
