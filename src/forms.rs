//! Create forms for deals, clients, payment milestones, users and action items,
//! plus partial edits of deals and clients.
//!
//! Every create form follows the same flow: check required fields locally,
//! send a single create request, then either hand the created record to the
//! caller's callback or keep a displayable error. A form holds nothing but
//! its draft and a loading/error flag.

use std::future::Future;

use chrono::NaiveDate;

use crate::api::RecordGateway;
use crate::errors::{ApiError, FormError};
use crate::models::{
    ActionItem, Client, ClientUpdate, Deal, DealUpdate, NewActionItem, NewClient, NewDeal, NewPayment, NewUser,
    PaymentMilestone, PaymentStatus, Role, Stage, User,
};

const CLIENT_FALLBACK: &str = "Failed to create company. Please try again.";
const DEAL_FALLBACK: &str = "Failed to create deal. Please try again.";
const PAYMENT_FALLBACK: &str = "Failed to add payment.";
const USER_FALLBACK: &str = "Failed to create account. Please try again.";
const ACTION_FALLBACK: &str = "Failed to add action item.";

/// Loading and error flags shared by every form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub loading: bool,
    pub error: Option<String>,
}

/// A draft plus its submission state.
#[derive(Debug, Clone, Default)]
pub struct Form<D> {
    pub draft: D,
    pub state: FormState,
}

impl<D: Default> Form<D> {
    pub fn new(draft: D) -> Self {
        Self {
            draft,
            state: FormState::default(),
        }
    }

    /// Clear the draft and any error, as when the form is closed.
    pub fn reset(&mut self) {
        self.draft = D::default();
        self.state = FormState::default();
    }

    fn reject<T>(&mut self, err: FormError) -> Result<T, FormError> {
        self.state.error = Some(err.to_string());
        Err(err)
    }

    async fn send<T, Fut>(
        &mut self,
        request: Fut,
        fallback: &str,
        on_created: impl FnOnce(&T),
    ) -> Result<T, FormError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.state.loading = true;
        self.state.error = None;
        let result = request.await;
        self.state.loading = false;
        match result {
            Ok(created) => {
                on_created(&created);
                self.reset();
                Ok(created)
            }
            Err(e) => {
                tracing::debug!(error = %e, "create request failed");
                self.reject(FormError::from_api(e, fallback))
            }
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FormError::Invalid(format!("{} must be a YYYY-MM-DD date, got '{}'", field, value.trim())))
}

fn parse_amount(field: &str, value: &str) -> Result<f64, FormError> {
    let amount: f64 = value
        .trim()
        .parse()
        .map_err(|_| FormError::Invalid(format!("{} must be a number, got '{}'", field, value.trim())))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(FormError::Invalid(format!("{} must not be negative", field)));
    }
    Ok(amount)
}

// ── Client ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDraft {
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub monday_board_id: String,
}

impl ClientDraft {
    pub fn validate(&self) -> Result<NewClient, FormError> {
        let mut missing = Vec::new();
        if blank(&self.company) {
            missing.push("company");
        }
        if blank(&self.contact_name) {
            missing.push("contact_name");
        }
        if blank(&self.email) {
            missing.push("email");
        }
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }
        Ok(NewClient {
            company: self.company.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: optional(&self.phone),
            monday_board_id: optional(&self.monday_board_id),
        })
    }
}

impl Form<ClientDraft> {
    pub async fn submit<G: RecordGateway + ?Sized>(
        &mut self,
        gateway: &G,
        on_created: impl FnOnce(&Client),
    ) -> Result<Client, FormError> {
        let request = match self.draft.validate() {
            Ok(request) => request,
            Err(e) => return self.reject(e),
        };
        self.send(gateway.create_client(&request), CLIENT_FALLBACK, on_created)
            .await
    }
}

// ── Deal ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DealDraft {
    pub client_id: Option<i64>,
    pub sales_rep_id: Option<i64>,
    pub stage: Stage,
    pub estimated_value: String,
    /// Percentage, 0 to 100.
    pub probability: String,
    pub expected_close: String,
}

impl Default for DealDraft {
    fn default() -> Self {
        Self {
            client_id: None,
            sales_rep_id: None,
            stage: Stage::Lead,
            estimated_value: String::new(),
            probability: String::new(),
            expected_close: String::new(),
        }
    }
}

impl DealDraft {
    pub fn validate(&self) -> Result<NewDeal, FormError> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("client");
        }
        if self.sales_rep_id.is_none() {
            missing.push("sales_rep");
        }
        if blank(&self.estimated_value) {
            missing.push("estimated_value");
        }
        if blank(&self.probability) {
            missing.push("probability");
        }
        if blank(&self.expected_close) {
            missing.push("expected_close");
        }
        let (Some(client_id), Some(sales_rep_id)) = (self.client_id, self.sales_rep_id) else {
            return Err(FormError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }

        let percent = parse_amount("probability", &self.probability)?;
        if percent > 100.0 {
            return Err(FormError::Invalid(
                "probability must be between 0 and 100".to_string(),
            ));
        }
        Ok(NewDeal {
            client_id,
            sales_rep_id,
            stage: self.stage,
            estimated_value: parse_amount("estimated_value", &self.estimated_value)?,
            probability: percent / 100.0,
            expected_close: parse_date("expected_close", &self.expected_close)?,
        })
    }
}

impl Form<DealDraft> {
    pub async fn submit<G: RecordGateway + ?Sized>(
        &mut self,
        gateway: &G,
        on_created: impl FnOnce(&Deal),
    ) -> Result<Deal, FormError> {
        let request = match self.draft.validate() {
            Ok(request) => request,
            Err(e) => return self.reject(e),
        };
        self.send(gateway.create_deal(&request), DEAL_FALLBACK, on_created)
            .await
    }
}

/// Owners offered by the deal form: sales reps only.
pub fn sales_reps(users: &[User]) -> Vec<&User> {
    users.iter().filter(|u| u.role == Role::SalesRep).collect()
}

// ── Payment milestone ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDraft {
    pub deal_id: Option<i64>,
    pub milestone_name: String,
    pub amount_due: String,
    pub due_date: String,
    pub status: PaymentStatus,
    pub paid_on: String,
}

impl Default for PaymentDraft {
    fn default() -> Self {
        Self {
            deal_id: None,
            milestone_name: String::new(),
            amount_due: String::new(),
            due_date: String::new(),
            status: PaymentStatus::Pending,
            paid_on: String::new(),
        }
    }
}

impl PaymentDraft {
    /// A paid milestone without a date is taken as paid `today`; a pending
    /// one never carries a paid-on date.
    pub fn validate(&self, today: NaiveDate) -> Result<(i64, NewPayment), FormError> {
        let mut missing = Vec::new();
        if self.deal_id.is_none() {
            missing.push("deal");
        }
        if blank(&self.milestone_name) {
            missing.push("milestone_name");
        }
        if blank(&self.amount_due) {
            missing.push("amount_due");
        }
        if blank(&self.due_date) {
            missing.push("due_date");
        }
        let Some(deal_id) = self.deal_id.filter(|_| missing.is_empty()) else {
            return Err(FormError::MissingFields(missing));
        };

        let paid_on = match self.status {
            PaymentStatus::Pending => None,
            PaymentStatus::Paid if blank(&self.paid_on) => Some(today),
            PaymentStatus::Paid => Some(parse_date("paid_on", &self.paid_on)?),
        };
        Ok((
            deal_id,
            NewPayment {
                milestone_name: self.milestone_name.trim().to_string(),
                amount_due: parse_amount("amount_due", &self.amount_due)?,
                due_date: parse_date("due_date", &self.due_date)?,
                status: self.status,
                paid_on,
            },
        ))
    }
}

impl Form<PaymentDraft> {
    pub async fn submit<G: RecordGateway + ?Sized>(
        &mut self,
        gateway: &G,
        today: NaiveDate,
        on_created: impl FnOnce(&PaymentMilestone),
    ) -> Result<PaymentMilestone, FormError> {
        let (deal_id, request) = match self.draft.validate(today) {
            Ok(parts) => parts,
            Err(e) => return self.reject(e),
        };
        self.send(
            gateway.create_payment(deal_id, &request),
            PAYMENT_FALLBACK,
            on_created,
        )
        .await
    }
}

// ── User ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl UserDraft {
    pub fn validate(&self) -> Result<NewUser, FormError> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.email) {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.role.is_none() {
            missing.push("role");
        }
        match self.role {
            Some(role) if missing.is_empty() => Ok(NewUser {
                name: self.name.trim().to_string(),
                email: self.email.trim().to_string(),
                password: self.password.clone(),
                role,
            }),
            _ => Err(FormError::MissingFields(missing)),
        }
    }
}

impl Form<UserDraft> {
    pub async fn submit<G: RecordGateway + ?Sized>(
        &mut self,
        gateway: &G,
        on_created: impl FnOnce(&User),
    ) -> Result<User, FormError> {
        let request = match self.draft.validate() {
            Ok(request) => request,
            Err(e) => return self.reject(e),
        };
        self.send(gateway.create_user(&request), USER_FALLBACK, on_created)
            .await
    }
}

// ── Action item ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionItemDraft {
    pub deal_id: Option<i64>,
    pub description: String,
    pub owner_id: Option<i64>,
    pub due_date: String,
}

impl ActionItemDraft {
    pub fn validate(&self) -> Result<(i64, NewActionItem), FormError> {
        let mut missing = Vec::new();
        if self.deal_id.is_none() {
            missing.push("deal");
        }
        if blank(&self.description) {
            missing.push("description");
        }
        if self.owner_id.is_none() {
            missing.push("owner");
        }
        if blank(&self.due_date) {
            missing.push("due_date");
        }
        match (self.deal_id, self.owner_id) {
            (Some(deal_id), Some(owner_id)) if missing.is_empty() => Ok((
                deal_id,
                NewActionItem {
                    description: self.description.trim().to_string(),
                    owner_id,
                    due_date: parse_date("due_date", &self.due_date)?,
                },
            )),
            _ => Err(FormError::MissingFields(missing)),
        }
    }
}

impl Form<ActionItemDraft> {
    pub async fn submit<G: RecordGateway + ?Sized>(
        &mut self,
        gateway: &G,
        on_created: impl FnOnce(&ActionItem),
    ) -> Result<ActionItem, FormError> {
        let (deal_id, request) = match self.draft.validate() {
            Ok(parts) => parts,
            Err(e) => return self.reject(e),
        };
        self.send(
            gateway.create_action_item(deal_id, &request),
            ACTION_FALLBACK,
            on_created,
        )
        .await
    }
}

// ── Edits ─────────────────────────────────────────────────────────────

/// Fields given for a deal edit. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealEdit {
    pub client_id: Option<i64>,
    pub sales_rep_id: Option<i64>,
    pub stage: Option<String>,
    pub estimated_value: Option<String>,
    /// Percentage, 0 to 100.
    pub probability: Option<String>,
    pub expected_close: Option<String>,
    pub won_on: Option<String>,
    pub lost_on: Option<String>,
}

impl DealEdit {
    pub fn validate(&self) -> Result<DealUpdate, FormError> {
        let date = |field: &str, value: &Option<String>| {
            value.as_deref().map(|v| parse_date(field, v)).transpose()
        };
        let stage = self
            .stage
            .as_deref()
            .map(|s| s.parse::<Stage>().map_err(FormError::Invalid))
            .transpose()?;
        let estimated_value = self
            .estimated_value
            .as_deref()
            .map(|v| parse_amount("estimated_value", v).map(|a| format!("{:.2}", a)))
            .transpose()?;
        let probability = match self.probability.as_deref() {
            Some(v) => {
                let percent = parse_amount("probability", v)?;
                if percent > 100.0 {
                    return Err(FormError::Invalid(
                        "probability must be between 0 and 100".to_string(),
                    ));
                }
                Some(percent / 100.0)
            }
            None => None,
        };

        let update = DealUpdate {
            client_id: self.client_id,
            sales_rep_id: self.sales_rep_id,
            stage,
            estimated_value,
            probability,
            expected_close: date("expected_close", &self.expected_close)?,
            won_on: date("won_on", &self.won_on)?,
            lost_on: date("lost_on", &self.lost_on)?,
        };
        if update == DealUpdate::default() {
            return Err(FormError::Invalid("nothing to update".to_string()));
        }
        Ok(update)
    }
}

/// Fields given for a client edit. `None` leaves the field as it is; an
/// empty phone or board id clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientEdit {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub monday_board_id: Option<String>,
}

impl ClientEdit {
    pub fn validate(&self) -> Result<ClientUpdate, FormError> {
        let required = |field: &str, value: &Option<String>| match value.as_deref() {
            Some(v) if blank(v) => Err(FormError::Invalid(format!("{} must not be empty", field))),
            Some(v) => Ok(Some(v.trim().to_string())),
            None => Ok(None),
        };
        let update = ClientUpdate {
            company: required("company", &self.company)?,
            contact_name: required("contact_name", &self.contact_name)?,
            email: required("email", &self.email)?,
            phone: self.phone.as_deref().map(|v| v.trim().to_string()),
            monday_board_id: self.monday_board_id.as_deref().map(|v| v.trim().to_string()),
        };
        if update == ClientUpdate::default() {
            return Err(FormError::Invalid("nothing to update".to_string()));
        }
        Ok(update)
    }
}

/// Clients known to a list view. Created clients are appended through the
/// form callback, so the list shows them without another fetch.
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory {
    clients: Vec<Client>,
}

impl ClientDirectory {
    pub fn new(clients: Vec<Client>) -> Self {
        Self { clients }
    }

    pub fn add(&mut self, client: &Client) {
        self.clients.push(client.clone());
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes create requests back as records; fails when `fail_with` is set.
    #[derive(Default)]
    struct MockGateway {
        fail_with: Option<(u16, Option<String>)>,
        calls: Mutex<usize>,
    }

    impl MockGateway {
        fn failing(status: u16, message: Option<&str>) -> Self {
            Self {
                fail_with: Some((status, message.map(String::from))),
                ..Default::default()
            }
        }

        fn outcome(&self) -> Result<(), ApiError> {
            *self.calls.lock().unwrap() += 1;
            match &self.fail_with {
                Some((status, message)) => Err(ApiError::Http {
                    status: *status,
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RecordGateway for MockGateway {
        async fn create_deal(&self, deal: &NewDeal) -> Result<Deal, ApiError> {
            self.outcome()?;
            Ok(Deal {
                id: 100,
                client_id: deal.client_id,
                sales_rep_id: deal.sales_rep_id,
                stage: deal.stage,
                estimated_value: deal.estimated_value,
                probability: deal.probability,
                created_at: deal.expected_close.and_hms_opt(0, 0, 0).unwrap(),
                updated_at: None,
                expected_close: Some(deal.expected_close),
                won_on: None,
                lost_on: None,
                client_company: None,
                sales_rep_name: None,
            })
        }

        async fn create_client(&self, client: &NewClient) -> Result<Client, ApiError> {
            self.outcome()?;
            Ok(Client {
                id: 7,
                company: client.company.clone(),
                contact_name: client.contact_name.clone(),
                email: client.email.clone(),
                phone: client.phone.clone(),
                monday_board_id: None,
                created_at: None,
                updated_at: None,
            })
        }

        async fn create_payment(
            &self,
            deal_id: i64,
            payment: &NewPayment,
        ) -> Result<PaymentMilestone, ApiError> {
            self.outcome()?;
            Ok(PaymentMilestone {
                id: 3,
                deal_id,
                milestone_name: payment.milestone_name.clone(),
                amount_due: payment.amount_due,
                due_date: payment.due_date,
                status: payment.status,
                paid_on: payment.paid_on,
                created_at: None,
            })
        }

        async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
            self.outcome()?;
            Ok(User {
                id: 11,
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role,
                created_at: None,
            })
        }

        async fn create_action_item(
            &self,
            deal_id: i64,
            item: &NewActionItem,
        ) -> Result<ActionItem, ApiError> {
            self.outcome()?;
            Ok(ActionItem {
                id: 5,
                deal_id,
                description: item.description.clone(),
                owner_id: item.owner_id,
                due_date: item.due_date,
                completed_at: None,
                owner_name: None,
            })
        }
    }

    fn acme() -> ClientDraft {
        ClientDraft {
            company: "Acme".into(),
            contact_name: "Wile E.".into(),
            email: "wile@acme.test".into(),
            phone: String::new(),
            monday_board_id: String::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    #[tokio::test]
    async fn test_created_client_appears_in_list_without_refetch() {
        let gateway = MockGateway::default();
        let mut directory = ClientDirectory::new(Vec::new());
        let mut form = Form::new(acme());

        let created = form
            .submit(&gateway, |client| directory.add(client))
            .await
            .unwrap();

        assert_eq!(created.company, "Acme");
        assert_eq!(directory.clients(), &[created]);
        assert_eq!(form.draft, ClientDraft::default());
        assert_eq!(form.state, FormState::default());
    }

    #[tokio::test]
    async fn test_missing_fields_block_submission() {
        let gateway = MockGateway::default();
        let mut form = Form::new(ClientDraft {
            email: "  ".into(),
            ..acme()
        });

        let err = form.submit(&gateway, |_| {}).await.unwrap_err();
        assert!(matches!(err, FormError::MissingFields(ref f) if f == &vec!["email"]));
        assert_eq!(gateway.call_count(), 0);
        assert!(form.state.error.as_deref().unwrap().starts_with("Please fill in all required fields"));
        assert!(!form.state.loading);
    }

    #[tokio::test]
    async fn test_server_message_is_shown_verbatim() {
        let gateway = MockGateway::failing(409, Some("Client with this email already exists"));
        let mut form = Form::new(acme());
        let mut called = false;

        let err = form.submit(&gateway, |_| called = true).await.unwrap_err();
        assert!(!called);
        assert_eq!(err.to_string(), "Client with this email already exists");
        assert_eq!(
            form.state.error.as_deref(),
            Some("Client with this email already exists")
        );
        // Draft is kept so the user can correct it.
        assert_eq!(form.draft, acme());
    }

    #[tokio::test]
    async fn test_generic_fallback_without_server_message() {
        let gateway = MockGateway::failing(500, None);
        let mut form = Form::new(acme());
        form.submit(&gateway, |_| {}).await.unwrap_err();
        assert_eq!(form.state.error.as_deref(), Some(CLIENT_FALLBACK));
    }

    #[tokio::test]
    async fn test_deal_form_converts_percentage() {
        let gateway = MockGateway::default();
        let mut form = Form::new(DealDraft {
            client_id: Some(2),
            sales_rep_id: Some(3),
            stage: Stage::Proposal,
            estimated_value: "10000".into(),
            probability: "40".into(),
            expected_close: "2024-09-30".into(),
        });
        let deal = form.submit(&gateway, |_| {}).await.unwrap();
        assert_eq!(deal.probability, 0.4);
        assert_eq!(deal.stage, Stage::Proposal);
        assert_eq!(deal.estimated_value, 10000.0);
    }

    #[test]
    fn test_deal_draft_reports_every_missing_field() {
        let err = DealDraft::default().validate().unwrap_err();
        match err {
            FormError::MissingFields(fields) => assert_eq!(
                fields,
                vec!["client", "sales_rep", "estimated_value", "probability", "expected_close"]
            ),
            other => panic!("Expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_deal_draft_rejects_bad_values() {
        let base = DealDraft {
            client_id: Some(1),
            sales_rep_id: Some(1),
            estimated_value: "-5".into(),
            probability: "50".into(),
            expected_close: "2024-01-01".into(),
            ..DealDraft::default()
        };
        assert!(matches!(base.validate(), Err(FormError::Invalid(_))));

        let over = DealDraft {
            estimated_value: "5".into(),
            probability: "150".into(),
            ..base.clone()
        };
        assert!(matches!(over.validate(), Err(FormError::Invalid(_))));

        let bad_date = DealDraft {
            estimated_value: "5".into(),
            expected_close: "next week".into(),
            ..base
        };
        assert!(matches!(bad_date.validate(), Err(FormError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_payment_paid_without_date_defaults_to_today() {
        let gateway = MockGateway::default();
        let mut form = Form::new(PaymentDraft {
            deal_id: Some(9),
            milestone_name: "Deposit".into(),
            amount_due: "2500".into(),
            due_date: "2024-04-01".into(),
            status: PaymentStatus::Paid,
            paid_on: String::new(),
        });
        let payment = form.submit(&gateway, today(), |_| {}).await.unwrap();
        assert_eq!(payment.paid_on, Some(today()));
        assert!(payment.validate().is_empty());
    }

    #[test]
    fn test_pending_payment_never_carries_paid_on() {
        let draft = PaymentDraft {
            deal_id: Some(9),
            milestone_name: "Final".into(),
            amount_due: "100".into(),
            due_date: "2024-05-01".into(),
            status: PaymentStatus::Pending,
            paid_on: "2024-04-30".into(),
        };
        let (_, payment) = draft.validate(today()).unwrap();
        assert_eq!(payment.paid_on, None);
    }

    #[tokio::test]
    async fn test_payment_failure_uses_payment_fallback() {
        let gateway = MockGateway::failing(502, None);
        let mut form = Form::new(PaymentDraft {
            deal_id: Some(9),
            milestone_name: "Deposit".into(),
            amount_due: "2500".into(),
            due_date: "2024-04-01".into(),
            ..PaymentDraft::default()
        });
        form.submit(&gateway, today(), |_| {}).await.unwrap_err();
        assert_eq!(form.state.error.as_deref(), Some(PAYMENT_FALLBACK));
    }

    #[tokio::test]
    async fn test_user_form_requires_role() {
        let gateway = MockGateway::default();
        let mut form = Form::new(UserDraft {
            name: "Dana".into(),
            email: "dana@example.com".into(),
            password: "pw".into(),
            role: None,
        });
        let err = form.submit(&gateway, |_| {}).await.unwrap_err();
        assert!(matches!(err, FormError::MissingFields(ref f) if f == &vec!["role"]));

        form.draft.role = Some(Role::SalesRep);
        let user = form.submit(&gateway, |_| {}).await.unwrap();
        assert_eq!(user.role, Role::SalesRep);
    }

    #[tokio::test]
    async fn test_action_item_form() {
        let gateway = MockGateway::default();
        let mut form = Form::new(ActionItemDraft {
            deal_id: Some(4),
            description: "Send contract".into(),
            owner_id: Some(3),
            due_date: "2024-04-10".into(),
        });
        let item = form.submit(&gateway, |_| {}).await.unwrap();
        assert_eq!(item.deal_id, 4);
        assert_eq!(item.due_date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
    }

    #[test]
    fn test_sales_reps_filter() {
        let user = |id, role| User {
            id,
            name: format!("u{}", id),
            email: format!("u{}@x.test", id),
            role,
            created_at: None,
        };
        let users = vec![user(1, Role::Owner), user(2, Role::SalesRep), user(3, Role::Admin)];
        let reps = sales_reps(&users);
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].id, 2);
    }

    #[test]
    fn test_deal_edit_converts_fields_and_dates() {
        let edit = DealEdit {
            stage: Some("final payment".into()),
            estimated_value: Some("1500".into()),
            probability: Some("80".into()),
            won_on: Some("2024-06-30".into()),
            ..DealEdit::default()
        };
        let update = edit.validate().unwrap();
        assert_eq!(update.stage, Some(Stage::FinalPayment));
        assert_eq!(update.estimated_value.as_deref(), Some("1500.00"));
        assert_eq!(update.probability, Some(0.8));
        assert_eq!(update.won_on, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert!(update.lost_on.is_none());
        assert!(update.client_id.is_none());
    }

    #[test]
    fn test_deal_edit_rejects_bad_input_and_empty_edit() {
        assert!(matches!(
            DealEdit::default().validate(),
            Err(FormError::Invalid(_))
        ));
        let bad_date = DealEdit {
            lost_on: Some("30/06/2024".into()),
            ..DealEdit::default()
        };
        assert!(matches!(bad_date.validate(), Err(FormError::Invalid(m)) if m.contains("lost_on")));
        let bad_stage = DealEdit {
            stage: Some("Won".into()),
            ..DealEdit::default()
        };
        assert!(bad_stage.validate().is_err());
    }

    #[test]
    fn test_client_edit_keeps_unset_fields_out() {
        let update = ClientEdit {
            email: Some(" new@acme.test ".into()),
            phone: Some(String::new()),
            ..ClientEdit::default()
        }
        .validate()
        .unwrap();
        assert_eq!(update.email.as_deref(), Some("new@acme.test"));
        assert_eq!(update.phone.as_deref(), Some(""));
        assert!(update.company.is_none());

        let blank_company = ClientEdit {
            company: Some("  ".into()),
            ..ClientEdit::default()
        };
        assert!(matches!(blank_company.validate(), Err(FormError::Invalid(m)) if m.contains("company")));
    }
}
