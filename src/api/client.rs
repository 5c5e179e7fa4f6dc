use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{HistorySource, PaymentSource, RecordGateway, StageGateway};
use crate::errors::ApiError;
use crate::models::{
    ActionItem, Client, ClientUpdate, Deal, DealUpdate, LoginRequest, LoginResponse, NewActionItem, NewClient,
    NewDeal, NewPayment, NewUser, PaymentMilestone, PaymentUpdate, Stage, StageHistoryEntry, User,
};
use crate::serde_util::unwrap_envelope;
use crate::session::{Session, TokenStore};

/// Used when neither the config file, the environment nor the CLI name a service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl CrmClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dealflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("Accept", "application/json");
        if let Some(token) = self.tokens.token() {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// Perform the round-trip and classify the outcome.
    ///
    /// A 401 clears the persisted token unless `logout_on_401` is false (the
    /// login call itself reports bad credentials as a 401).
    async fn execute(
        &self,
        builder: RequestBuilder,
        logout_on_401: bool,
    ) -> Result<serde_json::Value, ApiError> {
        let response = builder.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %response.url(), "crm response");

        if status == StatusCode::UNAUTHORIZED && logout_on_401 {
            tracing::warn!("service rejected the session token; signing out");
            self.tokens.clear().map_err(ApiError::TokenStore)?;
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from));
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value, ApiError> {
        tracing::debug!(%method, path, "crm request");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder, true).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, envelope: &str) -> Result<T, ApiError> {
        let body = self.call::<()>(Method::GET, path, None).await?;
        decode(body, envelope)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        envelope: &str,
    ) -> Result<T, ApiError> {
        let body = self.call(method, path, Some(body)).await?;
        decode(body, envelope)
    }

    // ── Auth ──────────────────────────────────────────────────────────

    /// Sign in and persist the returned token for subsequent requests.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/login").json(&request);
        let body = self.execute(builder, false).await?;
        let response: LoginResponse = decode(body, "")?;
        self.tokens
            .store(&Session {
                token: response.token.clone(),
                user: Some(response.user.clone()),
            })
            .map_err(ApiError::TokenStore)?;
        tracing::info!(user = %response.user.email, "signed in");
        Ok(response)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear().map_err(ApiError::TokenStore)
    }

    // ── Deals ─────────────────────────────────────────────────────────

    pub async fn list_deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.get("/deals", "deals").await
    }

    pub async fn get_deal(&self, id: i64) -> Result<Deal, ApiError> {
        self.get(&format!("/deals/{}", id), "deal").await
    }

    pub async fn create_deal(&self, deal: &NewDeal) -> Result<Deal, ApiError> {
        self.send_json(Method::POST, "/deals", deal, "deal").await
    }

    pub async fn update_deal(&self, id: i64, update: &DealUpdate) -> Result<Deal, ApiError> {
        self.send_json(Method::PUT, &format!("/deals/{}", id), update, "deal")
            .await
    }

    pub async fn delete_deal(&self, id: i64) -> Result<(), ApiError> {
        self.call::<()>(Method::DELETE, &format!("/deals/{}", id), None)
            .await
            .map(|_| ())
    }

    pub async fn stage_history(&self, deal_id: i64) -> Result<Vec<StageHistoryEntry>, ApiError> {
        self.get(&format!("/deals/{}/stage_history", deal_id), "stage_history")
            .await
    }

    // ── Clients ───────────────────────────────────────────────────────

    pub async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        self.get("/clients", "clients").await
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, ApiError> {
        self.get(&format!("/clients/{}", id), "client").await
    }

    /// Create a client. The service may answer with only the new id, in which
    /// case the record is assembled from the submitted fields.
    pub async fn create_client(&self, client: &NewClient) -> Result<Client, ApiError> {
        let body = self.call(Method::POST, "/clients", Some(client)).await?;
        if let Some(id) = body.get("client_id").and_then(|v| v.as_i64()) {
            return Ok(Client {
                id,
                company: client.company.clone(),
                contact_name: client.contact_name.clone(),
                email: client.email.clone(),
                phone: client.phone.clone(),
                monday_board_id: client.monday_board_id.clone(),
                created_at: None,
                updated_at: None,
            });
        }
        decode(body, "client")
    }

    /// The service answers with a bare confirmation, not the updated record.
    pub async fn update_client(&self, id: i64, client: &ClientUpdate) -> Result<(), ApiError> {
        self.call(Method::PUT, &format!("/clients/{}", id), Some(client))
            .await
            .map(|_| ())
    }

    pub async fn delete_client(&self, id: i64) -> Result<(), ApiError> {
        self.call::<()>(Method::DELETE, &format!("/clients/{}", id), None)
            .await
            .map(|_| ())
    }

    // ── Payment milestones ────────────────────────────────────────────

    pub async fn list_payments(&self, deal_id: i64) -> Result<Vec<PaymentMilestone>, ApiError> {
        self.get(
            &format!("/deals/{}/payment_schedules", deal_id),
            "payment_schedules",
        )
        .await
    }

    pub async fn create_payment(
        &self,
        deal_id: i64,
        payment: &NewPayment,
    ) -> Result<PaymentMilestone, ApiError> {
        self.send_json(
            Method::POST,
            &format!("/deals/{}/payment_schedules", deal_id),
            payment,
            "payment_schedule",
        )
        .await
    }

    pub async fn update_payment(
        &self,
        payment_id: i64,
        update: &PaymentUpdate,
    ) -> Result<PaymentMilestone, ApiError> {
        self.send_json(
            Method::PUT,
            &format!("/payment_schedules/{}", payment_id),
            update,
            "payment_schedule",
        )
        .await
    }

    // ── Action items ──────────────────────────────────────────────────

    pub async fn list_action_items(&self, deal_id: i64) -> Result<Vec<ActionItem>, ApiError> {
        self.get(&format!("/deals/{}/action_items", deal_id), "action_items")
            .await
    }

    pub async fn create_action_item(
        &self,
        deal_id: i64,
        item: &NewActionItem,
    ) -> Result<ActionItem, ApiError> {
        self.send_json(
            Method::POST,
            &format!("/deals/{}/action_items", deal_id),
            item,
            "action_item",
        )
        .await
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users", "users").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.send_json(Method::POST, "/users", user, "user").await
    }
}

fn decode<T: DeserializeOwned>(body: serde_json::Value, envelope: &str) -> Result<T, ApiError> {
    let result = if envelope.is_empty() {
        serde_json::from_value(body)
    } else {
        unwrap_envelope(body, envelope)
    };
    result.map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl StageGateway for CrmClient {
    async fn confirm_stage(&self, deal_id: i64, stage: Stage) -> Result<(), ApiError> {
        self.call(
            Method::PUT,
            &format!("/deals/{}", deal_id),
            Some(&DealUpdate::stage(stage)),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl HistorySource for CrmClient {
    async fn stage_history(&self, deal_id: i64) -> Result<Vec<StageHistoryEntry>, ApiError> {
        CrmClient::stage_history(self, deal_id).await
    }
}

#[async_trait]
impl PaymentSource for CrmClient {
    async fn list_payments(&self, deal_id: i64) -> Result<Vec<PaymentMilestone>, ApiError> {
        CrmClient::list_payments(self, deal_id).await
    }
}

#[async_trait]
impl RecordGateway for CrmClient {
    async fn create_deal(&self, deal: &NewDeal) -> Result<Deal, ApiError> {
        CrmClient::create_deal(self, deal).await
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client, ApiError> {
        CrmClient::create_client(self, client).await
    }

    async fn create_payment(
        &self,
        deal_id: i64,
        payment: &NewPayment,
    ) -> Result<PaymentMilestone, ApiError> {
        CrmClient::create_payment(self, deal_id, payment).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        CrmClient::create_user(self, user).await
    }

    async fn create_action_item(
        &self,
        deal_id: i64,
        item: &NewActionItem,
    ) -> Result<ActionItem, ApiError> {
        CrmClient::create_action_item(self, deal_id, item).await
    }
}
