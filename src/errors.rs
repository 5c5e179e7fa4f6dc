//! Typed error hierarchy for dealflow.
//!
//! Three top-level enums cover the three library surfaces:
//! - `ApiError`: REST round-trips against the CRM service
//! - `BoardError`: kanban stage moves
//! - `FormError`: create-form validation and submission

use thiserror::Error;

/// Errors from the CRM REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}{}", message_suffix(.message))]
    Http { status: u16, message: Option<String> },

    /// HTTP 401. The persisted token has already been cleared.
    #[error("Session expired or invalid; log in again")]
    Unauthorized,

    /// No response was received.
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Token store error: {0}")]
    TokenStore(#[source] anyhow::Error),
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

impl ApiError {
    /// The structured server message when one was returned, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Errors from the board coordinator.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Deal {id} is not on the board")]
    DealNotFound { id: i64 },

    #[error("Drop target '{target}' is neither a stage column nor a deal on the board")]
    UnknownTarget { target: String },

    #[error("Failed to move deal. Please try again.")]
    Confirm(#[source] ApiError),
}

/// Errors from the create forms.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid field value: {0}")]
    Invalid(String),

    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl FormError {
    /// Wrap an API failure, resolving the message shown to the user.
    pub fn from_api(source: ApiError, fallback: &str) -> Self {
        FormError::Api {
            message: source.user_message(fallback),
            source,
        }
    }
}
