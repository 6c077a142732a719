//! Telegram Bot API client for the webhook methods.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::redact::redact;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Webhook state as reported by `getWebhookInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookStatus {
    /// Empty when no webhook is registered.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub has_custom_certificate: bool,
    #[serde(default)]
    pub pending_update_count: u32,
    #[serde(
        default,
        deserialize_with = "chrono::serde::ts_seconds_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

#[derive(Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
    secret_token: &'a str,
}

/// Bot API envelope: `{"ok": bool, "result": T, "description": "..."}`.
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug)]
pub enum RegistrationError {
    /// Non-success status or `ok: false`.
    ProviderRejected { status: u16, description: String },
    /// Transport failure.
    Unreachable(String),
    /// Success status with a body that is not a Bot API response.
    Malformed(String),
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderRejected { status, description } => {
                write!(f, "Telegram rejected setWebhook ({status}): {description}")
            }
            Self::Unreachable(e) => write!(f, "Telegram unreachable: {e}"),
            Self::Malformed(e) => write!(f, "unexpected setWebhook response: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {}

#[derive(Debug)]
pub enum InspectionError {
    ProviderRejected { status: u16, description: String },
    Unreachable(String),
    Malformed(String),
}

impl std::fmt::Display for InspectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderRejected { status, description } => {
                write!(f, "Telegram rejected getWebhookInfo ({status}): {description}")
            }
            Self::Unreachable(e) => write!(f, "Telegram unreachable: {e}"),
            Self::Malformed(e) => write!(f, "unexpected getWebhookInfo response: {e}"),
        }
    }
}

impl std::error::Error for InspectionError {}

/// Outcome of one Bot API call, before it is mapped to a per-method error.
enum CallError {
    Rejected { status: u16, description: String },
    Unreachable(String),
    Malformed(String),
}

impl From<CallError> for RegistrationError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Rejected {
                status,
                description,
            } => Self::ProviderRejected {
                status,
                description,
            },
            CallError::Unreachable(e) => Self::Unreachable(e),
            CallError::Malformed(e) => Self::Malformed(e),
        }
    }
}

impl From<CallError> for InspectionError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Rejected {
                status,
                description,
            } => Self::ProviderRejected {
                status,
                description,
            },
            CallError::Unreachable(e) => Self::Unreachable(e),
            CallError::Malformed(e) => Self::Malformed(e),
        }
    }
}

pub struct TelegramClient {
    api_url: String,
    token: String,
    http: reqwest::Client,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token)
    }

    /// Register `url` as the webhook. Returns the provider's description
    /// (e.g. "Webhook was set"). Overwrites any previous registration.
    pub async fn set_webhook(
        &self,
        url: &str,
        secret: &str,
    ) -> Result<Option<String>, RegistrationError> {
        let request = self
            .http
            .post(self.method_url("setWebhook"))
            .json(&SetWebhookRequest { url, secret_token: secret });
        let response: ApiResponse<bool> = self.call(request).await?;
        Ok(response.description)
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookStatus, InspectionError> {
        let request = self.http.get(self.method_url("getWebhookInfo"));
        let response: ApiResponse<WebhookStatus> = self.call(request).await?;
        response
            .result
            .ok_or_else(|| InspectionError::Malformed("response has no result".into()))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>, CallError> {
        // without_url: the request URL carries the bot token
        let response = request
            .send()
            .await
            .map_err(|e| CallError::Unreachable(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Unreachable(e.without_url().to_string()))?;
        debug!("Telegram response status: {status}");

        if !status.is_success() {
            return Err(CallError::Rejected {
                status: status.as_u16(),
                description: describe(&body),
            });
        }

        let parsed: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| CallError::Malformed(e.to_string()))?;
        if !parsed.ok {
            return Err(CallError::Rejected {
                status: status.as_u16(),
                description: parsed.description.unwrap_or_else(|| "ok: false".into()),
            });
        }
        Ok(parsed)
    }
}

/// Human-readable reason from an error body: the Bot API description if
/// present, otherwise a truncated copy of the raw body.
fn describe(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        && let Some(description) = parsed.description
    {
        return description;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".into();
    }
    let preview: String = trimmed.chars().take(200).collect();
    redact(&preview).into_owned()
}
