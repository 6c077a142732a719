use std::fmt;

use reqwest::Url;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::prompt::Prompt;
use crate::tunnel::TunnelClient;

pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const SECRET_VAR: &str = "WEBHOOK_SECRET";

/// Path the bot serves Telegram updates on.
pub const CALLBACK_PATH: &str = "/telegram/webhook";

/// Header Telegram echoes the registered secret in on every callback.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

const MAX_SECRET_LEN: usize = 256;

/// Environment lookup, injected so resolution never reads process state directly.
pub type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Errors that can occur while building a [`WebhookConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// No token on the command line or in the environment.
    MissingToken { var: &'static str },
    /// Token is not `<numeric bot id>:<secret>`.
    InvalidToken,
    /// No secret on the command line or in the environment.
    MissingSecret { var: &'static str },
    /// Secret breaks Telegram's `secret_token` rules.
    InvalidSecret(String),
    /// Every URL source came up empty.
    MissingUrl,
    InvalidUrl { url: String, reason: String },
    /// Reading the interactive answer failed.
    Prompt(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken { var } => {
                write!(f, "bot token is missing: pass --token or set {var}")
            }
            Self::InvalidToken => write!(
                f,
                "bot token appears invalid (expected format: 123456789:ABCdefGHI...)"
            ),
            Self::MissingSecret { var } => {
                write!(f, "webhook secret is missing: pass --secret or set {var}")
            }
            Self::InvalidSecret(reason) => write!(f, "webhook secret is invalid: {reason}"),
            Self::MissingUrl => write!(f, "no webhook URL given, discovered or entered"),
            Self::InvalidUrl { url, reason } => {
                write!(f, "webhook URL '{url}' is invalid: {reason}")
            }
            Self::Prompt(source) => write!(f, "failed to read webhook URL: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Prompt(source) => Some(source),
            _ => None,
        }
    }
}

/// Everything one `setWebhook` call needs. Built once per invocation.
#[derive(Clone)]
pub struct WebhookConfig {
    token: String,
    secret: String,
    url: String,
}

impl WebhookConfig {
    pub fn new(token: String, secret: String, url: String) -> Result<Self, ConfigError> {
        validate_token(&token)?;
        validate_secret(&secret)?;
        validate_url(&url)?;
        Ok(Self { token, secret, url })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("token", &"***")
            .field("secret", &"***")
            .field("url", &self.url)
            .finish()
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub token: Option<&'a str>,
    pub secret: Option<&'a str>,
    pub url: Option<&'a str>,
}

/// Build the config: credentials first, then the URL from the first source
/// that yields one (explicit, tunnel discovery, operator prompt).
///
/// Credentials are checked before any probe so a missing token or secret
/// never reaches the network.
pub async fn resolve(
    overrides: Overrides<'_>,
    env: Env<'_>,
    tunnels: &TunnelClient,
    prompt: &mut dyn Prompt,
) -> Result<WebhookConfig, ConfigError> {
    let token = resolve_token(overrides.token, env)?;
    let secret = resolve_secret(overrides.secret, env)?;

    let url = if let Some(url) = non_blank(overrides.url) {
        url
    } else if let Some(url) = tunnels.callback_url().await {
        info!("Using webhook URL from tunnel: {url}");
        url
    } else {
        prompt_url(prompt)?
    };

    WebhookConfig::new(token, secret, url)
}

pub fn resolve_token(explicit: Option<&str>, env: Env<'_>) -> Result<String, ConfigError> {
    let token = non_blank(explicit)
        .or_else(|| non_blank(env(TOKEN_VAR).as_deref()))
        .ok_or(ConfigError::MissingToken { var: TOKEN_VAR })?;
    validate_token(&token)?;
    Ok(token)
}

pub fn resolve_secret(explicit: Option<&str>, env: Env<'_>) -> Result<String, ConfigError> {
    let secret = non_blank(explicit)
        .or_else(|| non_blank(env(SECRET_VAR).as_deref()))
        .ok_or(ConfigError::MissingSecret { var: SECRET_VAR })?;
    validate_secret(&secret)?;
    Ok(secret)
}

fn prompt_url(prompt: &mut dyn Prompt) -> Result<String, ConfigError> {
    let answer = prompt
        .ask("Public HTTPS URL for the webhook (e.g. https://xxxx.ngrok-free.app/telegram/webhook)")
        .map_err(ConfigError::Prompt)?;
    non_blank(answer.as_deref()).ok_or(ConfigError::MissingUrl)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Public tunnel URL plus the bot's callback path.
pub fn callback_url(public_url: &str) -> String {
    format!("{}{CALLBACK_PATH}", public_url.trim_end_matches('/'))
}

// Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
fn validate_token(token: &str) -> Result<(), ConfigError> {
    let Some((id, secret)) = token.split_once(':') else {
        return Err(ConfigError::InvalidToken);
    };
    let id_ok = !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
    if !id_ok || secret.is_empty() || secret.contains(':') {
        return Err(ConfigError::InvalidToken);
    }
    Ok(())
}

fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.is_empty() || secret.len() > MAX_SECRET_LEN {
        return Err(ConfigError::InvalidSecret(format!(
            "must be 1-{MAX_SECRET_LEN} characters long"
        )));
    }
    if !secret
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::InvalidSecret(
            "only A-Z, a-z, 0-9, '_' and '-' are allowed".into(),
        ));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: "Telegram only delivers to https URLs".into(),
        });
    }
    if !parsed.path().ends_with(CALLBACK_PATH) {
        warn!("Webhook URL {url} does not end in {CALLBACK_PATH}; the bot serves updates there");
    }
    Ok(())
}

/// Check an inbound callback's secret header against the registered secret.
/// A missing header or an empty expected secret never matches.
pub fn verify_secret_token(expected: &str, header: Option<&str>) -> bool {
    match header {
        Some(received) if !expected.is_empty() => {
            received.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}
