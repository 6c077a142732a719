use std::fmt;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::{self, ConfigError, Env, Overrides};
use crate::prompt::Prompt;
use crate::telegram::{DEFAULT_API_URL, InspectionError, RegistrationError};
use crate::tunnel::{DEFAULT_TUNNEL_API, TunnelClient};
use crate::{version, webhook};

#[derive(Args, Debug, Clone, Default)]
pub struct SetWebhookArgs {
    /// Bot token (defaults to $TELEGRAM_BOT_TOKEN)
    #[arg(short, long)]
    pub token: Option<String>,
    /// Shared secret Telegram echoes on each callback (defaults to $WEBHOOK_SECRET)
    #[arg(short, long)]
    pub secret: Option<String>,
    /// Full public callback URL; discovered from the local tunnel when omitted
    #[arg(short, long)]
    pub url: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GetWebhookArgs {
    /// Bot token (defaults to $TELEGRAM_BOT_TOKEN)
    #[arg(short, long)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register the bot's webhook with Telegram and verify it
    SetWebhook(SetWebhookArgs),
    /// Print the webhook state Telegram currently holds
    GetWebhook(GetWebhookArgs),
}

/// Register and inspect the MAT bot's Telegram webhook
#[derive(Parser, Debug)]
#[command(version, long_version = version::as_text())]
pub struct Cli {
    /// Bot API base URL
    #[arg(long, global = true, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Tunnel agent API used to discover the public URL
    #[arg(long, global = true, env = "TUNNEL_API_URL", default_value = DEFAULT_TUNNEL_API)]
    pub tunnel_api: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug)]
pub enum CommandError {
    Config(ConfigError),
    Registration(RegistrationError),
    Inspection(InspectionError),
}

impl CommandError {
    /// 2 for bad or missing configuration, 1 for provider and network failures.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Registration(_) | Self::Inspection(_) => 1,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Registration(e) => write!(f, "{e}"),
            Self::Inspection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Registration(e) => Some(e),
            Self::Inspection(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RegistrationError> for CommandError {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}

impl From<InspectionError> for CommandError {
    fn from(e: InspectionError) -> Self {
        Self::Inspection(e)
    }
}

impl Cli {
    /// Run the selected command and return what should be printed on stdout.
    pub async fn run(&self, env: Env<'_>, prompt: &mut dyn Prompt) -> Result<String, CommandError> {
        match &self.command {
            Command::SetWebhook(args) => {
                let overrides = Overrides {
                    token: args.token.as_deref(),
                    secret: args.secret.as_deref(),
                    url: args.url.as_deref(),
                };
                let tunnels = TunnelClient::new(self.tunnel_api.clone());
                let config = config::resolve(overrides, env, &tunnels, prompt).await?;
                let registration = webhook::register(&self.api_url, config).await?;

                let mut out = registration
                    .description
                    .unwrap_or_else(|| "Webhook was set".into());
                out.push('\n');
                match registration.status {
                    Some(status) => out.push_str(&pretty(&status)),
                    None => {
                        out.push_str("Verification skipped: webhook info could not be read back")
                    }
                }
                Ok(out)
            }
            Command::GetWebhook(args) => {
                let token = config::resolve_token(args.token.as_deref(), env)?;
                let status = webhook::inspect(&self.api_url, &token).await?;
                Ok(pretty(&status))
            }
        }
    }
}

fn pretty<T: Serialize + fmt::Debug>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
}
