//! Local tunnel discovery (ngrok agent API).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config;

pub const DEFAULT_TUNNEL_API: &str = "http://127.0.0.1:4040/api/tunnels";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<Tunnel>,
}

#[derive(Deserialize)]
struct Tunnel {
    proto: String,
    public_url: String,
}

/// Why discovery produced nothing. Never fatal: callers fall back to the prompt.
#[derive(Debug)]
pub enum DiscoveryError {
    Unreachable(String),
    Malformed(String),
    NoHttpsTunnel,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(e) => write!(f, "tunnel API unreachable: {e}"),
            Self::Malformed(e) => write!(f, "tunnel API returned unexpected data: {e}"),
            Self::NoHttpsTunnel => write!(f, "no https tunnel is running"),
        }
    }
}

impl std::error::Error for DiscoveryError {}

pub struct TunnelClient {
    api_url: String,
    http: reqwest::Client,
}

impl TunnelClient {
    pub fn new(api_url: String) -> Self {
        let http = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Tunnel probe client built without its timeout: {e}");
                reqwest::Client::new()
            }
        };

        Self { api_url, http }
    }

    /// Public URL of the first https tunnel.
    pub async fn discover(&self) -> Result<String, DiscoveryError> {
        let response = self
            .http
            .get(&self.api_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Unreachable(format!("HTTP {status}")));
        }

        let list: TunnelList = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Malformed(e.without_url().to_string()))?;
        debug!("Tunnel API listed {} tunnel(s)", list.tunnels.len());

        list.tunnels
            .into_iter()
            .find(|t| t.proto == "https")
            .map(|t| t.public_url)
            .ok_or(DiscoveryError::NoHttpsTunnel)
    }

    /// Callback URL derived from the running tunnel, or `None` with a warning.
    pub async fn callback_url(&self) -> Option<String> {
        match self.discover().await {
            Ok(public_url) => Some(config::callback_url(&public_url)),
            Err(e) => {
                warn!("Tunnel discovery failed ({e}); asking for the URL instead");
                None
            }
        }
    }
}
