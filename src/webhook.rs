//! Registration and inspection flows.

use tracing::{info, warn};

use crate::config::WebhookConfig;
use crate::telegram::{InspectionError, RegistrationError, TelegramClient, WebhookStatus};

/// Result of a successful `setWebhook`.
#[derive(Debug)]
pub struct Registration {
    /// Provider's description, e.g. "Webhook was set".
    pub description: Option<String>,
    /// Read-back from `getWebhookInfo`; `None` when verification failed.
    pub status: Option<WebhookStatus>,
}

/// Register the webhook, then read the state back once.
///
/// Verification problems are logged and never turn a successful
/// registration into a failure.
pub async fn register(
    api_url: &str,
    config: WebhookConfig,
) -> Result<Registration, RegistrationError> {
    let client = TelegramClient::new(api_url, config.token());

    info!("Registering webhook at {}", config.url());
    let description = client.set_webhook(config.url(), config.secret()).await?;
    info!(
        "Webhook registered: {}",
        description.as_deref().unwrap_or("ok")
    );

    let status = match client.get_webhook_info().await {
        Ok(status) => {
            check_status(&config, &status);
            Some(status)
        }
        Err(e) => {
            warn!("Webhook registered but verification failed: {e}");
            None
        }
    };

    Ok(Registration { description, status })
}

/// Read the current webhook state.
pub async fn inspect(api_url: &str, token: &str) -> Result<WebhookStatus, InspectionError> {
    TelegramClient::new(api_url, token).get_webhook_info().await
}

fn check_status(config: &WebhookConfig, status: &WebhookStatus) {
    if status.url != config.url() {
        warn!(
            "Telegram reports webhook URL '{}', expected '{}'",
            status.url,
            config.url()
        );
    }
    if let Some(ref message) = status.last_error_message {
        warn!("Telegram reports a previous delivery error: {message}");
    }
    if status.pending_update_count > 0 {
        info!("{} update(s) pending delivery", status.pending_update_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LogCapture;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";
    const URL: &str = "https://abc.ngrok-free.app/telegram/webhook";

    fn config() -> WebhookConfig {
        WebhookConfig::new(TOKEN.into(), "s3cr3t".into(), URL.into()).unwrap()
    }

    async fn mount(
        server: &MockServer,
        http_method: &str,
        api_method: &str,
        response: ResponseTemplate,
        calls: u64,
    ) {
        Mock::given(method(http_method))
            .and(path(format!("/bot{TOKEN}/{api_method}")))
            .respond_with(response)
            .expect(calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "result": true, "description": "Webhook was set"
            })),
            1,
        )
        .await;
        mount(
            &server,
            "GET",
            "getWebhookInfo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"url": URL, "has_custom_certificate": false, "pending_update_count": 0}
            })),
            1,
        )
        .await;

        let registration = register(&server.uri(), config()).await.unwrap();
        assert_eq!(registration.description.as_deref(), Some("Webhook was set"));
        assert_eq!(registration.status.unwrap().url, URL);
    }

    #[tokio::test]
    async fn test_verification_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            1,
        )
        .await;
        mount(&server, "GET", "getWebhookInfo", ResponseTemplate::new(500), 1).await;

        let logs = LogCapture::default();
        let _guard = logs.install();
        let registration = register(&server.uri(), config()).await.unwrap();
        assert!(registration.description.is_none());
        assert!(registration.status.is_none());

        let out = logs.contents();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("Webhook registered but verification failed"), "{out}");
    }

    #[tokio::test]
    async fn test_verification_warns_on_mismatch_and_delivery_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            1,
        )
        .await;
        mount(
            &server,
            "GET",
            "getWebhookInfo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {
                    "url": "https://other.example/x",
                    "has_custom_certificate": false,
                    "pending_update_count": 3,
                    "last_error_date": 1700000000,
                    "last_error_message": "Connection timed out"
                }
            })),
            1,
        )
        .await;

        let logs = LogCapture::default();
        let _guard = logs.install();
        let registration = register(&server.uri(), config()).await.unwrap();
        assert_eq!(registration.status.unwrap().url, "https://other.example/x");

        let out = logs.contents();
        assert!(
            out.contains(&format!("webhook URL 'https://other.example/x', expected '{URL}'")),
            "{out}"
        );
        assert!(out.contains("previous delivery error: Connection timed out"), "{out}");
        assert!(out.contains("3 update(s) pending delivery"), "{out}");
    }

    #[tokio::test]
    async fn test_matching_readback_does_not_warn() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            1,
        )
        .await;
        mount(
            &server,
            "GET",
            "getWebhookInfo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"url": URL, "has_custom_certificate": false, "pending_update_count": 0}
            })),
            1,
        )
        .await;

        let logs = LogCapture::default();
        let _guard = logs.install();
        register(&server.uri(), config()).await.unwrap();

        let out = logs.contents();
        assert!(!out.contains("WARN"), "{out}");
    }

    #[tokio::test]
    async fn test_rejected_registration_skips_verification() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false, "error_code": 401, "description": "Unauthorized"
            })),
            1,
        )
        .await;
        mount(&server, "GET", "getWebhookInfo", ResponseTemplate::new(200), 0).await;

        let err = register(&server.uri(), config()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::ProviderRejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_reregistering_is_idempotent() {
        let server = MockServer::start().await;
        mount(
            &server,
            "POST",
            "setWebhook",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "result": true, "description": "Webhook is already set"
            })),
            2,
        )
        .await;
        mount(
            &server,
            "GET",
            "getWebhookInfo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"url": URL, "has_custom_certificate": false, "pending_update_count": 0}
            })),
            2,
        )
        .await;

        let first = register(&server.uri(), config()).await.unwrap();
        let second = register(&server.uri(), config()).await.unwrap();
        assert_eq!(first.status, second.status);
    }

    #[tokio::test]
    async fn test_inspect_reports_rejection() {
        let server = MockServer::start().await;
        mount(
            &server,
            "GET",
            "getWebhookInfo",
            ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "ok": false, "error_code": 404, "description": "Not Found"
            })),
            1,
        )
        .await;

        let err = inspect(&server.uri(), TOKEN).await.unwrap_err();
        assert!(matches!(err, InspectionError::ProviderRejected { status: 404, .. }));
        assert!(err.to_string().contains("Not Found"));
    }
}
