//! WebhookGateway - HTTP POST of the notification to the endpoint URL

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ChannelGateway, ChannelKind, ContractError, NotificationMessage};
use reqwest::Client;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration for WebhookGateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookGatewayConfig {
    /// Endpoint URLs are minted under this base
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl WebhookGatewayConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_url = params
            .get("base_url")
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| "missing 'base_url' parameter".to_string())?;

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(format!("base_url '{base_url}' must be http(s)"));
        }

        let timeout_ms = match params.get("timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("invalid timeout_ms '{raw}': {e}"))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Gateway that POSTs JSON notifications
///
/// `mint` turns a raw token into `{base_url}/{channel}/{token}`; `send`
/// posts the message there. Non-2xx responses are delivery failures.
pub struct WebhookGateway {
    channel: ChannelKind,
    config: WebhookGatewayConfig,
    http_client: Client,
}

impl WebhookGateway {
    pub fn new(channel: ChannelKind, config: WebhookGatewayConfig) -> Result<Self, ContractError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::Other(format!("http client: {e}")))?;

        debug!(channel = %channel, base_url = %config.base_url, "WebhookGateway created");

        Ok(Self {
            channel,
            config,
            http_client,
        })
    }

    /// Create from params (for factory)
    pub fn from_params(
        channel: ChannelKind,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        let config = WebhookGatewayConfig::from_params(params)?;
        Self::new(channel, config).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ChannelGateway for WebhookGateway {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    async fn mint(&self, raw_token: &str) -> Result<String, ContractError> {
        if raw_token.trim().is_empty() {
            return Err(ContractError::mint(self.channel, "empty token"));
        }
        Ok(format!(
            "{}/{}/{}",
            self.config.base_url,
            self.channel,
            urlencoding::encode(raw_token)
        ))
    }

    #[instrument(name = "webhook_gateway_send", skip(self, message), fields(channel = %self.channel))]
    async fn send(
        &self,
        endpoint: &str,
        message: &NotificationMessage,
    ) -> Result<(), ContractError> {
        let response = self
            .http_client
            .post(endpoint)
            .json(message)
            .send()
            .await
            .map_err(|e| ContractError::delivery(self.channel, endpoint, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ContractError::delivery(
            self.channel,
            endpoint,
            format!("webhook returned {status}: {body}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_from_params() {
        let config = WebhookGatewayConfig::from_params(&params(&[
            ("base_url", "https://push.example.com/"),
            ("timeout_ms", "250"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://push.example.com");
        assert_eq!(config.timeout, Duration::from_millis(250));

        let config =
            WebhookGatewayConfig::from_params(&params(&[("base_url", "http://localhost:9000")]))
                .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn test_config_rejects_bad_params() {
        assert!(WebhookGatewayConfig::from_params(&params(&[])).is_err());
        assert!(WebhookGatewayConfig::from_params(&params(&[("base_url", "ftp://x")])).is_err());
        assert!(WebhookGatewayConfig::from_params(&params(&[
            ("base_url", "http://x"),
            ("timeout_ms", "soon"),
        ]))
        .is_err());
    }

    #[tokio::test]
    async fn test_mint_encodes_token() {
        let gateway = WebhookGateway::from_params(
            ChannelKind::Push,
            &params(&[("base_url", "https://push.example.com")]),
        )
        .unwrap();
        let handle = gateway.mint("tok en/1").await.unwrap();
        assert_eq!(handle, "https://push.example.com/push/tok%20en%2F1");
        assert!(gateway.mint("  ").await.is_err());
    }

    fn gateway_for(base_url: &str) -> WebhookGateway {
        WebhookGateway::from_params(
            ChannelKind::Push,
            &params(&[("base_url", base_url), ("timeout_ms", "2000")]),
        )
        .unwrap()
    }

    fn message() -> NotificationMessage {
        NotificationMessage {
            event_type: "MemberAdded".to_string(),
            payload: json!({"group": "G", "userId": "u1"}),
        }
    }

    #[tokio::test]
    async fn test_send_posts_message_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/tok-1"))
            .and(body_json(json!({
                "type": "MemberAdded",
                "payload": {"group": "G", "userId": "u1"}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let endpoint = gateway.mint("tok-1").await.unwrap();
        gateway.send(&endpoint, &message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_non_success_status_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("device unregistered"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri());
        let endpoint = gateway.mint("tok-1").await.unwrap();
        let err = gateway.send(&endpoint, &message()).await.unwrap_err();

        assert!(matches!(err, ContractError::Delivery { channel: ChannelKind::Push, .. }));
        let text = err.to_string();
        assert!(text.contains("500"), "{text}");
        assert!(text.contains("device unregistered"), "{text}");
        assert!(text.contains(&endpoint), "{text}");
    }

    #[tokio::test]
    async fn test_send_unreachable_endpoint_is_delivery_error() {
        // port is closed once the server drops
        let base_url = {
            let server = MockServer::start().await;
            server.uri()
        };

        let gateway = gateway_for(&base_url);
        let endpoint = gateway.mint("tok-1").await.unwrap();
        let err = gateway.send(&endpoint, &message()).await.unwrap_err();
        assert!(matches!(err, ContractError::Delivery { .. }));
    }
}
