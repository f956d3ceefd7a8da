use serde_json::json;
use std::time::Duration;
use tracing::{instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper over the WhatsApp gateway (spec §4.D, §6). Delivery is
/// at-least-once and best-effort: failures are reported as `false`
/// rather than propagated, since a dropped notification must never block
/// the worker that produced it.
pub struct MessagingGatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    instance_name: String,
}

impl MessagingGatewayClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, instance_name: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client builder should not fail with static config");
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            instance_name: instance_name.into(),
        }
    }

    /// Sends a plain-text message. Returns `true` on a 2xx response,
    /// `false` otherwise; never returns an `Err` since message failures
    /// are non-fatal (spec §4.D).
    #[instrument(skip(self, message), fields(phone))]
    pub async fn send_text(&self, phone: &str, message: &str) -> bool {
        let url = format!("{}/message/sendText/{}", self.base_url, self.instance_name);
        let body = json!({ "number": phone, "text": message });

        let result = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "messaging gateway returned non-success status");
                false
            }
            Err(err) => {
                warn!(error = %err, "messaging gateway request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_text_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/prod"))
            .and(header("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = MessagingGatewayClient::new(server.uri(), "secret", "prod");
        assert!(client.send_text("+5491122334455", "hello").await);
    }

    #[tokio::test]
    async fn send_text_returns_false_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/prod"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = MessagingGatewayClient::new(server.uri(), "secret", "prod");
        assert!(!client.send_text("+5491122334455", "hello").await);
    }
}
