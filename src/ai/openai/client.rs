use crate::ai::{ProviderPayload, UpstreamReply, UpstreamTransport};
use crate::models::{Config, DEFAULT_BASE_URL};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// HTTP transport for OpenAI-compatible providers.
///
/// Holds no credential: the key is passed per call so a missing key can be
/// rejected before anything reaches this type.
pub struct OpenAiHttpClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
}

impl OpenAiHttpClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self::new_with_client(client))
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Transport configured from the service config (timeouts and base URL).
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.connect_timeout, config.request_timeout)?
            .with_base_url(config.base_url.clone()))
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl UpstreamTransport for OpenAiHttpClient {
    async fn send(&self, api_key: &str, payload: &ProviderPayload) -> Result<UpstreamReply> {
        let url = format!("{}{}", self.base_url, payload.endpoint_path());
        tracing::debug!("Sending {} request to {}", payload.mode(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to provider: {}", e);
                e
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("Provider replied with status {} ({} bytes)", status, body.len());

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::build_payload;
    use crate::models::{GenerateFalRequest, OutputMode, ProviderMode};
    use crate::Error;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload(mode: ProviderMode) -> ProviderPayload {
        let request = GenerateFalRequest {
            image_base64: "iVBORw0KGgo=".to_string(),
            mime_type: "image/png".to_string(),
            ..GenerateFalRequest::default()
        };
        let config = Config {
            provider_mode: mode,
            output_mode: OutputMode::FreeText,
            model: "custom-model".to_string(),
            ..Config::default()
        };
        build_payload(&request, &config).unwrap()
    }

    fn make_client(server: &MockServer) -> OpenAiHttpClient {
        OpenAiHttpClient::new(Duration::from_secs(5), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_chat_payload_posts_to_chat_completions() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_string_contains("\"model\":\"custom-model\""))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"choices\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = make_client(&server)
            .send("test-key", &payload(ProviderMode::ChatCompletions))
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"{\"choices\":[]}".to_vec());
    }

    #[tokio::test]
    async fn test_responses_payload_posts_to_responses() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .and(body_string_contains("\"instructions\""))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"output\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = make_client(&server)
            .send("test-key", &payload(ProviderMode::Responses))
            .await
            .unwrap();

        assert!(reply.is_success());
    }

    #[tokio::test]
    async fn test_error_status_is_returned_as_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let reply = make_client(&server)
            .send("key", &payload(ProviderMode::ChatCompletions))
            .await
            .unwrap();

        assert_eq!(reply.status, 500);
        assert!(!reply.is_success());
        assert_eq!(reply.body, b"server error".to_vec());
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = OpenAiHttpClient::new(Duration::from_secs(1), Duration::from_millis(200))
            .unwrap()
            .with_base_url(server.uri());

        let err = client
            .send("key", &payload(ProviderMode::ChatCompletions))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(ref e) if e.is_timeout()));
    }
}
