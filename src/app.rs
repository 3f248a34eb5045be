//! Request orchestration: validate, build, call the provider once, normalize.

use crate::ai::{self, OpenAiHttpClient, UpstreamTransport};
use crate::fortune;
use crate::models::{Config, GenerateFalRequest, GenerateFalResponse};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Handles `generate-fal` requests. Shared read-only across all requests.
pub struct FortuneApp {
    config: Config,
    transport: Arc<dyn UpstreamTransport>,
}

impl FortuneApp {
    /// Build an app from a config and a concrete transport.
    ///
    /// Integration tests use this to inject [`ai::MockTransport`].
    pub fn with_transport(config: Config, transport: Arc<dyn UpstreamTransport>) -> Self {
        Self { config, transport }
    }

    /// Construct an app talking to the configured provider over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let transport = OpenAiHttpClient::from_config(&config)?;

        info!(
            "Provider: {} (model: {}, output: {}, base URL: {})",
            config.provider_mode, config.model, config.output_mode, config.base_url
        );
        if config.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; every request will fail with a configuration error");
        }

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn max_body_bytes(&self) -> usize {
        self.config.max_body_bytes
    }

    /// Generate a fortune. Never fails: every error becomes `success=false`.
    pub async fn generate(&self, request: GenerateFalRequest) -> GenerateFalResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("generate_fal", %request_id);

        async move {
            match self.try_generate(&request).await {
                Ok(response) => {
                    info!(
                        "Fortune generated (structured: {}, degraded: {})",
                        response.fortune.is_some(),
                        response.fortune.is_some() && response.fortune_text.is_some()
                    );
                    response
                }
                Err(e) => {
                    error!("Fortune generation failed: {}", e);
                    GenerateFalResponse::failure(client_message(&e))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_generate(&self, request: &GenerateFalRequest) -> Result<GenerateFalResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("OPENAI_API_KEY missing".to_string()))?;

        let payload = ai::build_payload(request, &self.config)?;
        let reply = self.transport.send(api_key, &payload).await?;
        let extracted = ai::extract_text(&reply, payload.mode())?;

        let output_mode = self.config.output_mode;
        let response = match self.config.fallback_seed {
            Some(seed) => {
                fortune::normalize(extracted, output_mode, &mut StdRng::seed_from_u64(seed))
            }
            None => fortune::normalize(extracted, output_mode, &mut rand::thread_rng()),
        };

        Ok(response)
    }
}

/// Message for the `error` field; the mobile client shows or logs it verbatim.
fn client_message(error: &Error) -> String {
    match error {
        Error::InvalidInput(msg) | Error::Configuration(msg) => msg.clone(),
        Error::Transport(e) if e.is_timeout() => "Fortune provider timed out".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockTransport;
    use crate::models::{OutputMode, ProviderMode};
    use pretty_assertions::assert_eq;

    const PNG_B64: &str = "iVBORw0KGgo=";

    fn config(provider_mode: ProviderMode, output_mode: OutputMode) -> Config {
        Config {
            api_key: Some("test-key".to_string()),
            provider_mode,
            output_mode,
            fallback_seed: Some(9),
            ..Config::default()
        }
    }

    fn request() -> GenerateFalRequest {
        GenerateFalRequest {
            image_base64: PNG_B64.to_string(),
            mime_type: "image/png".to_string(),
            user_note: Some("first day at work".to_string()),
            date: None,
        }
    }

    fn build_app(config: Config, transport: &MockTransport) -> FortuneApp {
        FortuneApp::with_transport(config, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_chat_string_content_becomes_fortune_text() {
        let transport = MockTransport::new().with_chat_text("X");
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::FreeText),
            &transport,
        );

        let response = app.generate(request()).await;
        assert_eq!(response, GenerateFalResponse::text("X".to_string()));
        assert_eq!(transport.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_responses_output_text_is_extracted() {
        let transport = MockTransport::new().with_json_reply(serde_json::json!({
            "output": [{
                "type": "message",
                "content": [
                    { "type": "mystery_part" },
                    { "type": "output_text", "text": "Y" }
                ]
            }]
        }));
        let app = build_app(
            config(ProviderMode::Responses, OutputMode::FreeText),
            &transport,
        );

        let response = app.generate(request()).await;
        assert!(response.success);
        assert_eq!(response.fortune_text.as_deref(), Some("Y"));

        let sent = transport.sent_payloads();
        assert!(sent[0].get("instructions").is_some());
    }

    #[tokio::test]
    async fn test_missing_image_never_calls_provider() {
        let transport = MockTransport::new();
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::JsonSchema),
            &transport,
        );

        let response = app
            .generate(GenerateFalRequest {
                image_base64: String::new(),
                ..request()
            })
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("imageBase64 is required"));
        assert_eq!(transport.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_never_calls_provider() {
        let transport = MockTransport::new();
        let app = build_app(
            Config {
                api_key: None,
                ..config(ProviderMode::ChatCompletions, OutputMode::JsonSchema)
            },
            &transport,
        );

        let response = app.generate(request()).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("OPENAI_API_KEY missing"));
        assert_eq!(transport.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_reported() {
        let transport = MockTransport::new().with_reply(503, "overloaded");
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::JsonSchema),
            &transport,
        );

        let response = app.generate(request()).await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.contains("503"), "{}", error);
        assert!(error.contains("overloaded"), "{}", error);
        assert_eq!(transport.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_reported() {
        let transport = MockTransport::new().with_reply(200, "not json");
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::JsonSchema),
            &transport,
        );

        let response = app.generate(request()).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_reported() {
        let transport = MockTransport::new().with_json_reply(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "" } }]
        }));
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::JsonSchema),
            &transport,
        );

        let response = app.generate(request()).await;
        assert_eq!(
            response,
            GenerateFalResponse::failure(fortune::EMPTY_UPSTREAM_RESPONSE)
        );
    }

    #[tokio::test]
    async fn test_seeded_fallback_is_deterministic() {
        let transport = MockTransport::new().with_chat_text("Plain prose, not JSON.");
        let app = build_app(
            config(ProviderMode::ChatCompletions, OutputMode::JsonSchema),
            &transport,
        );

        let first = app.generate(request()).await;
        let second = app.generate(request()).await;
        assert_eq!(first, second);
        assert_eq!(first.fortune_text.as_deref(), Some("Plain prose, not JSON."));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Nothing listens on port 9 locally; the connection is refused.
        let config = Config {
            base_url: "http://127.0.0.1:9".to_string(),
            ..config(ProviderMode::ChatCompletions, OutputMode::JsonSchema)
        };
        let app = FortuneApp::new(config).unwrap();

        let response = app.generate(request()).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Transport"));
    }
}
