//! Provider integration: payload building, transport, and reply extraction.
//!
//! One outbound call per inbound request, to either the chat-completions or
//! the responses endpoint of an OpenAI-compatible provider.

pub mod extract;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod payload;

pub use extract::extract_text;
pub use mock::MockTransport;
pub use openai::OpenAiHttpClient;
pub use payload::{build_payload, ProviderPayload};

use crate::Result;
use async_trait::async_trait;

/// Raw provider reply: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the single outbound call for a request.
///
/// Implementations return non-success statuses as replies, not errors;
/// only transport failures (connect, timeout, I/O) are `Err`.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, api_key: &str, payload: &ProviderPayload) -> Result<UpstreamReply>;
}
