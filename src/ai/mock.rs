use super::{ProviderPayload, UpstreamReply, UpstreamTransport};
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Recording transport double: replays canned replies and counts calls.
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<Vec<UpstreamReply>>>,
    sent_payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            sent_payloads: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_reply(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.replies.lock().unwrap().push(UpstreamReply {
            status,
            body: body.into(),
        });
        self
    }

    pub fn with_json_reply(self, body: serde_json::Value) -> Self {
        let bytes = serde_json::to_vec(&body).unwrap();
        self.with_reply(200, bytes)
    }

    /// Chat-completions reply whose message content is `text`.
    pub fn with_chat_text(self, text: &str) -> Self {
        self.with_json_reply(serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }]
        }))
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Payloads received so far, as the JSON that would have gone on the wire.
    pub fn sent_payloads(&self) -> Vec<serde_json::Value> {
        self.sent_payloads.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamTransport for MockTransport {
    async fn send(&self, _api_key: &str, payload: &ProviderPayload) -> Result<UpstreamReply> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        self.sent_payloads
            .lock()
            .unwrap()
            .push(serde_json::to_value(payload)?);

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            // Default mock reply
            Ok(UpstreamReply {
                status: 200,
                body: br#"{"choices":[{"message":{"role":"assistant","content":"A calm day ahead."}}]}"#
                    .to_vec(),
            })
        } else {
            let index = (count - 1) % replies.len();
            Ok(replies[index].clone())
        }
    }
}
