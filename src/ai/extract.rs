//! Text extraction from raw provider replies.
//!
//! The provider answers in two envelope shapes, and inside either one the
//! content may be a bare string, a single object, or a list of typed parts.
//! Everything here is a single pass over the parsed document.

use super::UpstreamReply;
use crate::models::ProviderMode;
use crate::{Error, Result};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Part types whose `text` field carries generated text.
const TEXTUAL_PART_TYPES: &[&str] = &["output_text", "text"];

/// Every content shape observed in either envelope.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentCarrier {
    Text(String),
    Parts(Vec<Value>),
    Single(Map<String, Value>),
    Unsupported(IgnoredAny),
}

impl ContentCarrier {
    fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or(Self::Unsupported(IgnoredAny))
    }

    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => non_blank(&text),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(Value::as_object)
                .filter(|part| is_textual(part))
                .find_map(|part| part.get("text").and_then(Value::as_str).and_then(non_blank)),
            Self::Single(object) => object
                .get("text")
                .and_then(Value::as_str)
                .and_then(non_blank),
            Self::Unsupported(_) => None,
        }
    }
}

fn is_textual(part: &Map<String, Value>) -> bool {
    part.get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| TEXTUAL_PART_TYPES.contains(&kind))
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Pull the generated text out of a provider reply.
///
/// `Ok(None)` means the reply was well-formed but carried no usable text;
/// that is a normal outcome for the caller to handle, not an error.
pub fn extract_text(reply: &UpstreamReply, mode: ProviderMode) -> Result<Option<String>> {
    if !reply.is_success() {
        let body = String::from_utf8_lossy(&reply.body).into_owned();
        tracing::error!("Provider error (status {}): {}", reply.status, body);
        return Err(Error::Upstream {
            status: reply.status,
            body,
        });
    }

    let root: Value = serde_json::from_slice(&reply.body).map_err(|e| {
        tracing::error!(
            "Failed to parse provider response: {}\nBody: {}",
            e,
            String::from_utf8_lossy(&reply.body)
        );
        Error::UpstreamMalformed(format!("reply is not valid JSON: {}", e))
    })?;

    let text = match mode {
        ProviderMode::ChatCompletions => chat_completion_text(&root),
        ProviderMode::Responses => responses_text(&root),
    };

    if text.is_none() {
        tracing::warn!("Provider reply ({} mode) had no usable text content", mode);
    }

    Ok(text)
}

/// `choices[0].message.content`
fn chat_completion_text(root: &Value) -> Option<String> {
    let content = root
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?;

    ContentCarrier::from_value(content).into_text()
}

/// First textual entry across `output[*].content`.
fn responses_text(root: &Value) -> Option<String> {
    root.get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content"))
        .find_map(|content| ContentCarrier::from_value(content).into_text())
}
