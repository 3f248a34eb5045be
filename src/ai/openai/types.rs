//! OpenAI-specific request payloads for the two supported endpoint shapes.
//!
//! Replies are not modelled here: their shape varies too much between
//! endpoints and model versions, see [`crate::ai::extract`].

use serde::Serialize;

/// Request body for `/v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Structured response-format directive for chat completions.
#[derive(Debug, Serialize, Clone)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchema,
}

/// JSON-schema payload for structured output mode.
#[derive(Debug, Serialize, Clone)]
pub struct JsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// Chat message object.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ChatContentPart>,
}

/// One content segment in a chat message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image URL wrapper for chat message payloads.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

/// Request body for `/v1/responses`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub instructions: String,
    pub input: Vec<ResponsesInputMessage>,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<ResponsesTextConfig>,
}

/// One input message of a responses request.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesInputMessage {
    pub role: String,
    pub content: Vec<ResponsesInputPart>,
}

/// Input content part; the responses API flattens the image URL into the part.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesInputPart {
    InputText { text: String },
    InputImage { image_url: String, detail: String },
}

/// `text` block of a responses request, carrying the output format.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesTextConfig {
    pub format: ResponsesTextFormat,
}

/// JSON-schema output format; unlike chat, name and schema sit beside `type`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesTextFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}
