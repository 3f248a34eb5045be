//! Outbound payload construction for both provider endpoint shapes.

use super::mime;
use super::openai::types::{
    ChatCompletionRequest, ChatContentPart, ChatMessage, ImageUrl, JsonSchema, ResponseFormat,
    ResponsesInputMessage, ResponsesInputPart, ResponsesRequest, ResponsesTextConfig,
    ResponsesTextFormat,
};
use crate::models::{Config, GenerateFalRequest, OutputMode, ProviderMode};
use crate::{prompts, Error, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Serialize;

const SCHEMA_NAME: &str = "fortune";
const IMAGE_DETAIL: &str = "auto";

/// Standard alphabet, padding optional; some mobile encoders drop it.
const IMAGE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Provider request body. Each variant serializes to its own endpoint's shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProviderPayload {
    ChatCompletions(ChatCompletionRequest),
    Responses(ResponsesRequest),
}

impl ProviderPayload {
    pub fn mode(&self) -> ProviderMode {
        match self {
            Self::ChatCompletions(_) => ProviderMode::ChatCompletions,
            Self::Responses(_) => ProviderMode::Responses,
        }
    }

    /// Path appended to the provider base URL.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::ChatCompletions(_) => "/v1/chat/completions",
            Self::Responses(_) => "/v1/responses",
        }
    }
}

/// Validated image ready to be embedded as a data URI.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    /// Base64 text with any line breaks or spaces removed.
    pub base64: String,
    pub byte_len: usize,
}

impl ImageInput {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Check the inbound image fields; nothing may be sent upstream if this fails.
pub fn validate_image(request: &GenerateFalRequest) -> Result<ImageInput> {
    let base64: String = request
        .image_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if base64.is_empty() {
        return Err(Error::InvalidInput("imageBase64 is required".to_string()));
    }

    let mime_type = request.mime_type.trim();
    if mime_type.is_empty() {
        return Err(Error::InvalidInput("mimeType is required".to_string()));
    }

    let bytes = IMAGE_BASE64
        .decode(&base64)
        .map_err(|e| Error::InvalidInput(format!("imageBase64 is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(Error::InvalidInput(
            "imageBase64 decoded to an empty image".to_string(),
        ));
    }

    mime::check_declared_mime(mime_type, &bytes);

    Ok(ImageInput {
        mime_type: mime_type.to_string(),
        base64,
        byte_len: bytes.len(),
    })
}

/// JSON schema the provider must follow in strict mode.
///
/// Strict structured output requires every property listed in `required`
/// and `additionalProperties: false` on every object.
pub fn fortune_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "energy_score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "mood_tag": { "type": "string" },
            "aura": {
                "type": "object",
                "properties": {
                    "color_name": { "type": "string" },
                    "color_hex": { "type": "string" },
                    "meaning": { "type": "string" }
                },
                "required": ["color_name", "color_hex", "meaning"],
                "additionalProperties": false
            },
            "symbols": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "description"],
                    "additionalProperties": false
                }
            },
            "fortune_text": { "type": "string" },
            "closing_message": { "type": "string" },
            "daily_message_short": { "type": "string" },
            "lucky_emoji": { "type": "string" },
            "lucky_number": { "type": "integer", "minimum": 1, "maximum": 99 }
        },
        "required": [
            "title",
            "energy_score",
            "mood_tag",
            "aura",
            "symbols",
            "fortune_text",
            "closing_message",
            "daily_message_short",
            "lucky_emoji",
            "lucky_number"
        ],
        "additionalProperties": false
    })
}

/// Build the provider payload for one request.
///
/// The credential is checked by the caller before this runs.
pub fn build_payload(request: &GenerateFalRequest, config: &Config) -> Result<ProviderPayload> {
    let image = validate_image(request)?;
    let context = prompts::user_context(request.user_note.as_deref(), request.date.as_deref());
    let instructions = prompts::system_instructions(config.output_mode).to_string();

    tracing::debug!(
        "Building {} payload ({} image bytes, {}, context: {})",
        config.provider_mode,
        image.byte_len,
        image.mime_type,
        context.is_some()
    );

    let payload = match config.provider_mode {
        ProviderMode::ChatCompletions => {
            ProviderPayload::ChatCompletions(chat_request(&image, context, instructions, config))
        }
        ProviderMode::Responses => {
            ProviderPayload::Responses(responses_request(&image, context, instructions, config))
        }
    };

    Ok(payload)
}

fn chat_request(
    image: &ImageInput,
    context: Option<String>,
    instructions: String,
    config: &Config,
) -> ChatCompletionRequest {
    let mut user_parts = Vec::with_capacity(2);
    if let Some(text) = context {
        user_parts.push(ChatContentPart::Text { text });
    }
    user_parts.push(ChatContentPart::ImageUrl {
        image_url: ImageUrl {
            url: image.data_uri(),
            detail: IMAGE_DETAIL.to_string(),
        },
    });

    let response_format = match config.output_mode {
        OutputMode::JsonSchema => Some(ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchema {
                name: SCHEMA_NAME.to_string(),
                schema: fortune_schema(),
                strict: true,
            },
        }),
        OutputMode::FreeText => None,
    };

    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: vec![ChatContentPart::Text { text: instructions }],
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_parts,
            },
        ],
        max_completion_tokens: config.max_output_tokens,
        response_format,
    }
}

fn responses_request(
    image: &ImageInput,
    context: Option<String>,
    instructions: String,
    config: &Config,
) -> ResponsesRequest {
    let mut user_parts = Vec::with_capacity(2);
    if let Some(text) = context {
        user_parts.push(ResponsesInputPart::InputText { text });
    }
    user_parts.push(ResponsesInputPart::InputImage {
        image_url: image.data_uri(),
        detail: IMAGE_DETAIL.to_string(),
    });

    let text = match config.output_mode {
        OutputMode::JsonSchema => Some(ResponsesTextConfig {
            format: ResponsesTextFormat {
                format_type: "json_schema".to_string(),
                name: SCHEMA_NAME.to_string(),
                schema: fortune_schema(),
                strict: true,
            },
        }),
        OutputMode::FreeText => None,
    };

    ResponsesRequest {
        model: config.model.clone(),
        instructions,
        input: vec![ResponsesInputMessage {
            role: "user".to_string(),
            content: user_parts,
        }],
        max_output_tokens: config.max_output_tokens,
        text,
    }
}
