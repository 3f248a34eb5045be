//! Data models and structures
//!
//! Defines the inbound request, the outbound fortune payload, and the
//! service configuration read from the environment.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which provider endpoint shape requests are built for and replies parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// `/v1/chat/completions`, reply text at `choices[0].message.content`.
    ChatCompletions,
    /// `/v1/responses`, reply text at `output[*].content[*]`.
    Responses,
}

impl FromStr for ProviderMode {
    type Err = crate::Error;

    fn from_str(value: &str) -> crate::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chat" | "chat_completions" | "chat-completions" => Ok(Self::ChatCompletions),
            "responses" => Ok(Self::Responses),
            other => Err(crate::Error::Configuration(format!(
                "Unknown provider mode '{}'. Expected 'chat' or 'responses'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChatCompletions => write!(f, "chat_completions"),
            Self::Responses => write!(f, "responses"),
        }
    }
}

/// Whether the provider is asked for schema-conformant JSON or free prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    JsonSchema,
    FreeText,
}

impl FromStr for OutputMode {
    type Err = crate::Error;

    fn from_str(value: &str) -> crate::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json_schema" | "json-schema" | "strict" | "json" => Ok(Self::JsonSchema),
            "text" | "free_text" | "free-text" => Ok(Self::FreeText),
            other => Err(crate::Error::Configuration(format!(
                "Unknown output mode '{}'. Expected 'json_schema' or 'text'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JsonSchema => write!(f, "json_schema"),
            Self::FreeText => write!(f, "text"),
        }
    }
}

/// Body of `POST /generate-fal`.
///
/// Required fields default to empty so validation, not deserialization,
/// reports them back to the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFalRequest {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub user_note: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Response of `POST /generate-fal`. The mobile client only branches on `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFalResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fortune: Option<Fortune>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fortune_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateFalResponse {
    pub fn structured(fortune: Fortune) -> Self {
        Self {
            success: true,
            fortune: Some(fortune),
            fortune_text: None,
            error: None,
        }
    }

    pub fn degraded(fortune: Fortune, fortune_text: String) -> Self {
        Self {
            success: true,
            fortune: Some(fortune),
            fortune_text: Some(fortune_text),
            error: None,
        }
    }

    pub fn text(fortune_text: String) -> Self {
        Self {
            success: true,
            fortune: None,
            fortune_text: Some(fortune_text),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            fortune: None,
            fortune_text: None,
            error: Some(error.into()),
        }
    }
}

/// Structured fortune, field-for-field the JSON the provider is asked to emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fortune {
    pub title: String,
    #[serde(deserialize_with = "lenient_u8")]
    pub energy_score: u8,
    pub mood_tag: String,
    pub aura: Aura,
    #[serde(default)]
    pub symbols: Vec<FortuneSymbol>,
    pub fortune_text: String,
    pub closing_message: String,
    pub daily_message_short: String,
    pub lucky_emoji: String,
    #[serde(deserialize_with = "lenient_u8")]
    pub lucky_number: u8,
}

pub const ENERGY_SCORE_MAX: u8 = 100;
pub const LUCKY_NUMBER_MIN: u8 = 1;
pub const LUCKY_NUMBER_MAX: u8 = 99;

impl Fortune {
    /// Pull numeric fields back inside their declared ranges.
    pub fn clamped(mut self) -> Self {
        self.energy_score = self.energy_score.min(ENERGY_SCORE_MAX);
        self.lucky_number = self.lucky_number.clamp(LUCKY_NUMBER_MIN, LUCKY_NUMBER_MAX);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aura {
    pub color_name: String,
    pub color_hex: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortuneSymbol {
    pub name: String,
    pub description: String,
}

/// Accepts `42`, `42.0` and `"42"`; saturates into `u8`.
fn lenient_u8<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => n,
        NumberOrString::Float(f) if f.is_finite() => f.round() as i64,
        NumberOrString::Float(f) => {
            return Err(serde::de::Error::custom(format!("non-finite number {}", f)))
        }
        NumberOrString::Text(s) => s.trim().parse::<i64>().map_err(|_| {
            serde::de::Error::custom(format!("expected an integer, got '{}'", s))
        })?,
    };

    Ok(value.clamp(0, u8::MAX as i64) as u8)
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent or blank means every request answers with a configuration error.
    pub api_key: Option<String>,
    pub provider_mode: ProviderMode,
    pub output_mode: OutputMode,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub fallback_seed: Option<u64>,
    /// Largest inbound request body accepted by `POST /generate-fal`.
    pub max_body_bytes: usize,
}

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 800;
/// Room for a base64 camera photo (about 4/3 of the raw bytes) plus JSON framing.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_mode: ProviderMode::ChatCompletions,
            output_mode: OutputMode::JsonSchema,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            fallback_seed: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_mode = match non_blank("FORTUNE_PROVIDER_MODE") {
            Some(value) => value.parse()?,
            None => defaults.provider_mode,
        };
        let output_mode = match non_blank("FORTUNE_OUTPUT_MODE") {
            Some(value) => value.parse()?,
            None => defaults.output_mode,
        };

        Ok(Self {
            api_key: non_blank("OPENAI_API_KEY").map(|key| key.trim().to_string()),
            provider_mode,
            output_mode,
            model: non_blank("FORTUNE_MODEL").unwrap_or(defaults.model),
            base_url: non_blank("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            max_output_tokens: parse_number(
                "FORTUNE_MAX_OUTPUT_TOKENS",
                non_blank("FORTUNE_MAX_OUTPUT_TOKENS"),
            )?
            .unwrap_or(defaults.max_output_tokens),
            connect_timeout: parse_number(
                "FORTUNE_CONNECT_TIMEOUT_SECS",
                non_blank("FORTUNE_CONNECT_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout),
            request_timeout: parse_number(
                "FORTUNE_REQUEST_TIMEOUT_SECS",
                non_blank("FORTUNE_REQUEST_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
            fallback_seed: parse_number("FORTUNE_FALLBACK_SEED", non_blank("FORTUNE_FALLBACK_SEED"))?,
            max_body_bytes: parse_number(
                "FORTUNE_MAX_BODY_BYTES",
                non_blank("FORTUNE_MAX_BODY_BYTES"),
            )?
            .unwrap_or(defaults.max_body_bytes),
        })
    }
}

fn parse_number<T: FromStr>(key: &str, value: Option<String>) -> crate::Result<Option<T>> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                crate::Error::Configuration(format!("{} must be a number, got '{}'", key, raw))
            })
        })
        .transpose()
}
