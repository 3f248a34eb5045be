//! Fortune normalization
//!
//! Turns extracted provider text into the payload the mobile client expects.
//! Strict-mode text is unwrapped from Markdown fences and decoded; when that
//! fails a degraded fortune is synthesized around the raw text so the client
//! always receives every structured field.

use crate::models::{
    Aura, Fortune, GenerateFalResponse, OutputMode, LUCKY_NUMBER_MAX, LUCKY_NUMBER_MIN,
};
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

pub const EMPTY_UPSTREAM_RESPONSE: &str = "empty upstream response";

const FALLBACK_TITLE: &str = "Fal";
const FALLBACK_CLOSING: &str = "Nazik adımların seni güvenli bir yola taşıyor.";
const FALLBACK_DAILY: &str = "Bugün sakin kal, ışığın belirginleşiyor.";

const MOODS: &[&str] = &["calm", "hopeful", "confident", "romantic", "reflective"];
const LUCKY_EMOJIS: &[&str] = &["🔮", "✨", "🌙", "🍀", "💫"];

struct AuraSwatch {
    name: &'static str,
    hex: &'static str,
    meaning: &'static str,
}

const AURAS: &[AuraSwatch] = &[
    AuraSwatch {
        name: "Mystic",
        hex: "#7256F0",
        meaning: "Sezgileri besleyen yumuşak bir aura.",
    },
    AuraSwatch {
        name: "Gök Mavisi",
        hex: "#5DADE2",
        meaning: "Berrak düşünceler ve huzurlu bir kalp.",
    },
    AuraSwatch {
        name: "Gül Pembesi",
        hex: "#F1948A",
        meaning: "İlişkilerinde sıcaklık ve açıklık.",
    },
    AuraSwatch {
        name: "Adaçayı Yeşili",
        hex: "#82C09A",
        meaning: "İstikrarlı bir büyüme ve sessiz bir yenilenme.",
    },
    AuraSwatch {
        name: "Kehribar",
        hex: "#F5B041",
        meaning: "Özgüven ve parlak, yaratıcı bir kıvılcım.",
    },
];

/// Placeholder energy range; kept well inside 0..=100.
const FALLBACK_ENERGY: std::ops::RangeInclusive<u8> = 60..=95;

/// Remove a surrounding Markdown code fence and whitespace.
///
/// Handles an opening fence with or without a `json` tag (any case) and a
/// closing fence; text without fences is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    cleaned.trim()
}

/// Decode cleaned text as a structured fortune.
pub fn decode_fortune(cleaned: &str) -> Result<Fortune> {
    serde_json::from_str::<Fortune>(cleaned)
        .map(Fortune::clamped)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Degraded fortune carrying `fortune_text` and bounded placeholder fields.
pub fn fallback_fortune<R: Rng + ?Sized>(fortune_text: &str, rng: &mut R) -> Fortune {
    let aura = AURAS.choose(rng).unwrap_or(&AURAS[0]);

    Fortune {
        title: FALLBACK_TITLE.to_string(),
        energy_score: rng.gen_range(FALLBACK_ENERGY),
        mood_tag: MOODS.choose(rng).unwrap_or(&MOODS[0]).to_string(),
        aura: Aura {
            color_name: aura.name.to_string(),
            color_hex: aura.hex.to_string(),
            meaning: aura.meaning.to_string(),
        },
        symbols: Vec::new(),
        fortune_text: fortune_text.to_string(),
        closing_message: FALLBACK_CLOSING.to_string(),
        daily_message_short: FALLBACK_DAILY.to_string(),
        lucky_emoji: LUCKY_EMOJIS.choose(rng).unwrap_or(&LUCKY_EMOJIS[0]).to_string(),
        lucky_number: rng.gen_range(LUCKY_NUMBER_MIN..=LUCKY_NUMBER_MAX),
    }
}

/// Build the client payload from extracted provider text.
pub fn normalize<R: Rng + ?Sized>(
    extracted: Option<String>,
    output_mode: OutputMode,
    rng: &mut R,
) -> GenerateFalResponse {
    let Some(text) = extracted else {
        return GenerateFalResponse::failure(EMPTY_UPSTREAM_RESPONSE);
    };

    match output_mode {
        OutputMode::FreeText => GenerateFalResponse::text(text),
        OutputMode::JsonSchema => {
            let cleaned = strip_code_fence(&text);
            match decode_fortune(cleaned) {
                Ok(fortune) => GenerateFalResponse::structured(fortune),
                Err(e) => {
                    tracing::warn!("Falling back to degraded fortune: {}", e);
                    let fortune = fallback_fortune(cleaned, rng);
                    GenerateFalResponse::degraded(fortune, cleaned.to_string())
                }
            }
        }
    }
}
