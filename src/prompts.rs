use crate::models::OutputMode;

pub const FORTUNE_SYSTEM_JSON: &str = include_str!("../data/prompts/fortune_system_json.txt");
pub const FORTUNE_SYSTEM_TEXT: &str = include_str!("../data/prompts/fortune_system_text.txt");
pub const CONTEXT_NOTE: &str = include_str!("../data/prompts/context_note.txt");
pub const CONTEXT_DATE: &str = include_str!("../data/prompts/context_date.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Persona and output contract for the given output mode.
pub fn system_instructions(output_mode: OutputMode) -> &'static str {
    match output_mode {
        OutputMode::JsonSchema => FORTUNE_SYSTEM_JSON,
        OutputMode::FreeText => FORTUNE_SYSTEM_TEXT,
    }
}

/// Context line built from the optional user note and date.
///
/// Returns `None` when both are absent or blank.
pub fn user_context(note: Option<&str>, date: Option<&str>) -> Option<String> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let date = date.map(str::trim).filter(|d| !d.is_empty());

    let parts: Vec<String> = [
        note.map(|n| render(CONTEXT_NOTE, &[("note", n)])),
        date.map(|d| render(CONTEXT_DATE, &[("date", d)])),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!FORTUNE_SYSTEM_JSON.is_empty());
        assert!(!FORTUNE_SYSTEM_TEXT.is_empty());
    }

    #[test]
    fn test_both_personas_require_turkish_output() {
        for prompt in [FORTUNE_SYSTEM_JSON, FORTUNE_SYSTEM_TEXT] {
            assert!(prompt.contains("Her zaman TÜRKÇE yaz."));
        }
    }

    #[test]
    fn test_context_templates_have_placeholders() {
        assert!(CONTEXT_NOTE.contains("{{note}}"));
        assert!(CONTEXT_DATE.contains("{{date}}"));
    }

    #[test]
    fn test_json_prompt_names_every_schema_field() {
        for field in [
            "title",
            "energy_score",
            "mood_tag",
            "color_hex",
            "symbols",
            "fortune_text",
            "closing_message",
            "daily_message_short",
            "lucky_emoji",
            "lucky_number",
        ] {
            assert!(FORTUNE_SYSTEM_JSON.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_user_context_combines_note_and_date() {
        assert_eq!(
            user_context(Some("new job"), Some("2026-10-17")).as_deref(),
            Some("Kullanıcı notu: new job. Tarih: 2026-10-17.")
        );
    }

    #[test]
    fn test_user_context_skips_blank_values() {
        assert_eq!(
            user_context(Some("  "), Some("2026-10-17")).as_deref(),
            Some("Tarih: 2026-10-17.")
        );
        assert!(user_context(Some(""), None).is_none());
        assert!(user_context(None, None).is_none());
    }
}
