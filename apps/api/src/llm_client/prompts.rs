// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to all content-writing prompts.
pub const FACTUALITY_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the provided CV content. \
    Do NOT invent employers, dates, degrees, metrics or technologies. \
    If a number is not given, do not make one up.";

/// Caps user-provided text before it is embedded in a prompt.
pub fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_keeps_short_text() {
        assert_eq!(clip("hello", 10), "hello");
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("résumé", 2), "ré");
    }
}
