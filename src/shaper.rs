//! Response Shaper: bounds the raw model reply for a low-bandwidth display.
//!
//! Replies are capped at 3 bullets (for enumeration requests) or 3 sentences
//! (everything else), then paired with a localized follow-up question. The
//! brevity cap is a hard display contract for voice and text output alike.

use crate::locale::{self, Language};

/// A shaped reply: the bounded body plus the follow-up question. Both stay
/// in the active display language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedResponse {
    pub body: String,
    pub follow_up: String,
}

impl ShapedResponse {
    /// The full display form: body, blank line, follow-up.
    pub fn display_text(&self) -> String {
        format!("{}\n\n{}", self.body, self.follow_up)
    }
}

/// Shape a raw model reply against the user's original text.
///
/// Enumeration classification always takes priority; an enumeration request
/// whose reply carries no bullet markers falls back to sentence limiting.
pub fn shape(raw_text: &str, original_user_text: &str, language: Language) -> ShapedResponse {
    let cleaned = raw_text.replace("**", "");
    let cleaned = cleaned.trim();

    let body = if locale::is_enumeration_request(original_user_text) {
        limit_bullets(cleaned).unwrap_or_else(|| limit_sentences(cleaned))
    } else {
        limit_sentences(cleaned)
    };

    let category = locale::classify_follow_up(original_user_text);
    ShapedResponse {
        body,
        follow_up: locale::follow_up(category, language).to_string(),
    }
}

/// Keep at most the first 3 bullet or numbered-list lines, in original
/// order. `None` when the text has no recognizable list lines.
fn limit_bullets(text: &str) -> Option<String> {
    let picked: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| is_bullet_line(line))
        .take(3)
        .collect();
    if picked.is_empty() {
        None
    } else {
        Some(picked.join("\n"))
    }
}

fn is_bullet_line(line: &str) -> bool {
    if line.starts_with('-') || line.starts_with('•') {
        return true;
    }
    // Numbered-list marker: one or more digits followed by a period.
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with('.')
}

/// Keep at most the first 3 sentences. Text that already fits the cap, or
/// that has no sentence-terminal punctuation at all, is returned verbatim.
fn limit_sentences(text: &str) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect();
    if sentences.len() > 3 {
        format!("{}.", sentences[..3].join(". "))
    } else {
        text.to_string()
    }
}
