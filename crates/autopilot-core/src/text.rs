use std::sync::OnceLock;

use regex::Regex;

/// Suffix appended to diffs cut at the character budget.
pub const TRUNCATION_MARKER: &str = "\n...(truncated)";

/// First `max` characters of `s`, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `max` characters and flag the cut with [`TRUNCATION_MARKER`].
pub fn truncate_with_marker(s: &str, max: usize) -> String {
    let cut = truncate_chars(s, max);
    if cut.len() == s.len() {
        s.to_string()
    } else {
        format!("{cut}{TRUNCATION_MARKER}")
    }
}

fn secret_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"sk-[a-zA-Z0-9_\-]{20,}", "[MASKED]"),
            (r"gh[pousr]_[a-zA-Z0-9]{20,}", "[MASKED]"),
            (r"Bearer\s+[a-zA-Z0-9._\-]+", "Bearer [MASKED]"),
            // credentials embedded in remote URLs
            (r"(https?://)[^/\s:@]+:[^/\s@]+@", "$1[MASKED]@"),
            (
                r"(?i)(password|secret|token|key|api_key|apikey)=[^\s&]+",
                "$1=[MASKED]",
            ),
        ]
        .into_iter()
        .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, r)))
        .collect()
    })
}

/// Mask credentials in tool output before it reaches a log line.
pub fn mask_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in secret_patterns() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

/// Masked, trimmed and truncated excerpt of tool output for logging.
pub fn log_excerpt(text: &str, max: usize) -> String {
    let masked = mask_secrets(text.trim());
    let cut = truncate_chars(&masked, max);
    if cut.len() == masked.len() {
        masked
    } else {
        format!("{cut}...")
    }
}

/// Remove one Markdown code fence wrapping the whole text, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // drop the info string (` ```json `) on the opening line
    match body.find('\n') {
        Some(nl) => body[nl + 1..].trim_end_matches([' ', '\t']),
        None => body,
    }
}
