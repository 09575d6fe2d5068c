// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log-safe text handling.
//!
//! Two complementary mechanisms:
//! 1. **Sanitization**: control characters are removed and the text is
//!    hard-truncated, so a crafted string can never start a new log line.
//! 2. **Redaction**: known secret shapes (armored PGP blocks, API keys,
//!    bearer tokens) and caller-supplied exact values are replaced with
//!    `[REDACTED]` before text leaves the process.

use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on any free-text field written to the audit log.
pub const MAX_LOG_TEXT_CHARS: usize = 500;

/// The redaction placeholder.
const REDACTED: &str = "[REDACTED]";

/// Known secret patterns to redact from subprocess output and error text.
static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Armored OpenPGP payloads, possibly truncated.
        r"(?s)-----BEGIN PGP [A-Z ]+-----.*?(-----END PGP [A-Z ]+-----|$)",
        // Resend-style API keys: re_...
        r"\bre_[A-Za-z0-9_\-]{8,}",
        // OpenAI/Anthropic-style keys: sk-...
        r"\bsk-[A-Za-z0-9_\-]{16,}",
        // Bearer tokens in headers.
        r"Bearer\s+[A-Za-z0-9._\-]{10,}",
    ]
    .iter()
    .filter_map(|p| match Regex::new(p) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern = %p, error = %e, "invalid redaction pattern");
            None
        }
    })
    .collect()
});

/// Make arbitrary text safe to embed in a single audit log line.
///
/// Control characters (CR, LF and tab included) are dropped and the result
/// is truncated to [`MAX_LOG_TEXT_CHARS`] characters.
pub fn sanitize_log_text(input: &str) -> String {
    let cleaned: String = input
        .chars()
        // Unicode line/paragraph separators also break line-oriented readers.
        .filter(|c| !c.is_control() && !matches!(c, '\u{2028}' | '\u{2029}'))
        .collect();
    truncate_chars(cleaned.trim(), MAX_LOG_TEXT_CHARS)
}

/// Truncate to at most `max` characters, never splitting a code point.
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

/// Redact secrets from a string using regex patterns and exact-match values.
pub fn redact(input: &str, known_values: &[&str]) -> String {
    let mut result = input.to_string();

    for pattern in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }

    // Longest first to avoid leaving a suffix of a longer secret behind.
    let mut sorted: Vec<&str> = known_values.iter().copied().filter(|v| !v.is_empty()).collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));
    for value in sorted {
        result = result.replace(value, REDACTED);
    }

    result
}
