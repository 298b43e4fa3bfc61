//! Token canonicalization and truncation recovery.
//!
//! Entity offsets can clip a token to a prefix (offset units and emoji
//! widths do not always agree across clients), and authors pad tokens with
//! punctuation and zero-width characters. Normalization makes comparison
//! robust to formatting noise; expansion re-scans the full raw text for a
//! longer candidate consistent with the clipped one.

use crate::patterns::{DOMAIN, MENTION, TME_LINK, strip_invisible};

/// Punctuation trimmed from both ends of a token.
const EDGE_PUNCT: &[char] = &[
    '(', ')', '[', ']', '{', '}', '<', '>', '"', '\'', '`', '.', ',', ';', ':', '!', '?', '«', '»',
    '“', '”', '‘', '’', '|', '*',
];

/// Canonical form of a URL token: invisibles stripped, edges trimmed,
/// lowercased. Idempotent.
pub fn normalize_url(token: &str) -> String {
    strip_invisible(token)
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCT.contains(&c))
        .to_lowercase()
}

/// Canonical form of a mention token: as [`normalize_url`], minus a single
/// leading `@`, keeping only `[A-Za-z0-9_]`-class characters. Idempotent.
pub fn normalize_mention(token: &str) -> String {
    let trimmed = strip_invisible(token);
    let trimmed = trimmed
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCT.contains(&c));
    trimmed
        .strip_prefix('@')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Recover a possibly clipped URL token: among link/domain matches in the
/// raw text that contain the token or are contained by it, return the
/// longest; the token itself if none qualifies.
pub fn expand_url(token: &str, raw_text: &str) -> String {
    expand_with(token, raw_text, &[&TME_LINK, &DOMAIN])
}

/// Recover a possibly clipped mention token from the raw text.
pub fn expand_mention(token: &str, raw_text: &str) -> String {
    expand_with(token, raw_text, &[&MENTION])
}

fn expand_with(token: &str, raw_text: &str, patterns: &[&regex::Regex]) -> String {
    let needle = token.to_lowercase();
    if needle.is_empty() {
        return token.to_string();
    }
    let haystack = strip_invisible(raw_text);
    let mut best: Option<&str> = None;
    for pattern in patterns {
        for m in pattern.find_iter(&haystack) {
            let candidate = m.as_str();
            let lower = candidate.to_lowercase();
            if !(lower.contains(&needle) || needle.contains(&lower)) {
                continue;
            }
            if best.is_none_or(|b| candidate.len() > b.len()) {
                best = Some(candidate);
            }
        }
    }
    best.map(str::to_string)
        .unwrap_or_else(|| token.to_string())
}
