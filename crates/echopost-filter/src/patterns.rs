//! Named pattern objects shared by extraction and expansion.
//!
//! Kept as explicit statics rather than inline literals so each can be
//! exercised against adversarial inputs (zero-width characters, mixed
//! scripts, truncated entity slices) on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// `t.me/...` links, scheme and `www.` optional.
pub static TME_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?t\.me/[A-Za-z0-9_+\-./?=&#%]*[A-Za-z0-9_]")
        .expect("t.me link pattern")
});

/// General domain-like token: `label(.label)+` with ASCII letter/digit/hyphen
/// labels and a final label of 2+ letters, plus an optional path.
pub static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}(?:/[^\s]*)?")
        .expect("domain pattern")
});

/// `@handle`: 1 to 64 word characters.
pub static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w{1,64}").expect("mention pattern"));

/// Zero-width and byte-order-mark characters used to defeat substring
/// matching. Stripped before any pattern runs.
const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Remove zero-width joiners/spaces and BOM characters.
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}
