//! Eligibility rules: self-references and allow-listed tokens pass,
//! everything else is treated as third-party promotion.
//!
//! The asymmetry is deliberate. The channel owner controls links and
//! mentions of the channel itself and curates the allow-list (official bot,
//! discussion group, a few partners); every other token is promotion and a
//! single one vetoes the post. Ambiguity resolves closed, never open.

use echopost_core::config::AllowList;
use echopost_core::types::Post;

use crate::extract::extract;
use crate::normalize::{expand_mention, expand_url, normalize_mention, normalize_url};
use crate::patterns::strip_invisible;

/// Decide whether `post` may receive an automated reply. Pure function of
/// the extracted tokens, the channel identifier, and the allow-list.
pub fn is_eligible(post: &Post, channel_id: &str, allowlist: &AllowList) -> bool {
    let extracted = extract(post);

    if extracted.has_hidden_mention {
        tracing::info!(channel = %channel_id, msg_id = post.message_id,
            "skip: hidden by-id mention (unverifiable)");
        return false;
    }

    let channel = channel_id.trim_start_matches('@').to_lowercase();
    let raw = strip_invisible(&post.text);

    for token in &extracted.urls {
        let normalized = normalize_url(token);
        let expanded = normalize_url(&expand_url(&normalized, &raw));
        if !url_allowed(&expanded, &channel, allowlist) {
            tracing::info!(channel = %channel_id, msg_id = post.message_id,
                token = %expanded, "skip: third-party link");
            return false;
        }
    }

    for token in &extracted.mentions {
        let normalized = normalize_mention(token);
        let expanded = normalize_mention(&expand_mention(&normalized, &raw));
        if !mention_allowed(&expanded, &channel, allowlist) {
            tracing::info!(channel = %channel_id, msg_id = post.message_id,
                token = %expanded, "skip: third-party mention");
            return false;
        }
    }

    true
}

fn url_allowed(token: &str, channel: &str, allowlist: &AllowList) -> bool {
    if token.contains(channel) {
        return true;
    }
    if allowlist
        .urls
        .iter()
        .any(|a| !a.trim().is_empty() && token.contains(&a.trim().to_lowercase()))
    {
        return true;
    }
    token_matches_channel(token, channel)
}

fn mention_allowed(token: &str, channel: &str, allowlist: &AllowList) -> bool {
    let channel_handle = normalize_mention(channel);
    if token == channel_handle {
        return true;
    }
    if token_matches_channel(token, channel) {
        return true;
    }
    // Containment is checked in both directions, matching long-observed
    // behavior. A short allow-listed handle can over-allow; see DESIGN.md.
    allowlist.mentions.iter().any(|a| {
        let a = normalize_mention(a);
        !a.is_empty() && (token == a || token.contains(&a) || a.contains(token))
    })
}

/// Does the token refer to the channel itself? Either it parses as a
/// domain/path embedding the identifier as host or path segment, or reduced
/// to `[a-z0-9_]` it equals the identifier (tolerating up to two stray
/// leading characters the pattern may have captured).
fn token_matches_channel(token: &str, channel: &str) -> bool {
    let channel = channel.trim_start_matches('@').to_lowercase();
    if channel.is_empty() {
        return false;
    }

    let bare = token
        .strip_prefix("https://")
        .or_else(|| token.strip_prefix("http://"))
        .unwrap_or(token);
    let bare = bare.strip_prefix("www.").unwrap_or(bare);

    let mut segments = bare.split(['/', '?', '#']).filter(|s| !s.is_empty());
    if let Some(host) = segments.next() {
        if host == channel {
            return true;
        }
        if segments.any(|seg| seg == channel) {
            return true;
        }
    }

    let squeeze = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect()
    };
    let t = squeeze(token);
    let c = squeeze(&channel);
    if c.is_empty() {
        return false;
    }
    t == c || (t.ends_with(&c) && t.len() - c.len() <= 2)
}
