//! Token extraction: structured entities first, regex fallback second.

use std::collections::HashSet;

use echopost_core::types::{EntityKind, Post, utf16_slice};

use crate::normalize::{normalize_mention, normalize_url};
use crate::patterns::{DOMAIN, MENTION, TME_LINK, strip_invisible};

/// Candidate tokens pulled out of one post. Lists are deduplicated by
/// canonical value, first-seen order preserved.
#[derive(Debug, Default)]
pub struct Extracted {
    pub urls: Vec<String>,
    pub mentions: Vec<String>,
    /// True when the post mentions a user by id with no visible handle.
    /// Such references cannot be checked against any allow-list.
    pub has_hidden_mention: bool,
}

/// Pull every URL-like and mention-like token out of a post.
///
/// Entities are authoritative where present, but they are sometimes absent
/// or clipped, so the raw text is additionally scanned with the link,
/// domain, and mention patterns. The fallback is a second independent
/// detector, not a replacement: a token found by either source is kept.
pub fn extract(post: &Post) -> Extracted {
    let mut out = Extracted::default();
    let mut seen_urls = HashSet::new();
    let mut seen_mentions = HashSet::new();

    for entity in &post.entities {
        match entity.kind {
            EntityKind::TextLink => {
                if let Some(url) = &entity.url {
                    push_url(&mut out.urls, &mut seen_urls, url);
                }
            }
            EntityKind::Url => {
                let slice = utf16_slice(&post.text, entity.offset, entity.length);
                push_url(&mut out.urls, &mut seen_urls, &slice);
            }
            EntityKind::Mention => {
                let slice = utf16_slice(&post.text, entity.offset, entity.length);
                // The slice normally is the `@handle` itself; if offsets
                // drifted, find the handle inside it.
                let handle = MENTION
                    .find(&slice)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or(slice);
                push_mention(&mut out.mentions, &mut seen_mentions, &handle);
            }
            EntityKind::TextMention => {
                out.has_hidden_mention = true;
            }
            EntityKind::Other => {}
        }
    }

    let text = strip_invisible(&post.text);
    for pattern in [&TME_LINK, &DOMAIN] {
        for m in pattern.find_iter(&text) {
            push_url(&mut out.urls, &mut seen_urls, m.as_str());
        }
    }
    for m in MENTION.find_iter(&text) {
        push_mention(&mut out.mentions, &mut seen_mentions, m.as_str());
    }

    out
}

fn push_url(urls: &mut Vec<String>, seen: &mut HashSet<String>, token: &str) {
    let canonical = normalize_url(token);
    if canonical.is_empty() {
        return;
    }
    if seen.insert(canonical) {
        urls.push(strip_invisible(token));
    }
}

fn push_mention(mentions: &mut Vec<String>, seen: &mut HashSet<String>, token: &str) {
    let canonical = normalize_mention(token);
    if canonical.is_empty() {
        return;
    }
    if seen.insert(canonical) {
        mentions.push(strip_invisible(token));
    }
}
