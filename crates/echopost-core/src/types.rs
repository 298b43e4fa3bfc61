//! Domain types shared between the transport, filter, and scheduler.

use serde::{Deserialize, Serialize};

/// A new channel post as seen by the filter pipeline. Read-only view built
/// by the transport from the inbound platform event.
#[derive(Debug, Clone)]
pub struct Post {
    /// Channel identifier: username without `@`, or numeric chat id as a
    /// decimal string when the channel has no username.
    pub channel: String,
    /// Message id the reply must anchor to (discussion-group local id).
    pub message_id: i64,
    /// Raw post text (or media caption).
    pub text: String,
    /// Platform-supplied structured annotations over `text`.
    pub entities: Vec<Entity>,
}

/// One structured text annotation. Offsets and lengths are in UTF-16 code
/// units, per the platform convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
    /// Embedded destination for [`EntityKind::TextLink`].
    pub url: Option<String>,
}

/// Annotation taxonomy the filter cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Bare URL appearing literally in the text.
    Url,
    /// Clickable text with an embedded destination URL.
    TextLink,
    /// Visible `@handle` mention.
    Mention,
    /// Mention of a user by id with no visible handle.
    TextMention,
    /// Anything else (bold, hashtag, code, ...) — ignored by the filter.
    Other,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            url: None,
        }
    }

    pub fn text_link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::TextLink,
            offset,
            length,
            url: Some(url.into()),
        }
    }
}

/// Slice `text` by UTF-16 code-unit offset/length, the unit the platform
/// reports entity positions in. Out-of-range offsets are clamped; this must
/// never panic on malformed input.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> String {
    let mut out = String::new();
    let mut pos = 0usize;
    let end = offset.saturating_add(length);
    for ch in text.chars() {
        let width = ch.len_utf16();
        if pos >= end {
            break;
        }
        if pos >= offset {
            out.push(ch);
        }
        pos += width;
    }
    out
}
