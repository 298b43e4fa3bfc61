//! # EchoPost Filter
//!
//! The promotional-content classifier. Extracts every URL-like and
//! mention-like token from a post (structured entities first, regex fallback
//! as an independent second detector), normalizes and expands the tokens,
//! and decides whether the post only references the channel itself or the
//! configured allow-list. A single third-party token vetoes the post.
//!
//! ```text
//! Post ──▶ extract ──▶ normalize/expand ──▶ classify ──▶ eligible? (bool)
//! ```

pub mod classify;
pub mod extract;
pub mod normalize;
pub mod patterns;

pub use classify::is_eligible;
pub use extract::{Extracted, extract};
pub use normalize::{expand_mention, expand_url, normalize_mention, normalize_url};
pub use patterns::strip_invisible;
