//! # EchoPost Scheduler
//!
//! Per-channel rotation and throttling. Once a post is classified eligible,
//! the scheduler decides whether this is the Nth post that gets a reply and
//! which text in the rotation to use. State is in-memory only; counters
//! reset on restart by design.

use std::collections::HashMap;

use echopost_core::config::ReplyPlan;

/// Mutable per-channel counters. Created lazily on the first observed post,
/// mutated exactly once per eligible post, never persisted.
#[derive(Debug, Default)]
struct ChannelState {
    /// Monotonic count of eligible posts observed for this channel.
    post_count: u64,
    /// Next position into the message rotation, wrapped modulo its length.
    rotation_index: usize,
}

/// Registry of per-channel rotation state. Single writer: the event loop
/// owns this and is the only mutator, and every mutation completes
/// synchronously before the caller reaches an await point.
#[derive(Debug, Default)]
pub struct ReplyRotation {
    states: HashMap<String, ChannelState>,
}

impl ReplyRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the channel's counters and pick the reply for this post, or
    /// `None` when the frequency gate or a misconfigured plan withholds it.
    ///
    /// The counter advances on every eligible post, dispatched or not, so
    /// the frequency residue is stable regardless of delivery outcomes.
    pub fn next_reply(&mut self, channel_id: &str, plan: &ReplyPlan) -> Option<String> {
        let key = channel_id.trim_start_matches('@').to_lowercase();
        let state = self.states.entry(key).or_default();
        state.post_count += 1;

        let frequency = u64::from(plan.frequency());
        if state.post_count % frequency != 0 {
            tracing::debug!(
                channel = %channel_id,
                post_count = state.post_count,
                frequency,
                "frequency gate: holding reply"
            );
            return None;
        }

        let messages = plan.messages();
        if messages.is_empty() {
            tracing::warn!(channel = %channel_id, "no usable reply messages configured, skipping");
            return None;
        }

        let text = messages[state.rotation_index % messages.len()].to_string();
        state.rotation_index += 1;
        Some(text)
    }

    /// Number of eligible posts seen for a channel so far.
    pub fn post_count(&self, channel_id: &str) -> u64 {
        let key = channel_id.trim_start_matches('@').to_lowercase();
        self.states.get(&key).map(|s| s.post_count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotating(messages: &[&str], frequency: u32) -> ReplyPlan {
        ReplyPlan::Rotating {
            messages: messages.iter().map(|s| s.to_string()).collect(),
            frequency,
        }
    }

    #[test]
    fn test_single_plan_replies_every_post() {
        let mut rotation = ReplyRotation::new();
        let plan = ReplyPlan::Single("thanks!".into());
        for _ in 0..3 {
            assert_eq!(rotation.next_reply("news", &plan).as_deref(), Some("thanks!"));
        }
    }

    #[test]
    fn test_frequency_gating_every_third_post() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["hi"], 3);
        let dispatched: Vec<bool> = (1..=7)
            .map(|_| rotation.next_reply("news", &plan).is_some())
            .collect();
        assert_eq!(
            dispatched,
            vec![false, false, true, false, false, true, false]
        );
    }

    #[test]
    fn test_rotation_order_and_wraparound() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["A", "B", "C"], 1);
        let texts: Vec<String> = (0..5)
            .filter_map(|_| rotation.next_reply("news", &plan))
            .collect();
        assert_eq!(texts, vec!["A", "B", "C", "A", "B"]);
    }

    #[test]
    fn test_blank_messages_never_dispatch() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["", "  "], 1);
        for _ in 0..4 {
            assert!(rotation.next_reply("news", &plan).is_none());
        }
        // The counter still advances; misconfiguration is not a crash.
        assert_eq!(rotation.post_count("news"), 4);
    }

    #[test]
    fn test_counter_is_per_post_not_per_dispatch() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["x"], 2);
        assert!(rotation.next_reply("news", &plan).is_none());
        assert!(rotation.next_reply("news", &plan).is_some());
        assert!(rotation.next_reply("news", &plan).is_none());
        assert!(rotation.next_reply("news", &plan).is_some());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["A", "B"], 1);
        assert_eq!(rotation.next_reply("one", &plan).as_deref(), Some("A"));
        assert_eq!(rotation.next_reply("two", &plan).as_deref(), Some("A"));
        assert_eq!(rotation.next_reply("one", &plan).as_deref(), Some("B"));
    }

    #[test]
    fn test_channel_key_case_insensitive() {
        let mut rotation = ReplyRotation::new();
        let plan = rotating(&["A", "B"], 1);
        assert_eq!(rotation.next_reply("News", &plan).as_deref(), Some("A"));
        assert_eq!(rotation.next_reply("@news", &plan).as_deref(), Some("B"));
    }

    #[test]
    fn test_frequency_change_uses_live_config() {
        // Frequency comes from the plan on every call; a config edit takes
        // effect immediately against the running counter.
        let mut rotation = ReplyRotation::new();
        assert!(rotation.next_reply("news", &rotating(&["x"], 2)).is_none());
        assert!(rotation.next_reply("news", &rotating(&["x"], 1)).is_some());
    }
}
