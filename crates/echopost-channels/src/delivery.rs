//! Delivery policy: pre-emptive throttle, rate-limit backoff, no retries.
//!
//! Every attempt sleeps a short fixed delay first, whatever the history —
//! bursts of channel posts are common and the platform rate-limits on
//! bursts. A rate-limited attempt honors the requested wait plus a margin
//! and then drops the reply rather than retrying it: after an arbitrary
//! delay the reply would land under stale context, and the next eligible
//! post tries again anyway.

use std::time::Duration;

use crate::telegram::{CommentSink, SendOutcome};

#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub pre_send_delay: Duration,
    pub rate_limit_margin: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            pre_send_delay: Duration::from_secs(1),
            rate_limit_margin: Duration::from_secs(1),
        }
    }
}

impl DeliveryPolicy {
    /// Send one comment. Returns true only when the platform accepted it.
    /// Failures are logged and swallowed; a failed send must never take the
    /// event loop down.
    pub async fn deliver<S: CommentSink + Sync + ?Sized>(
        &self,
        sink: &S,
        chat_id: i64,
        reply_to_message_id: i64,
        text: &str,
    ) -> bool {
        tokio::time::sleep(self.pre_send_delay).await;

        match sink.send_comment(chat_id, reply_to_message_id, text).await {
            Ok(SendOutcome::Sent) => {
                tracing::debug!(chat_id, reply_to_message_id, "comment delivered");
                true
            }
            Ok(SendOutcome::RateLimited(secs)) => {
                tracing::warn!(
                    chat_id,
                    reply_to_message_id,
                    wait_secs = secs,
                    "rate limited; backing off and dropping this reply"
                );
                tokio::time::sleep(Duration::from_secs(secs) + self.rate_limit_margin).await;
                false
            }
            Ok(SendOutcome::PermissionDenied(detail)) => {
                tracing::error!(
                    chat_id,
                    detail = %detail,
                    "cannot comment: join the discussion group / enable comments"
                );
                false
            }
            Ok(SendOutcome::Failed(detail)) => {
                tracing::error!(chat_id, reply_to_message_id, detail = %detail, "send failed");
                false
            }
            Err(e) => {
                tracing::error!(chat_id, reply_to_message_id, error = %e, "transport error");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use echopost_core::error::{EchoPostError, Result};
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedSink {
        outcomes: Mutex<Vec<Result<SendOutcome>>>,
        calls: Mutex<Vec<(i64, i64, String)>>,
    }

    impl ScriptedSink {
        fn new(outcomes: Vec<Result<SendOutcome>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommentSink for ScriptedSink {
        async fn send_comment(
            &self,
            chat_id: i64,
            reply_to_message_id: i64,
            text: &str,
        ) -> Result<SendOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((chat_id, reply_to_message_id, text.to_string()));
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_delivery() {
        let sink = ScriptedSink::new(vec![Ok(SendOutcome::Sent)]);
        let policy = DeliveryPolicy::default();
        assert!(policy.deliver(&sink, -100, 5, "hello").await);
        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(-100, 5, "hello".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sleeps_and_does_not_retry() {
        let sink = ScriptedSink::new(vec![Ok(SendOutcome::RateLimited(17))]);
        let policy = DeliveryPolicy::default();
        let started = Instant::now();
        assert!(!policy.deliver(&sink, -100, 5, "hello").await);
        // Exactly one attempt: the reply is dropped, not retried.
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
        // Pre-send delay (1s) + requested wait (17s) + margin (1s).
        assert!(started.elapsed() >= Duration::from_secs(19));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_drops_without_backoff() {
        let sink = ScriptedSink::new(vec![Ok(SendOutcome::PermissionDenied(
            "bot is not a member".into(),
        ))]);
        let policy = DeliveryPolicy::default();
        let started = Instant::now();
        assert!(!policy.deliver(&sink, -100, 5, "hello").await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_swallowed() {
        let sink = ScriptedSink::new(vec![Err(EchoPostError::Channel("boom".into()))]);
        let policy = DeliveryPolicy::default();
        assert!(!policy.deliver(&sink, -100, 5, "hello").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_send_delay_applies_to_every_attempt() {
        let sink = ScriptedSink::new(vec![Ok(SendOutcome::Sent), Ok(SendOutcome::Sent)]);
        let policy = DeliveryPolicy::default();
        let started = Instant::now();
        policy.deliver(&sink, -100, 1, "a").await;
        policy.deliver(&sink, -100, 2, "b").await;
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
