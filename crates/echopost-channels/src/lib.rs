//! # EchoPost Channels
//!
//! The Telegram Bot API transport (long polling, comment sending, outcome
//! classification) and the delivery policy that wraps every send with a
//! pre-emptive throttle and rate-limit-aware backoff.

pub mod delivery;
pub mod telegram;

pub use delivery::DeliveryPolicy;
pub use telegram::{CommentSink, PostEvent, SendOutcome, TelegramChannel};
