//! # EchoPost Core
//!
//! Shared foundation for the EchoPost workspace: the error type, the TOML
//! configuration model (channels, allow-list, transport credentials), and
//! the domain types the filter and scheduler operate on.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AllowList, EchoPostConfig, GatewayConfig, ReplyPlan, TelegramConfig};
pub use error::{EchoPostError, Result};
pub use types::{Entity, EntityKind, Post};
