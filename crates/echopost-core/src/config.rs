//! EchoPost configuration system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{EchoPostError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EchoPostConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub allowlist: AllowList,
    /// Monitored channels keyed by username (no `@`) or numeric chat id.
    /// Keys are compared case-insensitively at lookup time.
    #[serde(default)]
    pub channels: HashMap<String, ReplyPlan>,
}

impl EchoPostConfig {
    /// Load config from the default path (~/.echopost/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EchoPostError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| EchoPostError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| EchoPostError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".echopost")
            .join("config.toml")
    }

    /// Look up the reply plan for a channel identifier, case-insensitively.
    /// Returns the configured key alongside the plan so callers log the
    /// identifier exactly as the operator wrote it.
    pub fn channel_plan(&self, channel_id: &str) -> Option<(&str, &ReplyPlan)> {
        let wanted = channel_id.trim_start_matches('@').to_lowercase();
        self.channels
            .iter()
            .find(|(k, _)| k.trim_start_matches('@').to_lowercase() == wanted)
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn bool_true() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Static allow-list: substrings/handles that never count as third-party
/// promotion. Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AllowList {
    /// Allowed URL substrings (e.g. "t.me/ironetbot", a discussion-group
    /// link, partner proxy-sharing links).
    #[serde(default)]
    pub urls: Vec<String>,
    /// Allowed mention handles, with or without a leading `@`.
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Per-channel reply configuration: either a bare string (single reply,
/// every post) or a rotation with an explicit frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyPlan {
    Single(String),
    Rotating {
        messages: Vec<String>,
        #[serde(default = "default_frequency")]
        frequency: u32,
    },
}

fn default_frequency() -> u32 {
    1
}

impl ReplyPlan {
    /// Normalized view: the usable (non-blank) messages and the effective
    /// frequency. Downstream code never inspects the variant directly.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            ReplyPlan::Single(text) => {
                if text.trim().is_empty() {
                    vec![]
                } else {
                    vec![text.as_str()]
                }
            }
            ReplyPlan::Rotating { messages, .. } => messages
                .iter()
                .map(|m| m.as_str())
                .filter(|m| !m.trim().is_empty())
                .collect(),
        }
    }

    /// Effective frequency; a configured 0 is coerced to 1.
    pub fn frequency(&self) -> u32 {
        match self {
            ReplyPlan::Single(_) => 1,
            ReplyPlan::Rotating { frequency, .. } => (*frequency).max(1),
        }
    }
}
