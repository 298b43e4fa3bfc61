//! Telegram Bot API transport — long polling + comment sending.
//!
//! A channel post surfaces to the bot as an automatic forward into the
//! linked discussion group; replying to that forwarded message posts a
//! comment under the original post. The bot must be a member of the
//! discussion group for any of this to work.

use async_trait::async_trait;
use echopost_core::config::TelegramConfig;
use echopost_core::error::{EchoPostError, Result};
use echopost_core::types::{Entity, EntityKind, Post};
use serde::{Deserialize, Serialize};

/// Outcome of one send attempt, classified from the API response. The
/// delivery policy pattern-matches on this instead of catching errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Platform asked us to wait this many seconds.
    RateLimited(u64),
    /// Bot is not in the discussion group, comments are disabled, or the
    /// chat is gone. Operator action required.
    PermissionDenied(String),
    /// Anything else; full description carried for diagnostics.
    Failed(String),
}

/// Anything that can place a comment under a channel post. Lets the
/// delivery policy be exercised without a network.
#[async_trait]
pub trait CommentSink {
    async fn send_comment(
        &self,
        chat_id: i64,
        reply_to_message_id: i64,
        text: &str,
    ) -> Result<SendOutcome>;
}

/// Telegram Bot API channel with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    last_update_id: i64,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            last_update_id: 0,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        )
    }

    /// Get updates using long polling.
    pub async fn get_updates(&mut self) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", (self.last_update_id + 1).to_string()),
                ("timeout", "30".into()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .send()
            .await
            .map_err(|e| EchoPostError::Channel(format!("getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| EchoPostError::Channel(format!("Invalid getUpdates response: {e}")))?;

        if !body.ok {
            return Err(EchoPostError::Channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }

        let updates = body.result.unwrap_or_default();
        if let Some(last) = updates.last() {
            self.last_update_id = last.update_id;
        }
        Ok(updates)
    }

    /// Get bot info, used for startup identity logging.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| EchoPostError::Channel(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| EchoPostError::Channel(format!("Invalid getMe response: {e}")))?;
        body.result
            .ok_or_else(|| EchoPostError::Channel("No bot info".into()))
    }

    pub fn poll_interval(&self) -> u64 {
        self.config.poll_interval
    }
}

#[async_trait]
impl CommentSink for TelegramChannel {
    /// Reply to the forwarded post in the discussion group. Never errors on
    /// an API-level failure; those are classified into [`SendOutcome`].
    async fn send_comment(
        &self,
        chat_id: i64,
        reply_to_message_id: i64,
        text: &str,
    ) -> Result<SendOutcome> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_to_message_id": reply_to_message_id,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| EchoPostError::Channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| EchoPostError::Channel(format!("Invalid send response: {e}")))?;

        Ok(classify_send_response(
            result.ok,
            result.error_code,
            result.description.as_deref(),
            result.parameters.as_ref().and_then(|p| p.retry_after),
        ))
    }
}

/// Map an API response onto the send-outcome taxonomy.
pub fn classify_send_response(
    ok: bool,
    error_code: Option<i64>,
    description: Option<&str>,
    retry_after: Option<u64>,
) -> SendOutcome {
    if ok {
        return SendOutcome::Sent;
    }
    let description = description.unwrap_or("").to_string();
    if error_code == Some(429) || retry_after.is_some() {
        return SendOutcome::RateLimited(retry_after.unwrap_or(30));
    }
    let lower = description.to_lowercase();
    let permission = error_code == Some(403)
        || lower.contains("not a member")
        || lower.contains("chat not found")
        || lower.contains("not enough rights")
        || lower.contains("replies_forbidden")
        || lower.contains("kicked");
    if permission {
        SendOutcome::PermissionDenied(description)
    } else {
        SendOutcome::Failed(description)
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub sender_chat: Option<TelegramChat>,
    #[serde(default)]
    pub is_automatic_forward: bool,
    pub text: Option<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub entities: Vec<TelegramEntity>,
    #[serde(default)]
    pub caption_entities: Vec<TelegramEntity>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
    pub url: Option<String>,
    pub user: Option<TelegramUser>,
}

impl TelegramEntity {
    fn to_core(&self) -> Entity {
        let kind = match self.kind.as_str() {
            "url" => EntityKind::Url,
            "text_link" => EntityKind::TextLink,
            "mention" => EntityKind::Mention,
            "text_mention" => EntityKind::TextMention,
            _ => EntityKind::Other,
        };
        Entity {
            kind,
            offset: self.offset.max(0) as usize,
            length: self.length.max(0) as usize,
            url: self.url.clone(),
        }
    }
}

/// One "new channel post" event: the forwarded post inside the discussion
/// group, plus the group chat id replies must target.
#[derive(Debug, Clone)]
pub struct PostEvent {
    pub group_chat_id: i64,
    pub post: Post,
}

impl TelegramUpdate {
    /// Extract a post event if this update is the automatic forward of a
    /// channel post into its discussion group.
    pub fn to_post_event(&self) -> Option<PostEvent> {
        let msg = self.message.as_ref()?;
        if !msg.is_automatic_forward {
            return None;
        }
        let origin = msg.sender_chat.as_ref()?;
        let channel = origin
            .username
            .clone()
            .unwrap_or_else(|| origin.id.to_string());

        let text = msg
            .text
            .clone()
            .or_else(|| msg.caption.clone())
            .unwrap_or_default();
        let entities = if msg.entities.is_empty() {
            &msg.caption_entities
        } else {
            &msg.entities
        };

        Some(PostEvent {
            group_chat_id: msg.chat.id,
            post: Post {
                channel,
                message_id: msg.message_id,
                text,
                entities: entities.iter().map(TelegramEntity::to_core).collect(),
            },
        })
    }
}
