//! # EchoPost — auto-comment bot for Telegram channels
//!
//! Watches a configured set of channels and posts a reply into each
//! channel's linked discussion thread, subject to the promotional-content
//! filter and the per-channel rotation/frequency scheduler.
//!
//! Usage:
//!   echopost                         # Start the bot
//!   echopost --config ./bot.toml     # Custom config path
//!   echopost channels list           # Inspect configured channels
//!   echopost channels add --channel news --message "Thanks!" --frequency 3

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use echopost_channels::{CommentSink, DeliveryPolicy, PostEvent, TelegramChannel};
use echopost_core::config::{EchoPostConfig, ReplyPlan};
use echopost_filter::is_eligible;
use echopost_scheduler::ReplyRotation;

#[derive(Parser)]
#[command(
    name = "echopost",
    version,
    about = "💬 EchoPost — auto-comment bot for Telegram channels"
)]
struct Cli {
    /// Path to config file
    #[arg(long, default_value = "~/.echopost/config.toml")]
    config: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch configured channels and post comments (default)
    Run,
    /// Manage the channels table in the config file
    Channels {
        #[command(subcommand)]
        action: ChannelsAction,
    },
}

#[derive(Subcommand)]
enum ChannelsAction {
    /// List configured channels
    List,
    /// Add a channel (repeat --message for a rotation)
    Add {
        /// Channel username (no @) or numeric chat id
        #[arg(long)]
        channel: String,
        /// Reply text; repeat for a rotation
        #[arg(long = "message", required = true)]
        messages: Vec<String>,
        /// Reply to every Nth eligible post
        #[arg(long, default_value_t = 1)]
        frequency: u32,
    },
    /// Replace an existing channel's messages and frequency
    Edit {
        /// Channel username (no @) or numeric chat id
        #[arg(long)]
        channel: String,
        /// New reply text; repeat for a rotation
        #[arg(long = "message", required = true)]
        messages: Vec<String>,
        /// Reply to every Nth eligible post
        #[arg(long, default_value_t = 1)]
        frequency: u32,
    },
    /// Remove a channel
    Remove {
        #[arg(long)]
        channel: String,
    },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug,hyper=info,reqwest=info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = expand_path(&cli.config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_bot(&config_path).await,
        Command::Channels { action } => manage_channels(&config_path, action),
    }
}

async fn run_bot(config_path: &Path) -> Result<()> {
    let config = EchoPostConfig::load_from(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    if config.telegram.bot_token.is_empty() {
        bail!("telegram.bot_token is not set in {}", config_path.display());
    }
    if config.channels.is_empty() {
        tracing::warn!("no channels configured; the bot will idle");
    }

    if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = echopost_gateway::run(&gateway_config).await {
                tracing::error!("gateway terminated: {e}");
            }
        });
    }

    let mut channel = TelegramChannel::new(config.telegram.clone());
    match channel.get_me().await {
        Ok(me) => tracing::info!(
            "🚀 EchoPost online as @{}",
            me.username.as_deref().unwrap_or("unknown")
        ),
        Err(e) => tracing::warn!("getMe failed (continuing anyway): {e}"),
    }

    let mut rotation = ReplyRotation::new();
    let policy = DeliveryPolicy::default();
    let poll_interval = std::time::Duration::from_secs(channel.poll_interval());

    loop {
        match channel.get_updates().await {
            Ok(updates) => {
                let events: Vec<PostEvent> =
                    updates.iter().filter_map(|u| u.to_post_event()).collect();
                for event in events {
                    handle_post(&config, &mut rotation, &policy, &channel, event).await;
                }
            }
            Err(e) => {
                tracing::error!("polling error: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Process one new channel post end to end. Classification and counter
/// advancement are fully synchronous; the send is the only await. Nothing
/// in here may propagate an error — one bad post must never stop the loop.
async fn handle_post<S: CommentSink + Sync>(
    config: &EchoPostConfig,
    rotation: &mut ReplyRotation,
    policy: &DeliveryPolicy,
    sink: &S,
    event: PostEvent,
) {
    let Some((channel_id, plan)) = config.channel_plan(&event.post.channel) else {
        tracing::debug!(channel = %event.post.channel, "post from unconfigured channel, ignoring");
        return;
    };

    if !is_eligible(&event.post, channel_id, &config.allowlist) {
        return;
    }

    let Some(text) = rotation.next_reply(channel_id, plan) else {
        return;
    };

    if policy
        .deliver(sink, event.group_chat_id, event.post.message_id, &text)
        .await
    {
        tracing::info!(
            channel = %channel_id,
            msg_id = event.post.message_id,
            "✅ comment posted"
        );
    }
}

fn manage_channels(config_path: &Path, action: ChannelsAction) -> Result<()> {
    let mut config = if config_path.exists() {
        EchoPostConfig::load_from(config_path)?
    } else {
        EchoPostConfig::default()
    };

    match action {
        ChannelsAction::List => {
            if config.channels.is_empty() {
                println!("No channels configured.");
                return Ok(());
            }
            println!("Configured channels:");
            let mut names: Vec<&String> = config.channels.keys().collect();
            names.sort();
            for (i, name) in names.iter().enumerate() {
                let plan = &config.channels[*name];
                let preview: String = plan.messages().join("; ").chars().take(40).collect();
                println!("  {}. {} → [x{}] {}", i + 1, name, plan.frequency(), preview);
            }
        }
        ChannelsAction::Add {
            channel,
            messages,
            frequency,
        } => {
            let channel = channel.trim().trim_start_matches('@').to_string();
            if channel.is_empty() {
                bail!("channel name is empty");
            }
            if config.channel_plan(&channel).is_some() {
                bail!("channel '{channel}' already exists");
            }
            let plan = build_plan(messages, frequency)?;
            config.channels.insert(channel.clone(), plan);
            config.save_to(config_path)?;
            println!("✅ Channel '{channel}' added.");
        }
        ChannelsAction::Edit {
            channel,
            messages,
            frequency,
        } => {
            let Some(key) = find_channel_key(&config, &channel) else {
                bail!("channel '{channel}' not found");
            };
            let plan = build_plan(messages, frequency)?;
            config.channels.insert(key.clone(), plan);
            config.save_to(config_path)?;
            println!("✅ Channel '{key}' updated.");
        }
        ChannelsAction::Remove { channel } => {
            match find_channel_key(&config, &channel) {
                Some(key) => {
                    config.channels.remove(&key);
                    config.save_to(config_path)?;
                    println!("✅ Channel '{key}' removed.");
                }
                None => bail!("channel '{channel}' not found"),
            }
        }
    }
    Ok(())
}

/// Resolve a user-supplied channel name to the configured key, tolerating
/// case and a leading `@`.
fn find_channel_key(config: &EchoPostConfig, channel: &str) -> Option<String> {
    let wanted = channel.trim().trim_start_matches('@').to_lowercase();
    config
        .channels
        .keys()
        .find(|k| k.trim_start_matches('@').to_lowercase() == wanted)
        .cloned()
}

/// Build a reply plan from CLI arguments, rejecting all-blank messages.
fn build_plan(messages: Vec<String>, frequency: u32) -> Result<ReplyPlan> {
    let messages: Vec<String> = messages
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        bail!("at least one non-blank --message is required");
    }
    Ok(if messages.len() == 1 && frequency == 1 {
        ReplyPlan::Single(messages.into_iter().next().unwrap())
    } else {
        ReplyPlan::Rotating {
            messages,
            frequency: frequency.max(1),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use echopost_core::config::AllowList;
    use echopost_core::types::{Entity, EntityKind, Post};
    use echopost_channels::SendOutcome;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingSink {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl CommentSink for RecordingSink {
        async fn send_comment(
            &self,
            _chat_id: i64,
            reply_to_message_id: i64,
            text: &str,
        ) -> echopost_core::Result<SendOutcome> {
            self.sent
                .lock()
                .unwrap()
                .push((reply_to_message_id, text.to_string()));
            Ok(SendOutcome::Sent)
        }
    }

    fn test_config(plan: ReplyPlan) -> EchoPostConfig {
        let mut channels = HashMap::new();
        channels.insert("newsdaily".to_string(), plan);
        EchoPostConfig {
            channels,
            allowlist: AllowList {
                urls: vec!["t.me/ironetbot".into()],
                mentions: vec![],
            },
            ..Default::default()
        }
    }

    fn event(message_id: i64, text: &str, entities: Vec<Entity>) -> PostEvent {
        PostEvent {
            group_chat_id: -100200,
            post: Post {
                channel: "NewsDaily".into(),
                message_id,
                text: text.into(),
                entities,
            },
        }
    }

    async fn run_pipeline(config: &EchoPostConfig, events: Vec<PostEvent>) -> Vec<(i64, String)> {
        let sink = RecordingSink {
            sent: Mutex::new(Vec::new()),
        };
        let mut rotation = ReplyRotation::new();
        let policy = DeliveryPolicy::default();
        for e in events {
            handle_post(config, &mut rotation, &policy, &sink, e).await;
        }
        sink.sent.into_inner().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_frequency_and_rotation_end_to_end() {
        let config = test_config(ReplyPlan::Rotating {
            messages: vec!["A".into(), "B".into()],
            frequency: 3,
        });
        let events = (1..=7).map(|i| event(i, "plain post", vec![])).collect();
        let sent = run_pipeline(&config, events).await;
        // Posts 3 and 6 get replies, rotating through the list.
        assert_eq!(sent, vec![(3, "A".to_string()), (6, "B".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_promotional_post_is_skipped_and_not_counted() {
        let config = test_config(ReplyPlan::Rotating {
            messages: vec!["hi".into()],
            frequency: 2,
        });
        let events = vec![
            event(1, "plain", vec![]),
            event(2, "go to t.me/othernews", vec![]),
            event(3, "plain again", vec![]),
        ];
        let sent = run_pipeline(&config, events).await;
        // The promo post never reaches the scheduler, so the counter sits
        // at 2 after the third post and that one dispatches.
        assert_eq!(sent, vec![(3, "hi".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_mention_and_allowlist_end_to_end() {
        let config = test_config(ReplyPlan::Single("thanks".into()));
        let events = vec![
            event(1, "shoutout", vec![Entity::new(EntityKind::TextMention, 0, 8)]),
            event(2, "try t.me/ironetbot", vec![]),
            event(3, "self link t.me/newsdaily/9", vec![]),
        ];
        let sent = run_pipeline(&config, events).await;
        assert_eq!(
            sent,
            vec![(2, "thanks".to_string()), (3, "thanks".to_string())]
        );
    }

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("echopost-{}-{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_channels_edit_replaces_plan() {
        let path = temp_config("edit");
        test_config(ReplyPlan::Single("old".into()))
            .save_to(&path)
            .unwrap();

        manage_channels(
            &path,
            ChannelsAction::Edit {
                channel: "@NewsDaily".into(),
                messages: vec!["A".into(), "B".into()],
                frequency: 3,
            },
        )
        .unwrap();

        let config = EchoPostConfig::load_from(&path).unwrap();
        let (_, plan) = config.channel_plan("newsdaily").unwrap();
        assert_eq!(plan.messages(), vec!["A", "B"]);
        assert_eq!(plan.frequency(), 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_channels_edit_unknown_channel_fails() {
        let path = temp_config("edit-missing");
        test_config(ReplyPlan::Single("old".into()))
            .save_to(&path)
            .unwrap();

        let result = manage_channels(
            &path,
            ChannelsAction::Edit {
                channel: "stranger".into(),
                messages: vec!["x".into()],
                frequency: 1,
            },
        );
        assert!(result.is_err());

        // The existing entry is untouched.
        let config = EchoPostConfig::load_from(&path).unwrap();
        let (_, plan) = config.channel_plan("newsdaily").unwrap();
        assert_eq!(plan.messages(), vec!["old"]);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_channel_ignored() {
        let config = test_config(ReplyPlan::Single("thanks".into()));
        let mut e = event(1, "plain", vec![]);
        e.post.channel = "strangerchannel".into();
        let sent = run_pipeline(&config, vec![e]).await;
        assert!(sent.is_empty());
    }
}
