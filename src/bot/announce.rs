//! Posting presentation messages to text channels.

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Http};
use std::sync::Arc;
use tracing::debug;

/// Sends a message to a text channel. Best effort: callers log and move on.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, text_channel_id: u64, message: &str) -> Result<(), AnnounceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("Invalid text channel id: {0}")]
    InvalidChannel(u64),

    #[error("Discord API error: {0}")]
    Discord(#[from] poise::serenity_prelude::Error),
}

/// Announcer that posts through the Discord REST API.
#[derive(Clone)]
pub struct DiscordAnnouncer {
    http: Arc<Http>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn announce(&self, text_channel_id: u64, message: &str) -> Result<(), AnnounceError> {
        if text_channel_id == 0 {
            return Err(AnnounceError::InvalidChannel(text_channel_id));
        }
        ChannelId::new(text_channel_id)
            .say(self.http.as_ref(), message)
            .await?;
        debug!(text_channel_id, "Posted announcement");
        Ok(())
    }
}

impl std::fmt::Debug for DiscordAnnouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordAnnouncer").finish_non_exhaustive()
    }
}

/// Announcer that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAnnouncer;

#[async_trait]
impl Announcer for SilentAnnouncer {
    async fn announce(&self, _text_channel_id: u64, _message: &str) -> Result<(), AnnounceError> {
        Ok(())
    }
}
