//! Play statistics sidecar.
//!
//! Workers report every play here in a detached task. Failures are logged by
//! the caller and never affect playback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// One completed play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayRecord {
    pub guild_id: u64,
    pub user_id: u64,
    pub channel_id: u64,
    /// Sound id for uploaded sounds, name for built-in ones
    pub sound: String,
    pub played_at: DateTime<Utc>,
}

/// Receiver of play notifications.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn record(&self, play: &PlayRecord) -> Result<(), StatsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Stats backend unavailable: {0}")]
    Unavailable(String),
}

/// In-memory play counters.
#[derive(Default)]
pub struct PlayCounter {
    total: AtomicU64,
    guild_plays: DashMap<u64, u64>,
    sound_plays: DashMap<(u64, String), u64>,
    user_plays: DashMap<u64, u64>,
    users: DashSet<u64>,
    guilds: DashSet<u64>,
    channels: DashSet<u64>,
}

impl PlayCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn guild_plays(&self, guild_id: u64) -> u64 {
        self.guild_plays.get(&guild_id).map(|v| *v).unwrap_or(0)
    }

    pub fn user_plays(&self, user_id: u64) -> u64 {
        self.user_plays.get(&user_id).map(|v| *v).unwrap_or(0)
    }

    /// Most played sounds in a guild, highest first, ties by name.
    pub fn top_sounds(&self, guild_id: u64, limit: usize) -> Vec<(String, u64)> {
        let mut sounds: Vec<(String, u64)> = self
            .sound_plays
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect();
        sounds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sounds.truncate(limit);
        sounds
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total(),
            unique_users: self.users.len(),
            unique_guilds: self.guilds.len(),
            unique_channels: self.channels.len(),
        }
    }
}

#[async_trait]
impl StatsSink for PlayCounter {
    async fn record(&self, play: &PlayRecord) -> Result<(), StatsError> {
        self.total.fetch_add(1, Ordering::Relaxed);
        *self.guild_plays.entry(play.guild_id).or_insert(0) += 1;
        *self
            .sound_plays
            .entry((play.guild_id, play.sound.clone()))
            .or_insert(0) += 1;
        *self.user_plays.entry(play.user_id).or_insert(0) += 1;
        self.users.insert(play.user_id);
        self.guilds.insert(play.guild_id);
        self.channels.insert(play.channel_id);
        Ok(())
    }
}

impl std::fmt::Debug for PlayCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayCounter")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Global counters, serialisable for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub unique_users: usize,
    pub unique_guilds: usize,
    pub unique_channels: usize,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plays: {}, Users: {}, Guilds: {}, Channels: {}",
            self.total, self.unique_users, self.unique_guilds, self.unique_channels
        )
    }
}
