//! Voice transport contract used by the playback worker.

use async_trait::async_trait;
use bytes::Bytes;

/// A live voice connection for one guild.
///
/// Owned by value: whoever holds it is the only one talking on it.
pub trait VoiceSession: Send + 'static {
    fn guild_id(&self) -> u64;

    /// Voice channel the session is currently connected to.
    fn channel_id(&self) -> u64;
}

/// Connects to voice channels and streams encoded frames.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    type Session: VoiceSession;

    /// Join `channel_id` in `guild_id`.
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<Self::Session, VoiceError>;

    /// Move an existing session to another channel of the same guild.
    async fn switch_channel(
        &self,
        session: &mut Self::Session,
        channel_id: u64,
    ) -> Result<(), VoiceError>;

    /// Toggle the speaking indicator. Turning it off waits for already sent
    /// frames to finish playing.
    async fn set_speaking(&self, session: &mut Self::Session, speaking: bool);

    /// Send one encoded frame. Frames are delivered in call order; the
    /// transport applies backpressure by not returning until it has room.
    async fn send_frame(&self, session: &mut Self::Session, frame: Bytes) -> Result<(), VoiceError>;

    /// Leave the channel and release the session.
    async fn disconnect(&self, session: Self::Session);
}

/// Voice transport failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VoiceError {
    #[error("Failed to join voice channel {channel_id} in guild {guild_id}: {reason}")]
    Connect {
        guild_id: u64,
        channel_id: u64,
        reason: String,
    },

    #[error("Failed to switch to voice channel {channel_id}: {reason}")]
    Switch { channel_id: u64, reason: String },

    #[error("Audio stream failed: {0}")]
    Stream(String),

    #[error("Invalid Discord id: {0}")]
    InvalidId(u64),
}
