//! Songbird-backed voice transport.
//!
//! Frames are fed into a live songbird track as a DCA1 stream. Songbird
//! recognises the Opus payload and passes it through without re-encoding.
//!
//! ```text
//!   worker ──send_frame──▶ mpsc (bounded) ──▶ FrameFeed (Read) ──▶ songbird mixer
//! ```

use super::transport::{VoiceError, VoiceSession, VoiceTransport};
use crate::audio::dca;
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use songbird::id::{ChannelId, GuildId};
use songbird::input::{AudioStream, Input, LiveInput};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Songbird};
use std::io::{self, Read, Seek, SeekFrom};
use std::num::NonZeroU64;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use symphonia::core::io::MediaSource;
use symphonia::core::probe::Hint;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Tuning for the songbird transport.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Frames buffered ahead of the mixer (50 frames = 1s)
    pub buffer_frames: usize,
    /// How often to check whether the track has drained
    pub poll_interval: Duration,
    /// Upper bound on waiting for a track to drain
    pub drain_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            buffer_frames: 50,
            poll_interval: Duration::from_millis(50),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// A songbird call for one guild plus the track currently being fed.
pub struct SongbirdSession {
    guild_id: u64,
    channel_id: u64,
    call: Arc<Mutex<Call>>,
    live: Option<LiveTrack>,
}

struct LiveTrack {
    frames: mpsc::Sender<Bytes>,
    track: TrackHandle,
}

impl VoiceSession for SongbirdSession {
    fn guild_id(&self) -> u64 {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        self.channel_id
    }
}

impl std::fmt::Debug for SongbirdSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SongbirdSession")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("speaking", &self.live.is_some())
            .finish()
    }
}

/// Voice transport over a shared [`Songbird`] manager.
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    config: DriverConfig,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self::with_config(songbird, DriverConfig::default())
    }

    pub fn with_config(songbird: Arc<Songbird>, config: DriverConfig) -> Self {
        Self { songbird, config }
    }

    /// Get the Songbird instance.
    pub fn songbird(&self) -> Arc<Songbird> {
        self.songbird.clone()
    }

    async fn join(&self, guild_id: u64, channel_id: u64) -> Result<Arc<Mutex<Call>>, String> {
        let guild = GuildId(NonZeroU64::new(guild_id).ok_or("guild id is zero")?);
        let channel = ChannelId(NonZeroU64::new(channel_id).ok_or("channel id is zero")?);
        self.songbird
            .join(guild, channel)
            .await
            .map_err(|e| e.to_string())
    }

    async fn wait_for_drain(&self, track: TrackHandle) {
        let drained = async {
            loop {
                match track.get_info().await {
                    Ok(state)
                        if matches!(
                            state.playing,
                            PlayMode::End | PlayMode::Stop | PlayMode::Errored(_)
                        ) =>
                    {
                        break
                    }
                    Ok(_) => tokio::time::sleep(self.config.poll_interval).await,
                    // Handle is gone once the track finished
                    Err(_) => break,
                }
            }
        };

        if tokio::time::timeout(self.config.drain_timeout, drained)
            .await
            .is_err()
        {
            warn!("Track did not drain in time, stopping it");
            if let Err(e) = track.stop() {
                debug!(error = ?e, "Track already stopped");
            }
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    type Session = SongbirdSession;

    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<SongbirdSession, VoiceError> {
        info!(guild_id, channel_id, "Connecting to voice channel");
        let call = self
            .join(guild_id, channel_id)
            .await
            .map_err(|reason| VoiceError::Connect {
                guild_id,
                channel_id,
                reason,
            })?;

        Ok(SongbirdSession {
            guild_id,
            channel_id,
            call,
            live: None,
        })
    }

    async fn switch_channel(
        &self,
        session: &mut SongbirdSession,
        channel_id: u64,
    ) -> Result<(), VoiceError> {
        info!(
            guild_id = session.guild_id,
            from = session.channel_id,
            to = channel_id,
            "Switching voice channel"
        );
        let call = self
            .join(session.guild_id, channel_id)
            .await
            .map_err(|reason| VoiceError::Switch { channel_id, reason })?;

        session.call = call;
        session.channel_id = channel_id;
        Ok(())
    }

    async fn set_speaking(&self, session: &mut SongbirdSession, speaking: bool) {
        if speaking {
            if session.live.is_some() {
                return;
            }
            let (tx, rx) = mpsc::channel(self.config.buffer_frames.max(1));
            let mut hint = Hint::new();
            hint.with_extension("dca");

            let input = Input::Live(
                LiveInput::Raw(AudioStream {
                    input: Box::new(FrameFeed::new(rx)) as Box<dyn MediaSource>,
                    hint: Some(hint),
                }),
                None,
            );

            let track = session.call.lock().await.play_input(input);
            debug!(guild_id = session.guild_id, "Started live track");
            session.live = Some(LiveTrack { frames: tx, track });
        } else if let Some(LiveTrack { frames, track }) = session.live.take() {
            // Closing the channel ends the stream once buffered frames are read
            drop(frames);
            self.wait_for_drain(track).await;
            debug!(guild_id = session.guild_id, "Live track drained");
        }
    }

    async fn send_frame(&self, session: &mut SongbirdSession, frame: Bytes) -> Result<(), VoiceError> {
        let live = session
            .live
            .as_ref()
            .ok_or_else(|| VoiceError::Stream("not speaking".into()))?;

        let frame = dca::encode_frame(&frame).map_err(|e| VoiceError::Stream(e.to_string()))?;
        live.frames
            .send(frame)
            .await
            .map_err(|_| VoiceError::Stream("track closed by the voice driver".into()))
    }

    async fn disconnect(&self, mut session: SongbirdSession) {
        if let Some(live) = session.live.take() {
            if let Err(e) = live.track.stop() {
                debug!(error = ?e, "Track already stopped");
            }
        }

        info!(guild_id = session.guild_id, "Disconnecting voice session");
        let Some(guild) = NonZeroU64::new(session.guild_id).map(GuildId) else {
            return;
        };
        if let Err(e) = self.songbird.remove(guild).await {
            warn!(guild_id = session.guild_id, error = %e, "Failed to leave voice channel");
        }
    }
}

impl std::fmt::Debug for SongbirdTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SongbirdTransport")
            .field("config", &self.config)
            .finish()
    }
}

/// Blocking reader over the frame channel, read by songbird's mixer thread.
///
/// Yields the DCA1 header first, then each length-prefixed frame. EOF once
/// the sender is dropped and the channel is empty.
struct FrameFeed {
    pending: Bytes,
    frames: std::sync::Mutex<mpsc::Receiver<Bytes>>,
}

impl FrameFeed {
    fn new(frames: mpsc::Receiver<Bytes>) -> Self {
        Self {
            pending: dca::dca1_header(),
            frames: std::sync::Mutex::new(frames),
        }
    }
}

impl Read for FrameFeed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.pending.has_remaining() {
            let rx = self.frames.get_mut().unwrap_or_else(PoisonError::into_inner);
            match rx.blocking_recv() {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

impl Seek for FrameFeed {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "live frame feed is not seekable",
        ))
    }
}

impl MediaSource for FrameFeed {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}
