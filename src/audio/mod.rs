//! Audio payloads: pre-encoded Opus frames ready for the voice transport.
//!
//! Nothing here transcodes. Clips are stored as DCA files (length-prefixed
//! Opus frames) and loaded as-is.

pub mod cache;
pub mod dca;

pub use cache::{ClipCacheStats, ClipLoader};

use crate::sound::Sound;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Duration of one Opus frame as produced for Discord voice.
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// A finite, ordered sequence of encoded audio frames.
///
/// Cheap to clone and can be iterated from the start any number of times.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    frames: Arc<[Bytes]>,
}

impl AudioClip {
    pub fn new(frames: Vec<Bytes>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = &Bytes> + '_ {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Nominal playback length.
    pub fn duration(&self) -> Duration {
        FRAME_DURATION * self.frames.len() as u32
    }

    /// Total encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(Bytes::len).sum()
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("frames", &self.frames.len())
            .field("bytes", &self.byte_len())
            .finish()
    }
}

/// Opens the audio payload of a sound.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn open(&self, sound: &Sound) -> Result<AudioClip, AudioError>;
}

/// Errors raised while loading a clip.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid DCA header: {0}")]
    InvalidHeader(String),

    #[error("Invalid frame length {length} at byte {offset}")]
    InvalidFrame { offset: usize, length: i16 },

    #[error("Clip contains no audio frames")]
    NoFrames,

    #[error("Frame of {0} bytes exceeds the DCA length prefix")]
    FrameTooLarge(usize),

    #[error("No sound named {0}")]
    NotFound(String),

    #[error("Unknown sound provider: {0}")]
    UnknownProvider(String),
}
