//! Voice session management.
//!
//! The playback worker talks to voice through the [`VoiceTransport`] trait.
//! In production that is [`SongbirdTransport`], which joins channels through
//! a shared songbird manager and streams Opus frames into a live track.
//!
//! ## Architecture
//!
//! ```text
//!  PlaybackWorker
//!        │ connect / switch_channel / set_speaking / send_frame / disconnect
//!        ▼
//! ┌───────────────────┐
//! │ SongbirdTransport │  ← one SongbirdSession per guild, owned by the worker
//! └─────────┬─────────┘
//!           │ DCA1 stream (Opus passthrough)
//!           ▼
//! ┌───────────────────┐
//! │     Songbird      │
//! │  (Call / mixer)   │
//! └─────────┬─────────┘
//!           ▼
//!   Discord Voice Channel
//! ```

pub mod driver;
pub mod transport;

pub use driver::{DriverConfig, SongbirdSession, SongbirdTransport};
pub use transport::{VoiceError, VoiceSession, VoiceTransport};
