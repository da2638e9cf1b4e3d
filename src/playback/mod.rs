//! Guild playback orchestration.
//!
//! Serialises play requests per guild into a single voice session:
//!
//! ```text
//!   command ──▶ SoundDispatcher ──▶ GuildQueueRegistry ──▶ PlaybackWorker ──▶ VoiceTransport
//!                (resolve, select,     (one slot per guild,   (one per active
//!                 build request)        bounded backlog,        guild)
//!                                       idle timer)
//! ```

pub mod dispatch;
pub mod error;
pub mod registry;
pub mod request;
mod worker;

pub use dispatch::{Dispatched, Selection, SoundDispatcher};
pub use error::{PlayError, PlayResult};
pub use registry::{
    GuildQueueRegistry, GuildStatus, IdleOutcome, PhaseKind, PlaybackServices, PlaybackSettings,
    SubmitOutcome,
};
pub use request::{PlayInvocation, PlayRequest, PlayRequestBuilder};
