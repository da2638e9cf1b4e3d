//! Sound model, catalogs and weighted selection.
//!
//! A command such as `!airhorn` resolves to a set of candidate [`Sound`]s
//! drawn from three catalogs, concatenated in this order:
//!
//! ```text
//!   DefaultCatalog    built-in clips shipped with the bot
//!         +
//!   GuildCatalog      per-guild clips from configuration
//!         +
//!   ProviderRegistry  statically registered providers (e.g. a directory)
//!         │
//!         ▼
//!   WeightedSelector  picks one candidate proportional to its weight
//! ```

pub mod catalog;
pub mod provider;
pub mod selector;

pub use catalog::{DefaultCatalog, GuildCatalog, SoundCatalog, SoundResolver};
pub use provider::{DirectoryProvider, ProviderRegistry, SoundProvider};
pub use selector::{pick_weighted, WeightedSelector};

use std::path::PathBuf;

/// Where the audio payload of a sound lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioRef {
    /// A DCA file on disk
    File(PathBuf),
    /// Frames served by a registered provider, keyed by provider name
    Provider(String),
}

/// A playable clip. Immutable once resolved; shared as `Arc<Sound>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    /// Opaque id for guild-uploaded sounds, `None` for built-in ones
    pub id: Option<String>,
    /// Well-known name, unique within its catalog
    pub name: String,
    /// Audio payload reference
    pub audio: AudioRef,
    /// Relative likelihood of being picked (always >= 1)
    pub weight: u32,
    /// Commands that trigger this sound, without prefix
    pub commands: Vec<String>,
    /// Message posted to the origin text channel before playing
    pub message: Option<String>,
}

impl Sound {
    /// Create a sound. A weight of zero is raised to one.
    pub fn new(name: impl Into<String>, audio: AudioRef, weight: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            audio,
            weight: weight.max(1),
            commands: Vec::new(),
            message: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into().to_lowercase());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether `command` (already lower-cased, no prefix) triggers this sound.
    pub fn responds_to(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }

    /// Key used by the stats sidecar: the id for uploaded sounds, the name otherwise.
    pub fn stats_key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}
