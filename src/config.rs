use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Discord bot configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied as `AIRHORN_DISCORD__TOKEN`.
    #[serde(default)]
    pub token: String,
    /// User allowed to run owner-only commands
    #[serde(default)]
    pub owner_id: Option<u64>,
    /// Prefix for message-triggered commands
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_command_prefix() -> String {
    "!".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner_id: None,
            command_prefix: default_command_prefix(),
        }
    }
}

/// Orchestrator tuning
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Pending requests kept per guild while one is playing
    #[serde(default = "default_backlog_capacity")]
    pub backlog_capacity: usize,
    /// Seconds an unused voice connection is kept open
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Pause after moving to another voice channel
    #[serde(default = "default_channel_switch_settle_ms")]
    pub channel_switch_settle_ms: u64,
    /// Pause between joining and the first frame
    #[serde(default = "default_pre_play_delay_ms")]
    pub pre_play_delay_ms: u64,
    /// Longest chain `/bomb` may build
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
    /// Fixed selector seed, random when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_backlog_capacity() -> usize {
    5
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_channel_switch_settle_ms() -> u64 {
    125
}

fn default_pre_play_delay_ms() -> u64 {
    32
}

fn default_max_chain_length() -> usize {
    10
}

impl PlaybackConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn channel_switch_settle(&self) -> Duration {
        Duration::from_millis(self.channel_switch_settle_ms)
    }

    pub fn pre_play_delay(&self) -> Duration {
        Duration::from_millis(self.pre_play_delay_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backlog_capacity: default_backlog_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            channel_switch_settle_ms: default_channel_switch_settle_ms(),
            pre_play_delay_ms: default_pre_play_delay_ms(),
            max_chain_length: default_max_chain_length(),
            rng_seed: None,
        }
    }
}

/// Clip storage
#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    /// Directory holding the built-in `<name>.dca` clips
    #[serde(default = "default_sound_dir")]
    pub sound_dir: PathBuf,
    /// Decoded clips kept in memory
    #[serde(default = "default_clip_cache_size")]
    pub clip_cache_size: usize,
}

fn default_sound_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_clip_cache_size() -> usize {
    64
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sound_dir: default_sound_dir(),
            clip_cache_size: default_clip_cache_size(),
        }
    }
}

/// A directory provider: serves `<dir>/<command>.dca`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub name: String,
    pub dir: PathBuf,
}

/// A sound available only in one guild.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct GuildSoundConfig {
    pub guild_id: u64,
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub commands: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Relative paths are resolved against `audio.sound_dir`
    pub file: PathBuf,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_weight() -> u32 {
    1
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub guild_sounds: Vec<GuildSoundConfig>,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. AIRHORN_DISCORD__TOKEN, AIRHORN_PLAYBACK__IDLE_TIMEOUT_SECS
            .add_source(
                Environment::with_prefix("AIRHORN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse a TOML document on its own, without files or environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Initialize the global config singleton
    pub fn init() -> Result<&'static Self, ConfigError> {
        let config = Self::load()?;
        Ok(CONFIG.get_or_init(|| config))
    }

    /// Get the global config, if [`AppConfig::init`] has run
    pub fn get() -> Result<&'static Self, ConfigError> {
        CONFIG
            .get()
            .ok_or_else(|| ConfigError::Message("config not initialized".into()))
    }
}
