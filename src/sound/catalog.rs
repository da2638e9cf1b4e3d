//! Sound catalogs and the resolver that unions them.

use super::{AudioRef, ProviderRegistry, Sound};
use crate::config::GuildSoundConfig;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves a chat command to its candidate sounds for a guild.
#[async_trait]
pub trait SoundResolver: Send + Sync {
    /// Ordered candidates for `command` (lower-cased, no prefix). Empty when nothing matches.
    async fn resolve(&self, guild_id: u64, command: &str) -> Vec<Arc<Sound>>;
}

/// Built-in sounds: (name, weight, command).
const DEFAULT_SOUNDS: &[(&str, u32, &str)] = &[
    ("airhorn_default", 1000, "airhorn"),
    ("airhorn_reverb", 800, "airhorn"),
    ("airhorn_spam", 800, "airhorn"),
    ("airhorn_tripletap", 800, "airhorn"),
    ("airhorn_fourtap", 800, "airhorn"),
    ("airhorn_distant", 500, "airhorn"),
    ("airhorn_echo", 500, "airhorn"),
    ("airhorn_clownfull", 250, "airhorn"),
    ("airhorn_clownshort", 250, "airhorn"),
    ("airhorn_clownspam", 250, "airhorn"),
    ("airhorn_highfartlong", 200, "airhorn"),
    ("airhorn_highfartshort", 200, "airhorn"),
    ("airhorn_midshort", 100, "airhorn"),
    ("airhorn_truck", 10, "airhorn"),
    ("another_one", 1, "anotha"),
    ("another_one_classic", 1, "anotha"),
    ("another_one_echo", 1, "anotha"),
    ("jc_realfull", 1, "cena"),
    ("cow_herd", 10, "stan"),
    ("cow_moo", 10, "stan"),
    ("cow_x3", 1, "stan"),
    ("birthday_horn", 50, "bday"),
    ("birthday_horn3", 30, "bday"),
    ("birthday_sadhorn", 25, "bday"),
    ("birthday_weakhorn", 25, "bday"),
    ("wow_thatscool", 1, "wtc"),
];

/// Sounds available to every guild, stored as `<sound_dir>/<name>.dca`.
#[derive(Debug, Clone)]
pub struct DefaultCatalog {
    sounds: Vec<Arc<Sound>>,
}

impl DefaultCatalog {
    pub fn new(sound_dir: &Path) -> Self {
        let sounds = DEFAULT_SOUNDS
            .iter()
            .map(|&(name, weight, command)| {
                let path = sound_dir.join(format!("{name}.dca"));
                Arc::new(Sound::new(name, AudioRef::File(path), weight).with_command(command))
            })
            .collect();
        Self { sounds }
    }

    pub fn sounds(&self) -> &[Arc<Sound>] {
        &self.sounds
    }

    pub fn filter(&self, command: &str) -> Vec<Arc<Sound>> {
        filter_by_command(&self.sounds, command)
    }
}

/// Guild-specific sounds, keyed by guild id.
#[derive(Debug, Clone, Default)]
pub struct GuildCatalog {
    guilds: HashMap<u64, Vec<Arc<Sound>>>,
}

impl GuildCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration. Relative file paths are resolved against `sound_dir`.
    pub fn from_config(entries: &[GuildSoundConfig], sound_dir: &Path) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            let path = if entry.file.is_absolute() {
                entry.file.clone()
            } else {
                sound_dir.join(&entry.file)
            };

            let mut sound = Sound::new(&entry.name, AudioRef::File(path), entry.weight);
            if let Some(id) = &entry.id {
                sound = sound.with_id(id);
            }
            if let Some(message) = &entry.message {
                sound = sound.with_message(message);
            }
            for command in &entry.commands {
                sound = sound.with_command(command);
            }
            catalog.insert(entry.guild_id, sound);
        }
        catalog
    }

    pub fn insert(&mut self, guild_id: u64, sound: Sound) {
        self.guilds.entry(guild_id).or_default().push(Arc::new(sound));
    }

    pub fn sounds(&self, guild_id: u64) -> &[Arc<Sound>] {
        self.guilds.get(&guild_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn filter(&self, guild_id: u64, command: &str) -> Vec<Arc<Sound>> {
        filter_by_command(self.sounds(guild_id), command)
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

/// Union of the default, guild and provider catalogs.
#[derive(Debug, Clone)]
pub struct SoundCatalog {
    defaults: DefaultCatalog,
    guilds: GuildCatalog,
    providers: Arc<ProviderRegistry>,
}

impl SoundCatalog {
    pub fn new(
        defaults: DefaultCatalog,
        guilds: GuildCatalog,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        info!(
            default_sounds = defaults.sounds().len(),
            guilds = guilds.guild_count(),
            providers = providers.len(),
            "Sound catalog ready"
        );
        Self {
            defaults,
            guilds,
            providers,
        }
    }

    pub fn providers(&self) -> Arc<ProviderRegistry> {
        Arc::clone(&self.providers)
    }

    /// Every command with at least one static sound in this guild, sorted.
    pub fn commands(&self, guild_id: u64) -> Vec<String> {
        self.defaults
            .sounds()
            .iter()
            .chain(self.guilds.sounds(guild_id))
            .flat_map(|s| s.commands.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolve without going through the trait object.
    pub async fn lookup(&self, guild_id: u64, command: &str) -> Vec<Arc<Sound>> {
        let mut sounds = self.defaults.filter(command);
        sounds.extend(self.guilds.filter(guild_id, command));
        sounds.extend(self.providers.candidates(command).await);
        debug!(guild_id, command, candidates = sounds.len(), "Resolved command");
        sounds
    }
}

#[async_trait]
impl SoundResolver for SoundCatalog {
    async fn resolve(&self, guild_id: u64, command: &str) -> Vec<Arc<Sound>> {
        self.lookup(guild_id, command).await
    }
}

fn filter_by_command(sounds: &[Arc<Sound>], command: &str) -> Vec<Arc<Sound>> {
    sounds
        .iter()
        .filter(|s| s.responds_to(command))
        .cloned()
        .collect()
}
