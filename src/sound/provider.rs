//! Statically registered sound providers.
//!
//! A provider claims commands at lookup time and serves the frames for them.
//! Providers are compiled in and registered from configuration; nothing is
//! loaded at runtime.

use super::{AudioRef, Sound};
use crate::audio::{dca, AudioClip, AudioError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A source of sounds that decides per command whether it can serve it.
#[async_trait]
pub trait SoundProvider: Send + Sync {
    /// Unique provider name, referenced by [`AudioRef::Provider`].
    fn name(&self) -> &str;

    /// Whether this provider has a sound for `command`.
    async fn handles(&self, command: &str) -> bool;

    /// Load the frames for `command`.
    async fn load(&self, command: &str) -> Result<AudioClip, AudioError>;
}

/// Serves `<dir>/<command>.dca` for any command with a matching file.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    name: String,
    dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn clip_path(&self, command: &str) -> Option<PathBuf> {
        // Commands come straight from chat; keep them inside `dir`.
        let valid = !command.is_empty()
            && command
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.dir.join(format!("{command}.dca")))
    }
}

#[async_trait]
impl SoundProvider for DirectoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handles(&self, command: &str) -> bool {
        let Some(path) = self.clip_path(command) else {
            return false;
        };
        tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn load(&self, command: &str) -> Result<AudioClip, AudioError> {
        let path = self
            .clip_path(command)
            .ok_or_else(|| AudioError::NotFound(command.to_string()))?;
        let data = tokio::fs::read(&path).await.map_err(|source| AudioError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(provider = %self.name, path = %path.display(), "Loaded provider clip");
        dca::decode(data.into())
    }
}

/// Registry of all providers, consulted in registration order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn SoundProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Lookups by name return the first one registered.
    pub fn register(&mut self, provider: Arc<dyn SoundProvider>) {
        info!(provider = provider.name(), "Registered sound provider");
        self.providers.push(provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SoundProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// One weight-1 candidate per provider that handles `command`.
    pub async fn candidates(&self, command: &str) -> Vec<Arc<Sound>> {
        let mut sounds = Vec::new();
        for provider in &self.providers {
            if provider.handles(command).await {
                sounds.push(Arc::new(
                    Sound::new(command, AudioRef::Provider(provider.name().to_string()), 1)
                        .with_command(command),
                ));
            }
        }
        sounds
    }

    /// Load `sound` from the provider it references.
    pub async fn load(&self, provider: &str, sound: &Sound) -> Result<AudioClip, AudioError> {
        let provider = self
            .get(provider)
            .ok_or_else(|| AudioError::UnknownProvider(provider.to_string()))?;
        provider.load(&sound.name).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}
