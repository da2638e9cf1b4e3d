//! Clip loader with an LRU cache of decoded DCA files.
//!
//! The same handful of clips is played over and over (`!airhorn`), so
//! decoded frames are kept keyed by file path.

use super::{dca, AudioClip, AudioError, AudioSource};
use crate::sound::{AudioRef, ProviderRegistry, Sound};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => unreachable!(),
};

/// Loads clips from disk or from a provider.
pub struct ClipLoader {
    cache: Mutex<LruCache<PathBuf, AudioClip>>,
    providers: Arc<ProviderRegistry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ClipLoader {
    /// Create a loader caching up to `capacity` file clips (0 falls back to 64).
    pub fn new(capacity: usize, providers: Arc<ProviderRegistry>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            providers,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    async fn open_file(&self, path: &Path) -> Result<AudioClip, AudioError> {
        if let Some(clip) = self.cache.lock().await.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path.display(), "Clip cache HIT");
            return Ok(clip.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Read without holding the cache lock; a concurrent miss on the same
        // path just decodes twice.
        let data = tokio::fs::read(path).await.map_err(|source| AudioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let clip = dca::decode(data.into())?;
        debug!(
            path = %path.display(),
            frames = clip.len(),
            duration_ms = clip.duration().as_millis() as u64,
            "Decoded clip"
        );

        self.cache.lock().await.put(path.to_path_buf(), clip.clone());
        Ok(clip)
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub fn stats(&self) -> ClipCacheStats {
        ClipCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl AudioSource for ClipLoader {
    async fn open(&self, sound: &Sound) -> Result<AudioClip, AudioError> {
        match &sound.audio {
            AudioRef::File(path) => self.open_file(path).await,
            AudioRef::Provider(name) => self.providers.load(name, sound).await,
        }
    }
}

impl std::fmt::Debug for ClipLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipLoader")
            .field("stats", &self.stats())
            .field("providers", &self.providers)
            .finish()
    }
}

/// Clip cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipCacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl std::fmt::Display for ClipCacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hits: {}, Misses: {}", self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::DirectoryProvider;

    fn write_dca(path: &Path, frames: &[&[u8]]) {
        let data: Vec<u8> = frames.iter().flat_map(|f| dca::encode_frame(f).unwrap()).collect();
        std::fs::write(path, data).unwrap();
    }

    #[tokio::test]
    async fn test_file_clip_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horn.dca");
        write_dca(&path, &[b"a", b"b", b"c"]);

        let loader = ClipLoader::new(4, Arc::new(ProviderRegistry::new()));
        let sound = Sound::new("horn", AudioRef::File(path.clone()), 1);

        let first = loader.open(&sound).await.unwrap();
        // Removing the file proves the second open is served from cache
        std::fs::remove_file(&path).unwrap();
        let second = loader.open(&sound).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(loader.stats(), ClipCacheStats { hits: 1, misses: 1 });
        assert_eq!(loader.len().await, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ClipLoader::new(2, Arc::new(ProviderRegistry::new()));

        for name in ["one", "two", "three"] {
            let path = dir.path().join(format!("{name}.dca"));
            write_dca(&path, &[name.as_bytes()]);
            loader
                .open(&Sound::new(name, AudioRef::File(path), 1))
                .await
                .unwrap();
        }

        assert_eq!(loader.len().await, 2);
        loader.clear().await;
        assert!(loader.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let loader = ClipLoader::new(4, Arc::new(ProviderRegistry::new()));
        let sound = Sound::new("ghost", AudioRef::File("/nonexistent/ghost.dca".into()), 1);
        let err = loader.open(&sound).await.unwrap_err();
        assert!(matches!(err, AudioError::Io { .. }));
    }

    #[tokio::test]
    async fn test_provider_sound_goes_to_registry() {
        let dir = tempfile::tempdir().unwrap();
        write_dca(&dir.path().join("quack.dca"), &[b"q1", b"q2"]);

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(DirectoryProvider::new("ducks", dir.path())));
        let loader = ClipLoader::new(4, Arc::new(providers));

        let sound = Sound::new("quack", AudioRef::Provider("ducks".into()), 1);
        let clip = loader.open(&sound).await.unwrap();
        assert_eq!(clip.len(), 2);
        // Provider clips are not cached
        assert!(loader.is_empty().await);
    }
}
