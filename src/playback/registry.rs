//! Per-guild playback state and the registry that serialises requests.
//!
//! Each guild gets one slot, created on first use and never removed. All
//! check-and-act sequences on a slot run under its own async mutex, so guilds
//! never contend with each other.
//!
//! ```text
//!            submit                      backlog empty
//!   Idle ──────────────▶ Active ───────────────────────▶ IdleWait
//!    ▲                   │  ▲                               │  │
//!    │   abort / fail    │  └───────────── submit ──────────┘  │
//!    └───────────────────┘           (timer cancelled)         │
//!    └──────────────────────── idle timer fires ───────────────┘
//! ```

use super::request::PlayRequest;
use super::worker::PlaybackWorker;
use crate::audio::AudioSource;
use crate::bot::announce::Announcer;
use crate::config::PlaybackConfig;
use crate::stats::StatsSink;
use crate::voice::VoiceTransport;
use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Collaborators used by playback workers.
pub struct PlaybackServices<T: VoiceTransport> {
    pub transport: Arc<T>,
    pub audio: Arc<dyn AudioSource>,
    pub stats: Arc<dyn StatsSink>,
    pub announcer: Arc<dyn Announcer>,
}

impl<T: VoiceTransport> Clone for PlaybackServices<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            audio: Arc::clone(&self.audio),
            stats: Arc::clone(&self.stats),
            announcer: Arc::clone(&self.announcer),
        }
    }
}

/// Timing and sizing of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    pub backlog_capacity: usize,
    pub idle_timeout: Duration,
    pub channel_switch_settle: Duration,
    pub pre_play_delay: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for PlaybackSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            backlog_capacity: config.backlog_capacity,
            idle_timeout: config.idle_timeout(),
            channel_switch_settle: config.channel_switch_settle(),
            pre_play_delay: config.pre_play_delay(),
        }
    }
}

/// Result of [`GuildQueueRegistry::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Handed to a worker or queued behind the current one
    Accepted,
    /// Backlog was full (or the registry is shutting down)
    Dropped,
}

/// Result of [`GuildQueueRegistry::mark_idle`].
#[derive(Debug)]
pub enum IdleOutcome<S> {
    /// A request arrived before the worker went idle; keep playing
    Resume(PlayRequest, S),
    /// Session parked and the idle timer armed
    Parked,
    /// Registry is shutting down; session was disconnected
    Released,
}

/// Coarse phase of a guild, for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Active,
    IdleWait,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Idle => write!(f, "idle"),
            PhaseKind::Active => write!(f, "playing"),
            PhaseKind::IdleWait => write!(f, "connected, idle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildStatus {
    pub guild_id: u64,
    pub phase: PhaseKind,
    pub backlog_len: usize,
}

enum Phase<S> {
    Idle,
    Active,
    IdleWait {
        session: S,
        timer: JoinHandle<()>,
        generation: u64,
    },
}

impl<S> Phase<S> {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::Active => PhaseKind::Active,
            Phase::IdleWait { .. } => PhaseKind::IdleWait,
        }
    }
}

struct GuildPlaybackState<S> {
    backlog: VecDeque<PlayRequest>,
    phase: Phase<S>,
    /// Bumped every time an idle timer is armed or cancelled
    generation: u64,
}

impl<S> GuildPlaybackState<S> {
    fn new(backlog_capacity: usize) -> Self {
        Self {
            backlog: VecDeque::with_capacity(backlog_capacity),
            phase: Phase::Idle,
            generation: 0,
        }
    }
}

type Slot<S> = Arc<Mutex<GuildPlaybackState<S>>>;

/// Owns the playback state of every guild.
pub struct GuildQueueRegistry<T: VoiceTransport> {
    guilds: DashMap<u64, Slot<T::Session>>,
    services: PlaybackServices<T>,
    settings: PlaybackSettings,
    closed: AtomicBool,
    workers_spawned: AtomicU64,
}

impl<T: VoiceTransport> GuildQueueRegistry<T> {
    pub fn new(services: PlaybackServices<T>, settings: PlaybackSettings) -> Arc<Self> {
        Arc::new(Self {
            guilds: DashMap::new(),
            services,
            settings,
            closed: AtomicBool::new(false),
            workers_spawned: AtomicU64::new(0),
        })
    }

    pub fn services(&self) -> &PlaybackServices<T> {
        &self.services
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Total workers started since creation.
    pub fn workers_spawned(&self) -> u64 {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    fn slot(&self, guild_id: u64) -> Slot<T::Session> {
        // The shard lock is released before the slot is locked
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(GuildPlaybackState::new(
                    self.settings.backlog_capacity,
                )))
            })
            .clone()
    }

    fn existing_slot(&self, guild_id: u64) -> Option<Slot<T::Session>> {
        self.guilds.get(&guild_id).map(|slot| slot.clone())
    }

    fn all_slots(&self) -> Vec<(u64, Slot<T::Session>)> {
        self.guilds
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Start, queue or drop a request for its guild.
    pub async fn submit(self: &Arc<Self>, request: PlayRequest) -> SubmitOutcome {
        if self.closed.load(Ordering::Acquire) {
            return SubmitOutcome::Dropped;
        }

        let guild_id = request.guild_id;
        let slot = self.slot(guild_id);
        let mut state = slot.lock().await;

        match std::mem::replace(&mut state.phase, Phase::Active) {
            Phase::Idle => {
                debug!(guild_id, request_id = %request.id, "Starting worker");
                self.spawn_worker(request, None);
                SubmitOutcome::Accepted
            }
            Phase::Active => {
                if state.backlog.len() < self.settings.backlog_capacity {
                    state.backlog.push_back(request);
                    debug!(guild_id, backlog = state.backlog.len(), "Queued request");
                    SubmitOutcome::Accepted
                } else {
                    debug!(guild_id, request_id = %request.id, "Backlog full, dropping request");
                    SubmitOutcome::Dropped
                }
            }
            Phase::IdleWait { session, timer, .. } => {
                // A timer that already fired is parked on this lock; the
                // generation bump makes it a no-op
                timer.abort();
                state.generation += 1;
                debug!(guild_id, request_id = %request.id, "Idle timer cancelled, reusing session");
                self.spawn_worker(request, Some(session));
                SubmitOutcome::Accepted
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, request: PlayRequest, session: Option<T::Session>) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
        let guild_id = request.guild_id;
        let registry = Arc::clone(self);
        let worker = PlaybackWorker::new(Arc::clone(self), guild_id);
        tokio::spawn(async move {
            // A panicking transport must not leave the guild stuck in Active
            let run = AssertUnwindSafe(worker.run(request, session)).catch_unwind();
            if run.await.is_err() {
                error!(guild_id, "Playback worker panicked, resetting guild");
                registry.abort(guild_id, None).await;
            }
        });
    }

    /// Pop the oldest queued request.
    pub async fn drain_next(&self, guild_id: u64) -> Option<PlayRequest> {
        let slot = self.existing_slot(guild_id)?;
        let next = slot.lock().await.backlog.pop_front();
        next
    }

    /// Called by a worker whose backlog looked empty.
    ///
    /// The final backlog check and the transition to `IdleWait` happen under
    /// one lock, so a request queued in between is handed back as
    /// [`IdleOutcome::Resume`].
    pub async fn mark_idle(self: &Arc<Self>, guild_id: u64, session: T::Session) -> IdleOutcome<T::Session> {
        let slot = self.slot(guild_id);
        let mut state = slot.lock().await;

        if let Some(next) = state.backlog.pop_front() {
            return IdleOutcome::Resume(next, session);
        }

        if self.closed.load(Ordering::Acquire) {
            state.phase = Phase::Idle;
            self.services.transport.disconnect(session).await;
            return IdleOutcome::Released;
        }

        state.generation += 1;
        let generation = state.generation;
        let timer = self.spawn_idle_timer(guild_id, generation);
        state.phase = Phase::IdleWait {
            session,
            timer,
            generation,
        };
        debug!(
            guild_id,
            timeout_secs = self.settings.idle_timeout.as_secs(),
            "Armed idle timer"
        );
        IdleOutcome::Parked
    }

    fn spawn_idle_timer(self: &Arc<Self>, guild_id: u64, generation: u64) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let timeout = self.settings.idle_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(registry) = registry.upgrade() {
                registry.release_idle(guild_id, generation).await;
            }
        })
    }

    async fn release_idle(&self, guild_id: u64, generation: u64) {
        let Some(slot) = self.existing_slot(guild_id) else {
            return;
        };
        let mut state = slot.lock().await;

        let current = matches!(
            state.phase,
            Phase::IdleWait { generation: armed, .. } if armed == generation
        );
        if !current {
            debug!(guild_id, generation, "Stale idle timer ignored");
            return;
        }

        if let Phase::IdleWait { session, .. } = std::mem::replace(&mut state.phase, Phase::Idle) {
            state.backlog.clear();
            info!(guild_id, "Idle timeout, leaving voice channel");
            // Disconnect under the lock so a new submit cannot race the leave
            self.services.transport.disconnect(session).await;
        }
    }

    /// Tear down after a failed worker: drop the backlog, go idle and release
    /// any partially acquired session.
    pub async fn abort(&self, guild_id: u64, session: Option<T::Session>) {
        let slot = self.slot(guild_id);
        let mut state = slot.lock().await;

        let dropped = state.backlog.len();
        state.backlog.clear();
        state.phase = Phase::Idle;
        if dropped > 0 {
            warn!(guild_id, dropped, "Cleared backlog after playback failure");
        }

        if let Some(session) = session {
            self.services.transport.disconnect(session).await;
        }
    }

    pub async fn status(&self, guild_id: u64) -> GuildStatus {
        match self.existing_slot(guild_id) {
            Some(slot) => {
                let state = slot.lock().await;
                GuildStatus {
                    guild_id,
                    phase: state.phase.kind(),
                    backlog_len: state.backlog.len(),
                }
            }
            None => GuildStatus {
                guild_id,
                phase: PhaseKind::Idle,
                backlog_len: 0,
            },
        }
    }

    /// Status of every guild that has ever submitted, ordered by guild id.
    pub async fn snapshot(&self) -> Vec<GuildStatus> {
        let mut statuses = Vec::new();
        for (guild_id, slot) in self.all_slots() {
            let state = slot.lock().await;
            statuses.push(GuildStatus {
                guild_id,
                phase: state.phase.kind(),
                backlog_len: state.backlog.len(),
            });
        }
        statuses.sort_by_key(|s| s.guild_id);
        statuses
    }

    /// Guilds with a worker currently playing.
    pub async fn active_guilds(&self) -> Vec<u64> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|s| s.phase == PhaseKind::Active)
            .map(|s| s.guild_id)
            .collect()
    }

    /// Stop accepting requests, cancel idle timers and leave every parked
    /// voice channel. Workers that are playing finish their current chain and
    /// disconnect instead of parking.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);

        let releases = self.all_slots().into_iter().map(|(guild_id, slot)| async move {
            let mut state = slot.lock().await;
            state.backlog.clear();
            if !matches!(state.phase, Phase::IdleWait { .. }) {
                return false;
            }
            if let Phase::IdleWait { session, timer, .. } =
                std::mem::replace(&mut state.phase, Phase::Idle)
            {
                timer.abort();
                state.generation += 1;
                debug!(guild_id, "Releasing parked session");
                self.services.transport.disconnect(session).await;
            }
            true
        });

        let released = join_all(releases).await.into_iter().filter(|r| *r).count();
        info!(released, "Playback registry shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<T: VoiceTransport> std::fmt::Debug for GuildQueueRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildQueueRegistry")
            .field("guilds", &self.guilds.len())
            .field("settings", &self.settings)
            .field("workers_spawned", &self.workers_spawned())
            .field("closed", &self.is_closed())
            .finish()
    }
}
