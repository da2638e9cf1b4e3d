//! Test doubles for the playback orchestrator.
#![allow(dead_code)]

use airhorn::audio::{AudioClip, AudioError, AudioSource};
use airhorn::bot::announce::{AnnounceError, Announcer};
use airhorn::playback::{
    GuildQueueRegistry, GuildStatus, PhaseKind, PlayRequest, PlaybackServices, PlaybackSettings,
};
use airhorn::sound::{AudioRef, Sound};
use airhorn::stats::{PlayRecord, StatsError, StatsSink};
use airhorn::voice::{VoiceError, VoiceSession, VoiceTransport};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Everything the mock transport was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect { guild_id: u64, channel_id: u64 },
    Switch { guild_id: u64, channel_id: u64 },
    SpeakingOn { guild_id: u64 },
    Frame { guild_id: u64, frame: String },
    SpeakingOff { guild_id: u64 },
    Disconnect { guild_id: u64, channel_id: u64 },
}

#[derive(Debug)]
pub struct MockSession {
    guild_id: u64,
    channel_id: u64,
}

impl VoiceSession for MockSession {
    fn guild_id(&self) -> u64 {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        self.channel_id
    }
}

#[derive(Default)]
struct Concurrency {
    speaking: HashMap<u64, usize>,
    sessions: HashMap<u64, usize>,
    max_speaking: usize,
    max_sessions: usize,
}

/// Voice transport that records calls and can be told to block or fail.
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<Vec<Event>>,
    concurrency: Mutex<Concurrency>,
    /// When set, every frame waits for a permit
    frame_gate: Option<Arc<Semaphore>>,
    connect_delay: Duration,
    fail_connects: AtomicUsize,
    fail_switches: AtomicUsize,
    panic_connects: AtomicUsize,
    /// Frames with this payload fail to send
    fail_frame: Mutex<Option<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block frames until permits are added to the returned semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Self {
            frame_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (transport, gate)
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.fail_connects.store(count, Ordering::SeqCst);
    }

    pub fn panic_next_connects(&self, count: usize) {
        self.panic_connects.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_switches(&self, count: usize) {
        self.fail_switches.store(count, Ordering::SeqCst);
    }

    pub fn fail_on_frame(&self, frame: &str) {
        *self.fail_frame.lock().unwrap() = Some(frame.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }

    pub fn connects(&self) -> usize {
        self.count(|e| matches!(e, Event::Connect { .. }))
    }

    pub fn switches(&self) -> usize {
        self.count(|e| matches!(e, Event::Switch { .. }))
    }

    pub fn disconnects(&self) -> usize {
        self.count(|e| matches!(e, Event::Disconnect { .. }))
    }

    /// Sounds whose first frame was sent, in order.
    pub fn played(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Frame { frame, .. } => frame.strip_suffix("#0").map(str::to_string),
                _ => None,
            })
            .collect()
    }

    pub fn max_concurrent_speaking(&self) -> usize {
        self.concurrency.lock().unwrap().max_speaking
    }

    pub fn max_concurrent_sessions(&self) -> usize {
        self.concurrency.lock().unwrap().max_sessions
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    type Session = MockSession;

    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<MockSession, VoiceError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if Self::take_failure(&self.panic_connects) {
            panic!("voice driver crashed while connecting to guild {guild_id}");
        }
        if Self::take_failure(&self.fail_connects) {
            return Err(VoiceError::Connect {
                guild_id,
                channel_id,
                reason: "injected".into(),
            });
        }

        self.record(Event::Connect {
            guild_id,
            channel_id,
        });
        let mut c = self.concurrency.lock().unwrap();
        let open = c.sessions.entry(guild_id).or_insert(0);
        *open += 1;
        let open = *open;
        c.max_sessions = c.max_sessions.max(open);
        Ok(MockSession {
            guild_id,
            channel_id,
        })
    }

    async fn switch_channel(
        &self,
        session: &mut MockSession,
        channel_id: u64,
    ) -> Result<(), VoiceError> {
        if Self::take_failure(&self.fail_switches) {
            return Err(VoiceError::Switch {
                channel_id,
                reason: "injected".into(),
            });
        }
        self.record(Event::Switch {
            guild_id: session.guild_id,
            channel_id,
        });
        session.channel_id = channel_id;
        Ok(())
    }

    async fn set_speaking(&self, session: &mut MockSession, speaking: bool) {
        let guild_id = session.guild_id;
        let mut c = self.concurrency.lock().unwrap();
        let now = c.speaking.entry(guild_id).or_insert(0);
        if speaking {
            *now += 1;
        } else {
            *now = now.saturating_sub(1);
        }
        let now = *now;
        c.max_speaking = c.max_speaking.max(now);
        drop(c);

        self.record(if speaking {
            Event::SpeakingOn { guild_id }
        } else {
            Event::SpeakingOff { guild_id }
        });
    }

    async fn send_frame(&self, session: &mut MockSession, frame: Bytes) -> Result<(), VoiceError> {
        if let Some(gate) = &self.frame_gate {
            gate.acquire()
                .await
                .map_err(|_| VoiceError::Stream("gate closed".into()))?
                .forget();
        }

        let frame = String::from_utf8_lossy(&frame).into_owned();
        if self.fail_frame.lock().unwrap().as_deref() == Some(frame.as_str()) {
            return Err(VoiceError::Stream("injected".into()));
        }
        self.record(Event::Frame {
            guild_id: session.guild_id,
            frame,
        });
        Ok(())
    }

    async fn disconnect(&self, session: MockSession) {
        self.record(Event::Disconnect {
            guild_id: session.guild_id,
            channel_id: session.channel_id,
        });
        let mut c = self.concurrency.lock().unwrap();
        if let Some(open) = c.sessions.get_mut(&session.guild_id) {
            *open = open.saturating_sub(1);
        }
    }
}

/// Clips of three frames named `<sound>#<n>`. Sounds named `missing*` fail.
#[derive(Debug, Default)]
pub struct MockAudio;

#[async_trait]
impl AudioSource for MockAudio {
    async fn open(&self, sound: &Sound) -> Result<AudioClip, AudioError> {
        if sound.name.starts_with("missing") {
            return Err(AudioError::NotFound(sound.name.clone()));
        }
        Ok(AudioClip::new(
            (0..3)
                .map(|i| Bytes::from(format!("{}#{}", sound.name, i)))
                .collect(),
        ))
    }
}

#[derive(Debug, Default)]
pub struct RecordingStats {
    records: Mutex<Vec<PlayRecord>>,
}

impl RecordingStats {
    pub fn sounds(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.sound.clone())
            .collect()
    }
}

#[async_trait]
impl StatsSink for RecordingStats {
    async fn record(&self, play: &PlayRecord) -> Result<(), StatsError> {
        self.records.lock().unwrap().push(play.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FailingStats;

#[async_trait]
impl StatsSink for FailingStats {
    async fn record(&self, _play: &PlayRecord) -> Result<(), StatsError> {
        Err(StatsError::Unavailable("injected".into()))
    }
}

#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    messages: Mutex<Vec<(u64, String)>>,
}

impl RecordingAnnouncer {
    pub fn messages(&self) -> Vec<(u64, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, text_channel_id: u64, message: &str) -> Result<(), AnnounceError> {
        self.messages
            .lock()
            .unwrap()
            .push((text_channel_id, message.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub registry: Arc<GuildQueueRegistry<MockTransport>>,
    pub transport: Arc<MockTransport>,
    pub stats: Arc<RecordingStats>,
    pub announcer: Arc<RecordingAnnouncer>,
}

pub fn settings() -> PlaybackSettings {
    PlaybackSettings {
        backlog_capacity: 5,
        idle_timeout: Duration::from_secs(300),
        channel_switch_settle: Duration::from_millis(125),
        pre_play_delay: Duration::from_millis(32),
    }
}

pub fn harness(transport: MockTransport) -> Harness {
    harness_with(transport, settings())
}

pub fn harness_with(transport: MockTransport, settings: PlaybackSettings) -> Harness {
    let transport = Arc::new(transport);
    let stats = Arc::new(RecordingStats::default());
    let announcer = Arc::new(RecordingAnnouncer::default());
    let services = PlaybackServices {
        transport: Arc::clone(&transport),
        audio: Arc::new(MockAudio),
        stats: stats.clone(),
        announcer: announcer.clone(),
    };
    Harness {
        registry: GuildQueueRegistry::new(services, settings),
        transport,
        stats,
        announcer,
    }
}

pub fn sound(name: &str) -> Arc<Sound> {
    Arc::new(Sound::new(name, AudioRef::Provider("mock".into()), 1).with_command("test"))
}

pub fn request(guild_id: u64, channel_id: u64, name: &str) -> PlayRequest {
    PlayRequest::new(guild_id, channel_id, 1, sound(name))
}

/// Poll `cond` until it holds, advancing (possibly paused) time in small steps.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not met in time");
}

pub async fn wait_for_phase(
    registry: &GuildQueueRegistry<MockTransport>,
    guild_id: u64,
    phase: PhaseKind,
) -> GuildStatus {
    for _ in 0..10_000 {
        let status = registry.status(guild_id).await;
        if status.phase == phase {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("guild {guild_id} never reached {phase:?}");
}
