//! The per-guild playback worker.
//!
//! One worker runs per active guild. It owns the voice session by value and
//! walks an explicit state machine until the guild goes idle:
//!
//! ```text
//!   Connecting ──▶ Playing ──▶ Draining ──▶ ArmingIdle ──▶ Closed
//!       │  ▲          │            │             │
//!       │  └──────────┴── next ────┘◀── resume ──┘
//!       ▼
//!     Failed ──▶ Closed
//! ```

use super::error::{PlayError, PlayResult};
use super::registry::{GuildQueueRegistry, IdleOutcome};
use super::request::PlayRequest;
use crate::audio::AudioClip;
use crate::stats::PlayRecord;
use crate::voice::{VoiceSession, VoiceTransport};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

enum WorkerState<S> {
    Connecting {
        request: PlayRequest,
        session: Option<S>,
    },
    Playing {
        request: PlayRequest,
        session: S,
    },
    Draining {
        next: Option<Box<PlayRequest>>,
        session: S,
    },
    ArmingIdle {
        session: S,
    },
    Failed {
        error: PlayError,
        session: Option<S>,
    },
    Closed,
}

pub(crate) struct PlaybackWorker<T: VoiceTransport> {
    registry: Arc<GuildQueueRegistry<T>>,
    guild_id: u64,
}

impl<T: VoiceTransport> PlaybackWorker<T> {
    pub(crate) fn new(registry: Arc<GuildQueueRegistry<T>>, guild_id: u64) -> Self {
        Self { registry, guild_id }
    }

    /// Play `request`, then everything chained or queued after it.
    ///
    /// `session` is the parked session when resuming from idle.
    pub(crate) async fn run(self, request: PlayRequest, session: Option<T::Session>) {
        let guild_id = self.guild_id;
        let mut state = WorkerState::Connecting { request, session };
        let mut played = 0u32;

        loop {
            state = match state {
                WorkerState::Connecting { request, session } => {
                    match self.acquire(&request, session).await {
                        Ok(session) => WorkerState::Playing { request, session },
                        Err((error, session)) => WorkerState::Failed { error, session },
                    }
                }

                WorkerState::Playing {
                    mut request,
                    mut session,
                } => {
                    let next = request.next.take();
                    match self.play(&request, &mut session).await {
                        Ok(()) => {
                            played += 1;
                            WorkerState::Draining { next, session }
                        }
                        Err(error) if error.is_fatal() => WorkerState::Failed {
                            error,
                            session: Some(session),
                        },
                        Err(e) => {
                            warn!(
                                guild_id,
                                request_id = %request.id,
                                sound = %request.sound.name,
                                error = %e,
                                "Skipping request"
                            );
                            WorkerState::Draining { next, session }
                        }
                    }
                }

                WorkerState::Draining { next, session } => match next {
                    Some(next) => WorkerState::Connecting {
                        request: *next,
                        session: Some(session),
                    },
                    None => match self.registry.drain_next(guild_id).await {
                        Some(request) => WorkerState::Connecting {
                            request,
                            session: Some(session),
                        },
                        None => WorkerState::ArmingIdle { session },
                    },
                },

                WorkerState::ArmingIdle { session } => {
                    match self.registry.mark_idle(guild_id, session).await {
                        IdleOutcome::Resume(request, session) => WorkerState::Connecting {
                            request,
                            session: Some(session),
                        },
                        IdleOutcome::Parked | IdleOutcome::Released => WorkerState::Closed,
                    }
                }

                WorkerState::Failed { error, session } => {
                    error!(guild_id, error = %error, "Playback failed, clearing backlog");
                    self.registry.abort(guild_id, session).await;
                    WorkerState::Closed
                }

                WorkerState::Closed => break,
            };
        }

        debug!(guild_id, played, "Worker closed");
    }

    /// Reuse, switch or open the voice session for `request`.
    async fn acquire(
        &self,
        request: &PlayRequest,
        session: Option<T::Session>,
    ) -> Result<T::Session, (PlayError, Option<T::Session>)> {
        let transport = &self.registry.services().transport;

        let Some(mut session) = session else {
            return transport
                .connect(request.guild_id, request.channel_id)
                .await
                .map_err(|e| (PlayError::ConnectFailure(e), None));
        };

        if session.channel_id() == request.channel_id {
            return Ok(session);
        }

        match transport
            .switch_channel(&mut session, request.channel_id)
            .await
        {
            Ok(()) => {
                tokio::time::sleep(self.registry.settings().channel_switch_settle).await;
                Ok(session)
            }
            Err(e) => Err((PlayError::ChannelSwitchFailure(e), Some(session))),
        }
    }

    async fn play(&self, request: &PlayRequest, session: &mut T::Session) -> PlayResult<()> {
        let clip = self.registry.services().audio.open(&request.sound).await?;

        self.record(request);
        tokio::time::sleep(self.registry.settings().pre_play_delay).await;
        self.announce(request);

        info!(
            guild_id = request.guild_id,
            channel_id = request.channel_id,
            request_id = %request.id,
            sound = %request.sound.name,
            frames = clip.len(),
            "Playing sound"
        );

        let transport = &self.registry.services().transport;
        transport.set_speaking(session, true).await;
        let result = self.stream(&clip, session).await;
        transport.set_speaking(session, false).await;
        result
    }

    async fn stream(&self, clip: &AudioClip, session: &mut T::Session) -> PlayResult<()> {
        let transport = &self.registry.services().transport;
        for frame in clip.frames() {
            transport
                .send_frame(session, frame.clone())
                .await
                .map_err(PlayError::StreamFailure)?;
        }
        Ok(())
    }

    /// Report the play without waiting for the sink.
    fn record(&self, request: &PlayRequest) {
        let stats = Arc::clone(&self.registry.services().stats);
        let record = PlayRecord {
            guild_id: request.guild_id,
            user_id: request.user_id,
            channel_id: request.channel_id,
            sound: request.sound.stats_key().to_string(),
            played_at: Utc::now(),
        };
        tokio::spawn(async move {
            if let Err(e) = stats.record(&record).await {
                warn!(guild_id = record.guild_id, error = %e, "Failed to record play");
            }
        });
    }

    /// Post the sound's message to the origin text channel, if both exist.
    fn announce(&self, request: &PlayRequest) {
        let (Some(text_channel_id), Some(message)) =
            (request.text_channel_id, request.sound.message.clone())
        else {
            return;
        };
        let announcer = Arc::clone(&self.registry.services().announcer);
        tokio::spawn(async move {
            if let Err(e) = announcer.announce(text_channel_id, &message).await {
                warn!(text_channel_id, error = %e, "Failed to post announcement");
            }
        });
    }
}
