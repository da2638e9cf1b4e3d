//! Command dispatch: resolve, select, build and submit.

use super::error::{PlayError, PlayResult};
use super::registry::{GuildQueueRegistry, SubmitOutcome};
use super::request::{PlayInvocation, PlayRequestBuilder};
use crate::sound::{Sound, SoundResolver};
use crate::voice::VoiceTransport;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// How the sound for an invocation is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Weighted random pick
    Weighted,
    /// The candidate with this name
    Named(String),
    /// This many weighted picks played back to back
    Chain(usize),
}

/// What happened to a dispatched command.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub request_id: Uuid,
    pub outcome: SubmitOutcome,
    /// First sound of the request
    pub sound: Arc<Sound>,
    pub chain_len: usize,
}

/// Turns invocations into submitted play requests.
pub struct SoundDispatcher<T: VoiceTransport> {
    resolver: Arc<dyn SoundResolver>,
    builder: PlayRequestBuilder,
    registry: Arc<GuildQueueRegistry<T>>,
}

impl<T: VoiceTransport> SoundDispatcher<T> {
    pub fn new(
        resolver: Arc<dyn SoundResolver>,
        builder: PlayRequestBuilder,
        registry: Arc<GuildQueueRegistry<T>>,
    ) -> Self {
        Self {
            resolver,
            builder,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<GuildQueueRegistry<T>> {
        &self.registry
    }

    pub fn builder(&self) -> &PlayRequestBuilder {
        &self.builder
    }

    pub async fn dispatch(&self, invocation: &PlayInvocation) -> PlayResult<Dispatched> {
        self.dispatch_with(invocation, Selection::Weighted).await
    }

    pub async fn dispatch_with(
        &self,
        invocation: &PlayInvocation,
        selection: Selection,
    ) -> PlayResult<Dispatched> {
        let candidates = self
            .resolver
            .resolve(invocation.guild_id, &invocation.command)
            .await;
        if candidates.is_empty() {
            return Err(PlayError::EmptyCandidateSet);
        }

        let request = match &selection {
            Selection::Weighted => self.builder.build(invocation, &candidates)?,
            Selection::Named(name) => self.builder.build_forced(invocation, &candidates, name)?,
            Selection::Chain(count) => self.builder.build_chain(invocation, &candidates, *count)?,
        };

        let request_id = request.id;
        let sound = Arc::clone(&request.sound);
        let chain_len = request.chain_len();
        let outcome = self.registry.submit(request).await;

        debug!(
            guild_id = invocation.guild_id,
            user_id = invocation.user_id,
            command = %invocation.command,
            %request_id,
            sound = %sound.name,
            chain_len,
            ?outcome,
            "Dispatched command"
        );

        Ok(Dispatched {
            request_id,
            outcome,
            sound,
            chain_len,
        })
    }
}

impl<T: VoiceTransport> std::fmt::Debug for SoundDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundDispatcher")
            .field("builder", &self.builder)
            .field("registry", &self.registry)
            .finish()
    }
}
