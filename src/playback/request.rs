//! Play requests and the builder that turns a command into one.

use super::error::{PlayError, PlayResult};
use crate::sound::{Sound, WeightedSelector};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A single request to play one sound into a guild voice channel.
///
/// Consumed exactly once by a playback worker.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    /// Correlation id for logs
    pub id: Uuid,
    pub guild_id: u64,
    /// Voice channel to play into
    pub channel_id: u64,
    pub user_id: u64,
    /// Text channel the command came from
    pub text_channel_id: Option<u64>,
    pub sound: Arc<Sound>,
    /// Sound was picked by name rather than by weight
    pub forced: bool,
    /// Request played right after this one, ahead of the backlog
    pub next: Option<Box<PlayRequest>>,
    pub requested_at: DateTime<Utc>,
}

impl PlayRequest {
    pub fn new(guild_id: u64, channel_id: u64, user_id: u64, sound: Arc<Sound>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            channel_id,
            user_id,
            text_channel_id: None,
            sound,
            forced: false,
            next: None,
            requested_at: Utc::now(),
        }
    }

    pub fn with_text_channel(mut self, text_channel_id: u64) -> Self {
        self.text_channel_id = Some(text_channel_id);
        self
    }

    /// Chain `next` to play immediately after this request.
    pub fn then(mut self, next: PlayRequest) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Number of requests in this chain, including this one.
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut cursor = &self.next;
        while let Some(next) = cursor {
            len += 1;
            cursor = &next.next;
        }
        len
    }
}

/// Where a command was issued from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayInvocation {
    pub guild_id: u64,
    pub user_id: u64,
    pub text_channel_id: Option<u64>,
    /// Voice channel the user is currently in, if any
    pub voice_channel_id: Option<u64>,
    /// Command without prefix, lower-cased
    pub command: String,
}

/// Builds [`PlayRequest`]s from an invocation and its resolved candidates.
///
/// The only side effect is the selector's random draw.
#[derive(Debug, Clone)]
pub struct PlayRequestBuilder {
    selector: Arc<WeightedSelector>,
    max_chain_length: usize,
}

impl PlayRequestBuilder {
    pub fn new(selector: Arc<WeightedSelector>, max_chain_length: usize) -> Self {
        Self {
            selector,
            max_chain_length: max_chain_length.max(1),
        }
    }

    pub fn max_chain_length(&self) -> usize {
        self.max_chain_length
    }

    /// Pick one candidate by weight.
    pub fn build(
        &self,
        invocation: &PlayInvocation,
        candidates: &[Arc<Sound>],
    ) -> PlayResult<PlayRequest> {
        let sound = self
            .selector
            .select(candidates)
            .ok_or(PlayError::EmptyCandidateSet)?;
        self.request(invocation, sound, false)
    }

    /// Use the first candidate named `sound_name`, bypassing weights.
    pub fn build_forced(
        &self,
        invocation: &PlayInvocation,
        candidates: &[Arc<Sound>],
        sound_name: &str,
    ) -> PlayResult<PlayRequest> {
        let sound = candidates
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(sound_name))
            .cloned()
            .ok_or(PlayError::EmptyCandidateSet)?;
        self.request(invocation, sound, true)
    }

    /// Build `count` linked requests, each drawn independently.
    ///
    /// `count` is clamped to `1..=max_chain_length`.
    pub fn build_chain(
        &self,
        invocation: &PlayInvocation,
        candidates: &[Arc<Sound>],
        count: usize,
    ) -> PlayResult<PlayRequest> {
        let count = count.clamp(1, self.max_chain_length);
        let mut links = (0..count)
            .map(|_| self.build(invocation, candidates))
            .collect::<PlayResult<Vec<_>>>()?;

        let mut head = links.pop().ok_or(PlayError::EmptyCandidateSet)?;
        while let Some(prev) = links.pop() {
            head = prev.then(head);
        }
        Ok(head)
    }

    fn request(
        &self,
        invocation: &PlayInvocation,
        sound: Arc<Sound>,
        forced: bool,
    ) -> PlayResult<PlayRequest> {
        let channel_id = invocation
            .voice_channel_id
            .ok_or(PlayError::UserNotInVoice)?;

        Ok(PlayRequest {
            id: Uuid::new_v4(),
            guild_id: invocation.guild_id,
            channel_id,
            user_id: invocation.user_id,
            text_channel_id: invocation.text_channel_id,
            sound,
            forced,
            next: None,
            requested_at: Utc::now(),
        })
    }
}
