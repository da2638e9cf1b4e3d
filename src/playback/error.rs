//! Playback error taxonomy.
//!
//! A full backlog is not an error; it surfaces as
//! [`SubmitOutcome::Dropped`](super::SubmitOutcome::Dropped).

use crate::audio::AudioError;
use crate::voice::VoiceError;

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    /// No sound matched the command. The caller takes no action.
    #[error("No sound matches the command")]
    EmptyCandidateSet,

    /// The issuing user is not in a voice channel of the guild.
    #[error("You are not in a voice channel")]
    UserNotInVoice,

    #[error("Voice connection failed: {0}")]
    ConnectFailure(#[source] VoiceError),

    #[error("Voice channel switch failed: {0}")]
    ChannelSwitchFailure(#[source] VoiceError),

    #[error("Playback interrupted: {0}")]
    StreamFailure(#[source] VoiceError),

    #[error("Failed to load sound: {0}")]
    Load(#[from] AudioError),
}

impl PlayError {
    /// Whether the error ends the guild's whole playback sequence rather than
    /// a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlayError::ConnectFailure(_) | PlayError::ChannelSwitchFailure(_)
        )
    }

    /// Whether the message can be shown to the user who issued the command.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, PlayError::EmptyCandidateSet | PlayError::UserNotInVoice)
    }
}

pub type PlayResult<T> = Result<T, PlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let connect = PlayError::ConnectFailure(VoiceError::InvalidId(0));
        let switch = PlayError::ChannelSwitchFailure(VoiceError::Switch {
            channel_id: 2,
            reason: "gone".into(),
        });
        let stream = PlayError::StreamFailure(VoiceError::Stream("closed".into()));

        assert!(connect.is_fatal());
        assert!(switch.is_fatal());
        assert!(!stream.is_fatal());
        assert!(!PlayError::Load(AudioError::NoFrames).is_fatal());
    }

    #[test]
    fn test_user_facing_messages() {
        assert!(PlayError::UserNotInVoice.is_user_facing());
        assert!(!PlayError::Load(AudioError::NoFrames).is_user_facing());

        assert_eq!(
            PlayError::UserNotInVoice.to_string(),
            "You are not in a voice channel"
        );
        assert_eq!(
            PlayError::EmptyCandidateSet.to_string(),
            "No sound matches the command"
        );
    }
}
