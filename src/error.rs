use thiserror::Error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("Voice error: {0}")]
    Voice(#[from] crate::voice::VoiceError),

    #[error("Audio error: {0}")]
    Audio(#[from] crate::audio::AudioError),

    #[error(transparent)]
    Playback(#[from] crate::playback::PlayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the message is safe to show to the Discord user who ran the command.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Playback(e) if e.is_user_facing())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
