pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod playback;
pub mod sound;
pub mod stats;
pub mod voice;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
