pub mod play;
pub mod sounds;
pub mod stats;

pub use play::{bomb, play};
pub use sounds::sounds;
pub use stats::{stats, status};

use crate::bot::handler::user_voice_channel;
use crate::bot::Data;
use crate::playback::PlayInvocation;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Get all registered commands
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![play(), bomb(), sounds(), stats(), status()]
}

/// Describe where a slash command was run from.
fn invocation(ctx: Context<'_>, command: &str) -> Result<PlayInvocation, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let user_id = ctx.author().id;

    Ok(PlayInvocation {
        guild_id: guild_id.get(),
        user_id: user_id.get(),
        text_channel_id: Some(ctx.channel_id().get()),
        voice_channel_id: user_voice_channel(ctx.serenity_context(), guild_id, user_id),
        command: command.trim().trim_start_matches(&ctx.data().prefix).to_lowercase(),
    })
}
