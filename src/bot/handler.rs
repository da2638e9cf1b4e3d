use crate::bot::Data;
use crate::playback::{PlayError, PlayInvocation, SubmitOutcome};
use poise::serenity_prelude::{Context, GuildId, Message, UserId};
use tracing::{debug, warn};

/// Handle `!command` messages by playing the matching sound
pub async fn handle_message(ctx: &Context, msg: &Message, data: &Data) {
    // Ignore bot messages
    if msg.author.bot {
        return;
    }

    let Some(guild_id) = msg.guild_id else {
        return; // DMs not supported
    };

    let Some(command) = parse_command(&msg.content, &data.prefix) else {
        return;
    };

    let invocation = PlayInvocation {
        guild_id: guild_id.get(),
        user_id: msg.author.id.get(),
        text_channel_id: Some(msg.channel_id.get()),
        voice_channel_id: user_voice_channel(ctx, guild_id, msg.author.id),
        command,
    };

    match data.dispatcher.dispatch(&invocation).await {
        Ok(dispatched) if dispatched.outcome == SubmitOutcome::Dropped => {
            debug!(guild_id = invocation.guild_id, "Backlog full, ignoring command");
        }
        Ok(_) => {}
        // Not a sound command
        Err(PlayError::EmptyCandidateSet) => {}
        Err(PlayError::UserNotInVoice) => {
            debug!(
                guild_id = invocation.guild_id,
                user_id = invocation.user_id,
                "Command from user outside voice"
            );
        }
        Err(e) => {
            warn!(guild_id = invocation.guild_id, error = %e, "Failed to dispatch command");
        }
    }
}

/// Extract the lower-cased command word from a prefixed message.
pub fn parse_command(content: &str, prefix: &str) -> Option<String> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let word = rest.split_whitespace().next()?;
    // "! airhorn" is not a command
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(word.to_lowercase())
}

/// Voice channel the user is connected to, from the gateway cache.
pub fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<u64> {
    let guild = ctx.cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
        .map(|channel| channel.get())
}
