//! Play statistics and orchestrator status.

use super::{Context, Error};
use poise::serenity_prelude as serenity;

const TOP_SOUNDS: usize = 5;

/// Show how often sounds were played in this server
#[poise::command(slash_command, guild_only)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let counter = &ctx.data().stats;

    let top = counter.top_sounds(guild_id, TOP_SOUNDS);
    let top_list = if top.is_empty() {
        "Nothing played yet".to_string()
    } else {
        top.iter()
            .enumerate()
            .map(|(i, (sound, plays))| format!("{}. `{}` ({})", i + 1, sound, plays))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::default()
        .title("Sound Stats")
        .field("Plays here", counter.guild_plays(guild_id).to_string(), true)
        .field("Your plays", counter.user_plays(ctx.author().id.get()).to_string(), true)
        .field("Top sounds", top_list, false)
        .footer(serenity::CreateEmbedFooter::new(counter.snapshot().to_string()))
        .color(0x5865F2);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the playback state of this server
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let registry = ctx.data().dispatcher.registry();

    let guild = registry.status(guild_id).await;
    let active = registry.active_guilds().await;

    let embed = serenity::CreateEmbed::default()
        .title("Playback Status")
        .field("State", guild.phase.to_string(), true)
        .field(
            "Queued",
            format!("{}/{}", guild.backlog_len, registry.settings().backlog_capacity),
            true,
        )
        .field("Servers playing", active.len().to_string(), true)
        .field("Workers started", registry.workers_spawned().to_string(), true)
        .color(0x5865F2);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
