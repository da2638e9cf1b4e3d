//! Sound playback commands.

use super::{invocation, Context, Error};
use crate::playback::{Dispatched, Selection, SubmitOutcome};
use poise::serenity_prelude as serenity;
use tracing::info;

/// Play a sound in your voice channel
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Sound command, e.g. airhorn"] command: String,
    #[description = "Play this exact sound instead of a random one"] sound: Option<String>,
) -> Result<(), Error> {
    let invocation = invocation(ctx, &command)?;
    let selection = match sound {
        Some(name) => Selection::Named(name),
        None => Selection::Weighted,
    };

    let dispatched = ctx
        .data()
        .dispatcher
        .dispatch_with(&invocation, selection)
        .await?;

    reply(ctx, &invocation.command, &dispatched).await
}

/// Play a string of random sounds back to back
#[poise::command(slash_command, guild_only, owners_only)]
pub async fn bomb(
    ctx: Context<'_>,
    #[description = "How many sounds"]
    #[min = 1]
    #[max = 50]
    count: u8,
    #[description = "Sound command (default: airhorn)"] command: Option<String>,
) -> Result<(), Error> {
    let command = command.unwrap_or_else(|| "airhorn".to_string());
    let invocation = invocation(ctx, &command)?;

    let dispatched = ctx
        .data()
        .dispatcher
        .dispatch_with(&invocation, Selection::Chain(usize::from(count)))
        .await?;

    info!(
        guild_id = invocation.guild_id,
        user_id = invocation.user_id,
        chain_len = dispatched.chain_len,
        "Bomb dispatched"
    );

    reply(ctx, &invocation.command, &dispatched).await
}

async fn reply(ctx: Context<'_>, command: &str, dispatched: &Dispatched) -> Result<(), Error> {
    let embed = match dispatched.outcome {
        SubmitOutcome::Accepted => {
            let mut embed = serenity::CreateEmbed::default()
                .title("Playing")
                .field("Command", format!("`{}`", command), true)
                .field("Sound", format!("`{}`", dispatched.sound.name), true)
                .color(0x57F287);
            if dispatched.chain_len > 1 {
                embed = embed.field("Chain", dispatched.chain_len.to_string(), true);
            }
            embed
        }
        SubmitOutcome::Dropped => serenity::CreateEmbed::default()
            .title("Queue full")
            .description("Too many sounds are waiting in this server. Try again in a moment.")
            .color(0xFEE75C),
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
