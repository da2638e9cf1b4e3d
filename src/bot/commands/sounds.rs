use super::{Context, Error};
use poise::serenity_prelude as serenity;

/// List the sound commands available in this server
#[poise::command(slash_command, guild_only)]
pub async fn sounds(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let data = ctx.data();

    let commands = data.catalog.commands(guild_id.get());
    let list = if commands.is_empty() {
        "No sounds configured".to_string()
    } else {
        commands
            .iter()
            .map(|c| format!("`{}{}`", data.prefix, c))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let embed = serenity::CreateEmbed::default()
        .title("Sounds")
        .description(list)
        .footer(serenity::CreateEmbedFooter::new(
            "Type a command in chat while in a voice channel, or use /play",
        ))
        .color(0x5865F2);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
