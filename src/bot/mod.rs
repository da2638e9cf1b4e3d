pub mod announce;
pub mod commands;
pub mod handler;

use crate::error::{AppError, AppResult};
use crate::playback::{PlayError, SoundDispatcher};
use crate::sound::SoundCatalog;
use crate::stats::PlayCounter;
use crate::voice::SongbirdTransport;
use poise::serenity_prelude::{self as serenity, FullEvent, GatewayIntents, UserId};
use songbird::{Songbird, SerenityInit};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

/// Shared data accessible in all commands
#[derive(Debug)]
pub struct Data {
    pub dispatcher: Arc<SoundDispatcher<SongbirdTransport>>,
    pub catalog: Arc<SoundCatalog>,
    pub stats: Arc<PlayCounter>,
    /// Prefix for message-triggered sounds
    pub prefix: String,
}

type Error = Box<dyn std::error::Error + Send + Sync>;

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES
}

/// Event handler for Discord events
async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!(
                guilds = data_about_bot.guilds.len(),
                "Bot is ready! Logged in as {}", data_about_bot.user.name
            );
        }
        FullEvent::Message { new_message } => {
            handler::handle_message(ctx, new_message, data).await;
        }
        FullEvent::GuildCreate { guild, is_new } => {
            info!(
                guild_id = guild.id.get(),
                name = %guild.name,
                is_new = ?is_new,
                "Guild available"
            );
        }
        _ => {}
    }
    Ok(())
}

/// Text sent back when a command fails. Only errors the user can act on are
/// shown verbatim.
fn command_error_reply(error: &Error) -> String {
    let user_facing = match error.downcast_ref::<AppError>() {
        Some(app) => app.is_user_facing(),
        None => error
            .downcast_ref::<PlayError>()
            .is_some_and(PlayError::is_user_facing),
    };
    if user_facing {
        error.to_string()
    } else {
        "Something went wrong while running that command.".to_string()
    }
}

/// Create and configure the Discord bot framework
pub fn create_framework(data: Data, owner_id: Option<u64>) -> poise::Framework<Data, Error> {
    let owners: HashSet<UserId> = owner_id.map(UserId::new).into_iter().collect();

    poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all_commands(),
            owners,
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {}", error);
                            let _ = ctx.say(command_error_reply(&error)).await;
                        }
                        poise::FrameworkError::NotAnOwner { ctx, .. } => {
                            let _ = ctx.say("Only the bot owner can do that.").await;
                        }
                        poise::FrameworkError::Setup { error, .. } => {
                            error!("Setup error: {}", error);
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} slash commands globally", framework.options().commands.len());
                Ok(data)
            })
        })
        .build()
}

/// Build the serenity client with songbird registered on it.
///
/// `songbird` must be the same manager the voice transport joins through.
pub async fn build_client(
    token: &str,
    data: Data,
    owner_id: Option<u64>,
    songbird: Arc<Songbird>,
) -> AppResult<serenity::Client> {
    if token.is_empty() {
        return Err(AppError::internal("Discord token is empty"));
    }

    let framework = create_framework(data, owner_id);
    let client = serenity::ClientBuilder::new(token, intents())
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    Ok(client)
}
