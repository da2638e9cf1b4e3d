use airhorn::{
    audio::ClipLoader,
    bot::{self, announce::DiscordAnnouncer, Data},
    config::{AppConfig, ProviderConfig},
    playback::{
        GuildQueueRegistry, PlayRequestBuilder, PlaybackServices, PlaybackSettings,
        SoundDispatcher,
    },
    sound::{DefaultCatalog, DirectoryProvider, GuildCatalog, ProviderRegistry, SoundCatalog, WeightedSelector},
    stats::PlayCounter,
    voice::SongbirdTransport,
};
use poise::serenity_prelude::Http;
use songbird::Songbird;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up AIRHORN_* variables from .env before anything reads them
    let dotenv = dotenvy::dotenv();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airhorn=debug,songbird=info,serenity=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Airhorn v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = AppConfig::init()?;
    info!("Configuration loaded");

    if config.discord.token.is_empty() {
        error!("Discord token not configured!");
        error!("Set discord.token in config/local.toml or the AIRHORN_DISCORD__TOKEN env var");
        return Err(anyhow::anyhow!("Discord token not configured"));
    }

    // Sound catalogs
    let providers = Arc::new(build_providers(&config.providers));
    let catalog = Arc::new(SoundCatalog::new(
        DefaultCatalog::new(&config.audio.sound_dir),
        GuildCatalog::from_config(&config.guild_sounds, &config.audio.sound_dir),
        Arc::clone(&providers),
    ));
    let clips = Arc::new(ClipLoader::new(config.audio.clip_cache_size, providers));
    let stats = Arc::new(PlayCounter::new());

    // Voice and playback
    let songbird = Songbird::serenity();
    let services = PlaybackServices {
        transport: Arc::new(SongbirdTransport::new(Arc::clone(&songbird))),
        audio: clips,
        stats: stats.clone(),
        announcer: Arc::new(DiscordAnnouncer::new(Arc::new(Http::new(&config.discord.token)))),
    };
    let registry = GuildQueueRegistry::new(services, PlaybackSettings::from(&config.playback));

    let selector = Arc::new(WeightedSelector::from_seed(config.playback.rng_seed));
    let builder = PlayRequestBuilder::new(selector, config.playback.max_chain_length);
    let dispatcher = Arc::new(SoundDispatcher::new(
        catalog.clone(),
        builder,
        Arc::clone(&registry),
    ));

    let data = Data {
        dispatcher,
        catalog,
        stats,
        prefix: config.discord.command_prefix.clone(),
    };

    let mut client =
        bot::build_client(&config.discord.token, data, config.discord.owner_id, songbird).await?;
    let shard_manager = client.shard_manager.clone();

    info!("Starting Discord bot...");
    tokio::select! {
        result = client.start() => match result {
            Ok(()) => info!("Discord bot shut down gracefully"),
            Err(e) => error!("Discord bot error: {}", e),
        },
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
    }

    registry.shutdown().await;
    shard_manager.shutdown_all().await;

    Ok(())
}

/// Register a directory provider for each configured entry.
fn build_providers(configs: &[ProviderConfig]) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in configs {
        if !provider.dir.is_dir() {
            warn!(
                provider = %provider.name,
                dir = %provider.dir.display(),
                "Provider directory does not exist"
            );
        }
        registry.register(Arc::new(DirectoryProvider::new(&provider.name, &provider.dir)));
    }
    registry
}
