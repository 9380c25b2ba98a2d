use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use std::sync::Arc;
use tracing::{error, info};

use open_music_resolver::{
    audio::player::PlayerManager,
    bot::{events, intake::RequestIntake, OpenMusicBot},
    cache::{durable::JsonDurableStore, ResultCache},
    config::Config,
    monitoring::MonitoringSystem,
    resolver::{cooldown::CooldownGovernor, Resolver},
    sources::{registry, HttpLoader, RoutingLoader, YtDlpLoader},
    storage::SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_music_resolver=debug".parse()?)
                .add_directive("serenity=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Music Bot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    let ytdlp = YtDlpLoader::new(config.ytdlp_path.to_string_lossy());

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&ytdlp).await;
    }

    if config.discord_token.is_empty() {
        anyhow::bail!("DISCORD_TOKEN no configurado");
    }
    info!("{}", config.summary());

    // Inicializar caché de dos niveles
    let durable = Arc::new(JsonDurableStore::new(config.data_dir.clone(), config.durable_cache_ttl).await?);
    let cache = Arc::new(
        ResultCache::new(config.cache_size, config.cache_ttl)
            .with_durable(durable.clone())
            .promote_durable_hits(config.cache_promote_durable_hits),
    );

    // Inicializar sistema de monitoreo
    let monitoring = Arc::new(MonitoringSystem::new());
    info!("📊 Sistema de monitoreo activado");

    let loader = Arc::new(RoutingLoader::new(Arc::new(ytdlp.clone()), Arc::new(HttpLoader::new()?)));
    let resolver = Arc::new(Resolver::new(
        loader,
        cache.clone(),
        Arc::new(CooldownGovernor::new([registry::COOLDOWN_TRACKED])),
        monitoring.clone(),
        config.resolver_config(),
    ));

    let players = Arc::new(PlayerManager::new(config.max_queue_size));
    let intake = Arc::new(RequestIntake::new(
        resolver,
        monitoring.clone(),
        config.default_search_provider,
    ));
    let sessions = Arc::new(SnapshotStore::new(config.data_dir.clone()).await?);

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Crear handler del bot
    let handler = OpenMusicBot::new(
        config.clone(),
        players.clone(),
        intake,
        cache,
        durable,
        sessions.clone(),
        ytdlp,
    );

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    // Manejar shutdown graceful: capturar sesiones antes de salir
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");

        events::persist_sessions(&sessions, &players).await;
        info!("{}", monitoring);
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(ytdlp: &YtDlpLoader) -> Result<()> {
    // Verificar dependencias críticas
    let version = ytdlp.version().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
