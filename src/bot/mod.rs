//! # Bot Module
//!
//! Discord event handler wiring the resolver to guild players.
//!
//! The bot is built around the [`OpenMusicBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It manages:
//!
//! - Prefix commands (`!play`, `!pause`, `!resume`, `!skip`, `!stop`, `!np`)
//! - Request intake through [`intake::RequestIntake`]
//! - Session restore on the first `ready` event
//! - Hourly cache maintenance

use serenity::{
    all::{Context, EventHandler, Message, Ready},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod intake;

use crate::{
    audio::player::PlayerManager,
    cache::{durable::JsonDurableStore, ResultCache},
    config::Config,
    sources::YtDlpLoader,
    storage::SnapshotStore,
};
use intake::RequestIntake;

/// Main Discord bot handler.
pub struct OpenMusicBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    pub players: Arc<PlayerManager>,
    pub intake: Arc<RequestIntake>,
    cache: Arc<ResultCache>,
    durable: Arc<JsonDurableStore>,
    sessions: Arc<SnapshotStore>,
    ytdlp: YtDlpLoader,
    /// `ready` se dispara de nuevo tras reconectar
    restored: AtomicBool,
}

impl OpenMusicBot {
    pub fn new(
        config: Arc<Config>,
        players: Arc<PlayerManager>,
        intake: Arc<RequestIntake>,
        cache: Arc<ResultCache>,
        durable: Arc<JsonDurableStore>,
        sessions: Arc<SnapshotStore>,
        ytdlp: YtDlpLoader,
    ) -> Self {
        Self {
            config,
            players,
            intake,
            cache,
            durable,
            sessions,
            ytdlp,
            restored: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventHandler for OpenMusicBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = events::restore_sessions(&self.sessions, &self.players).await {
            error!("Error al restaurar sesiones: {:?}", e);
        }

        let cache = self.cache.clone();
        let durable = self.durable.clone();
        let ytdlp = self.ytdlp.clone();
        tokio::spawn(async move {
            maintenance_tasks(cache, durable, ytdlp).await;
        });
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(command) = commands::parse(&self.config.command_prefix, &msg.content) else {
            return;
        };

        if let Err(e) = commands::handle_command(&ctx, &msg, command, self).await {
            error!("Error manejando comando: {:?}", e);
        }
    }
}

/// Runs periodic maintenance tasks in the background.
///
/// Runs every hour: drops expired entries from both cache tiers and checks
/// that yt-dlp still answers.
async fn maintenance_tasks(cache: Arc<ResultCache>, durable: Arc<JsonDurableStore>, ytdlp: YtDlpLoader) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600)); // Cada hora

    loop {
        interval.tick().await;

        // Limpiar caché viejo
        cache.cleanup_old_entries();
        if let Err(e) = durable.cleanup_expired().await {
            warn!("Error limpiando caché persistente: {:?}", e);
        }

        let stats = cache.stats();
        info!(
            "📊 Caché: {} entradas, {:.1}% aciertos",
            cache.len(),
            stats.hit_rate() * 100.0
        );

        if let Err(e) = ytdlp.version().await {
            warn!("Error verificando dependencias: {:?}", e);
        }

        info!("🧹 Tareas de mantenimiento completadas");
    }
}
