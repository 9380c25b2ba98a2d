//! Lifecycle events: restore sessions at startup, persist them at shutdown.

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    audio::player::PlayerManager,
    session::{self, SessionSnapshot},
    storage::SnapshotStore,
};

/// Restores every saved session into `players`. Snapshots are consumed.
pub async fn restore_sessions(store: &SnapshotStore, players: &PlayerManager) -> Result<usize> {
    let snapshots = store.take_all().await?;
    let mut restored = 0;

    for snapshot in snapshots {
        let Some(guild_id) = snapshot.guild() else {
            warn!("⚠️ Snapshot sin guild válido descartado");
            continue;
        };

        let player = players.get_or_create(guild_id);
        let report = session::restore(&snapshot, player.as_ref());
        if report.kept > 0 {
            restored += 1;
        }
    }

    if restored > 0 {
        info!("♻️ {} sesiones restauradas", restored);
    }
    Ok(restored)
}

/// Captures a snapshot of every guild that has something playing or queued.
pub fn capture_sessions(players: &PlayerManager) -> Vec<SessionSnapshot> {
    players
        .guilds()
        .into_iter()
        .filter_map(|guild_id| players.get(guild_id).map(|player| (guild_id, player)))
        .filter(|(_, player)| !player.is_idle())
        .map(|(guild_id, player)| session::capture(guild_id, player.as_ref()).0)
        .collect()
}

/// Captures and saves every active guild.
pub async fn persist_sessions(store: &SnapshotStore, players: &PlayerManager) -> usize {
    let snapshots = capture_sessions(players);
    info!(
        "📸 Capturando {} sesiones activas de {} reproductores",
        snapshots.len(),
        players.len()
    );
    store.save_all(&snapshots).await
}
