use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, warn};

use crate::session::SessionSnapshot;

/// Almacenamiento de snapshots de sesión en archivos JSON
///
/// One file per guild under `DATA_DIR/sessions/guild_<id>.json`. Snapshots
/// are written once at shutdown and consumed once at startup.
pub struct SnapshotStore {
    sessions_dir: PathBuf,
}

impl SnapshotStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let sessions_dir = data_dir.join("sessions");
        fs::create_dir_all(&sessions_dir).await?;

        info!("📁 Storage de sesiones inicializado en: {}", sessions_dir.display());
        Ok(Self { sessions_dir })
    }

    /// Guarda el snapshot de un servidor
    pub async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let file_path = self.get_session_file_path(snapshot.guild_id);
        let tmp_path = file_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(snapshot)?;

        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &file_path).await?;
        Ok(())
    }

    /// Guarda todos los snapshots; los errores individuales se registran
    pub async fn save_all(&self, snapshots: &[SessionSnapshot]) -> usize {
        let mut saved = 0;

        for snapshot in snapshots.iter().filter(|s| !s.is_empty()) {
            match self.save(snapshot).await {
                Ok(()) => saved += 1,
                Err(e) => error!("Error guardando sesión para guild {}: {}", snapshot.guild_id, e),
            }
        }

        info!("💾 Guardadas {} sesiones", saved);
        saved
    }

    /// Lee y elimina todos los snapshots guardados
    ///
    /// Unreadable files are logged and deleted too, so a corrupt snapshot
    /// never survives more than one startup.
    pub async fn take_all(&self) -> Result<Vec<SessionSnapshot>> {
        let mut files = fs::read_dir(&self.sessions_dir).await?;
        let mut snapshots = Vec::new();

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();

            let Some(guild_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.strip_prefix("guild_"))
                .and_then(|id| id.parse::<u64>().ok())
            else {
                continue;
            };

            match self.load_session(guild_id).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Error cargando sesión para guild {}: {}", guild_id, e),
            }

            if let Err(e) = fs::remove_file(&path).await {
                error!("Error eliminando sesión para guild {}: {}", guild_id, e);
            }
        }

        if !snapshots.is_empty() {
            info!("📂 Cargadas {} sesiones guardadas", snapshots.len());
        }

        Ok(snapshots)
    }

    async fn load_session(&self, guild_id: u64) -> Result<SessionSnapshot> {
        let file_path = self.get_session_file_path(guild_id);
        let content = fs::read_to_string(&file_path).await?;
        let snapshot: SessionSnapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }

    fn get_session_file_path(&self, guild_id: u64) -> PathBuf {
        self.sessions_dir.join(format!("guild_{}.json", guild_id))
    }
}
