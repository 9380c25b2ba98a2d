use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{codec, sources::ResolvedPlaylist};

/// Longitud máxima del nombre de archivo derivado del fingerprint
const MAX_FILE_STEM: usize = 180;

/// Second-tier store, queried only when the in-process tier misses.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn fetch_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ResolvedPlaylist>>;

    async fn store(&self, fingerprint: &str, playlist: &ResolvedPlaylist) -> Result<()>;
}

/// Registro persistido de un resultado resuelto
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPlaylist {
    fingerprint: String,
    label: String,
    selected: Option<usize>,
    /// Tracks codificados con [`codec::encode`], en base64
    tracks: Vec<String>,
    stored_at: DateTime<Utc>,
}

/// JSON-file durable store, one file per fingerprint.
pub struct JsonDurableStore {
    dir: PathBuf,
    max_age: Duration,
}

impl JsonDurableStore {
    pub async fn new(data_dir: PathBuf, max_age: Duration) -> Result<Self> {
        let dir = data_dir.join("playlists");
        fs::create_dir_all(&dir).await?;
        info!("📁 Caché persistente inicializado en: {}", dir.display());
        Ok(Self { dir, max_age })
    }

    fn file_path(&self, fingerprint: &str) -> PathBuf {
        let mut stem = URL_SAFE_NO_PAD.encode(fingerprint.as_bytes());
        stem.truncate(MAX_FILE_STEM);
        self.dir.join(format!("{}.json", stem))
    }

    fn is_fresh(&self, stored: &StoredPlaylist) -> bool {
        let age = Utc::now().signed_duration_since(stored.stored_at);
        age.to_std().map_or(true, |age| age <= self.max_age)
    }

    /// Elimina archivos expirados o ilegibles
    pub async fn cleanup_expired(&self) -> Result<usize> {
        let mut files = fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let keep = match fs::read_to_string(&path).await {
                Ok(content) => serde_json::from_str::<StoredPlaylist>(&content)
                    .map(|stored| self.is_fresh(&stored))
                    .unwrap_or(false),
                Err(_) => false,
            };

            if !keep {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Error eliminando {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            info!("🧹 Caché persistente: {} entradas expiradas eliminadas", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl DurableStore for JsonDurableStore {
    async fn fetch_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ResolvedPlaylist>> {
        let path = self.file_path(fingerprint);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredPlaylist = serde_json::from_str(&content)?;

        // Nombres truncados pueden colisionar
        if stored.fingerprint != fingerprint || !self.is_fresh(&stored) {
            debug!("Entrada persistente descartada para {}", fingerprint);
            return Ok(None);
        }

        let blobs: Vec<Vec<u8>> = stored
            .tracks
            .iter()
            .filter_map(|encoded| STANDARD.decode(encoded).ok())
            .collect();
        let tracks = codec::decode_all(&blobs).unwrap_or_default();

        if tracks.is_empty() {
            return Ok(None);
        }

        let selected = stored.selected.filter(|index| *index < tracks.len());
        Ok(Some(ResolvedPlaylist::new(stored.label, tracks, selected)))
    }

    async fn store(&self, fingerprint: &str, playlist: &ResolvedPlaylist) -> Result<()> {
        let tracks: Vec<String> = codec::encode_all(&playlist.tracks)
            .unwrap_or_default()
            .iter()
            .map(|blob| STANDARD.encode(blob))
            .collect();

        if tracks.is_empty() {
            debug!("Nada que persistir para {}", fingerprint);
            return Ok(());
        }

        let stored = StoredPlaylist {
            fingerprint: fingerprint.to_string(),
            label: playlist.label.clone(),
            selected: playlist.selected,
            tracks,
            stored_at: Utc::now(),
        };

        let path = self.file_path(fingerprint);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(&stored)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!("💾 Resultado persistido: {}", fingerprint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::track;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn store_in(dir: &TempDir, max_age: Duration) -> JsonDurableStore {
        JsonDurableStore::new(dir.path().to_path_buf(), max_age)
            .await
            .expect("store")
    }

    #[tokio::test]
    async fn test_store_then_fetch() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, Duration::from_secs(3600)).await;
        let playlist = ResolvedPlaylist::new("Mix", vec![track("youtube", "a", "A"), track("youtube", "b", "B")], Some(1));

        store.store("youtube:mix", &playlist).await.expect("store");
        let fetched = store.fetch_by_fingerprint("youtube:mix").await.expect("fetch");

        assert_eq!(fetched, Some(playlist));
        assert_eq!(store.fetch_by_fingerprint("youtube:other").await.expect("fetch"), None);
    }

    #[tokio::test]
    async fn test_unencodable_tracks_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, Duration::from_secs(3600)).await;

        let mut info = track("youtube", "x", "X").info().clone();
        info.source = "local".to_string();
        let playlist = ResolvedPlaylist::new(
            "Mixed",
            vec![crate::sources::AudioTrack::new(info), track("youtube", "a", "A")],
            None,
        );

        store.store("youtube:mixed", &playlist).await.expect("store");
        let fetched = store
            .fetch_by_fingerprint("youtube:mixed")
            .await
            .expect("fetch")
            .expect("hit");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched.tracks[0].title(), "A");
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses_and_cleaned() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, Duration::ZERO).await;
        let playlist = ResolvedPlaylist::single(track("youtube", "a", "A"));

        store.store("youtube:a", &playlist).await.expect("store");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.fetch_by_fingerprint("youtube:a").await.expect("fetch"), None);
        assert_eq!(store.cleanup_expired().await.expect("cleanup"), 1);
    }

    #[tokio::test]
    async fn test_long_fingerprints_do_not_collide() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, Duration::from_secs(3600)).await;
        let base = "a".repeat(400);
        let first = format!("youtube:{}1", base);
        let second = format!("youtube:{}2", base);

        store
            .store(&first, &ResolvedPlaylist::single(track("youtube", "1", "One")))
            .await
            .expect("store");

        assert_eq!(store.fetch_by_fingerprint(&second).await.expect("fetch"), None);
        assert!(store.fetch_by_fingerprint(&first).await.expect("fetch").is_some());
    }
}
