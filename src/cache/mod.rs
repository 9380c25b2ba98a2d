//! # Cache Module
//!
//! Two-tier cache of resolved playlists, keyed by fingerprint
//! (provider id + normalized query).
//!
//! ## Tiers
//!
//! - **Tier 1** ([`lru_cache::LRUCache`]): bounded in-process map with TTL.
//!   Always consulted first and written synchronously on store.
//! - **Tier 2** ([`durable::DurableStore`]): durable store, read only on a
//!   tier-1 miss. Writes run in a spawned task; a failure is logged and never
//!   reaches the resolution that produced the result.
//!
//! A tier-2 hit is not copied into tier 1 unless
//! `CACHE_PROMOTE_DURABLE_HITS` is enabled.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_SIZE=500              # Tier-1 entries
//! CACHE_TTL=3600              # Tier-1 TTL (seconds)
//! DURABLE_CACHE_TTL=604800    # Tier-2 TTL (seconds)
//! ```

pub mod durable;
pub mod lru_cache;

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{resolver::context::QueryContext, sources::ResolvedPlaylist};
use durable::DurableStore;
use lru_cache::{CacheMetrics, LRUCache};

/// Tier-1 map type.
pub type MusicCache = LRUCache<String, ResolvedPlaylist>;

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Durable,
}

pub struct ResultCache {
    memory: MusicCache,
    durable: Option<Arc<dyn DurableStore>>,
    promote_durable_hits: bool,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            memory: LRUCache::new(capacity).with_ttl(ttl),
            durable: None,
            promote_durable_hits: false,
        }
    }

    pub fn with_durable(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    pub fn promote_durable_hits(mut self, promote: bool) -> Self {
        self.promote_durable_hits = promote;
        self
    }

    /// Looks the context up in tier 1, then tier 2.
    pub async fn lookup(&self, ctx: &QueryContext) -> Option<(ResolvedPlaylist, CacheTier)> {
        let fingerprint = ctx.fingerprint();

        if let Some(playlist) = self.memory.get(&fingerprint) {
            debug!("✅ Cache hit (memoria) para: {}", fingerprint);
            return Some((playlist, CacheTier::Memory));
        }

        let durable = self.durable.as_ref()?;
        match durable.fetch_by_fingerprint(&fingerprint).await {
            Ok(Some(playlist)) => {
                debug!("✅ Cache hit (persistente) para: {}", fingerprint);
                if self.promote_durable_hits {
                    self.memory.insert(fingerprint, playlist.clone());
                }
                Some((playlist, CacheTier::Durable))
            }
            Ok(None) => {
                debug!("❌ Cache miss para: {}", fingerprint);
                None
            }
            Err(e) => {
                warn!("⚠️ Error leyendo caché persistente para {}: {}", fingerprint, e);
                None
            }
        }
    }

    /// Stores a successful resolution.
    ///
    /// Tier 1 is written before returning. The tier-2 write runs in the
    /// returned task; callers are free to drop the handle.
    pub fn store(&self, ctx: &QueryContext, playlist: &ResolvedPlaylist) -> Option<JoinHandle<()>> {
        if playlist.is_empty() {
            return None;
        }

        let fingerprint = ctx.fingerprint();
        self.memory.insert(fingerprint.clone(), playlist.clone());
        debug!("💾 Resultado almacenado en caché: {}", fingerprint);

        let durable = self.durable.clone()?;
        let playlist = playlist.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = durable.store(&fingerprint, &playlist).await {
                warn!("⚠️ No se pudo persistir {}: {}", fingerprint, e);
            }
        }))
    }

    pub fn stats(&self) -> CacheMetrics {
        self.memory.metrics()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Performs cache maintenance by removing expired tier-1 entries.
    pub fn cleanup_old_entries(&self) {
        let removed = self.memory.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
    }
}
