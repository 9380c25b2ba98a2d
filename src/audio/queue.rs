use anyhow::Result;
use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::collections::VecDeque;
use tracing::info;

use crate::sources::AudioTrack;

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub track: AudioTrack,
    pub requested_by: UserId,
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(track: AudioTrack, requested_by: UserId) -> Self {
        Self {
            track,
            requested_by,
            added_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        self.track.title()
    }
}

/// FIFO queue of pending tracks plus the one currently playing.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<QueueItem>,
    current: Option<QueueItem>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            current: None,
            max_size,
        }
    }

    /// Agrega un track a la cola
    pub fn add_track(&mut self, item: QueueItem) -> Result<()> {
        if self.items.len() >= self.max_size {
            anyhow::bail!("La cola está llena (máximo {} canciones)", self.max_size);
        }

        info!("➕ Agregado a la cola: {}", item.title());
        self.items.push_back(item);
        Ok(())
    }

    /// Agrega múltiples tracks (playlist) hasta llenar la cola
    pub fn add_playlist(&mut self, items: Vec<QueueItem>) -> usize {
        let available_space = self.max_size.saturating_sub(self.items.len());
        let to_add = items.len().min(available_space);

        self.items.extend(items.into_iter().take(to_add));

        info!("➕ Agregadas {} canciones a la cola", to_add);
        to_add
    }

    /// Avanza al siguiente track (FIFO)
    pub fn next_track(&mut self) -> Option<&QueueItem> {
        self.current = self.items.pop_front();
        match &self.current {
            Some(item) => info!("➡️ Siguiente en cola (FIFO): {}", item.title()),
            None => info!("📭 Cola vacía, no hay siguiente track"),
        }
        self.current.as_ref()
    }

    /// Reemplaza el track actual sin tocar la cola
    pub fn set_current(&mut self, item: QueueItem) {
        self.current = Some(item);
    }

    /// Limpia la cola
    pub fn clear(&mut self) {
        self.items.clear();
        info!("🗑️ Cola limpiada");
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current.as_ref()
    }

    /// Copia de los tracks pendientes, en orden
    pub fn items(&self) -> Vec<QueueItem> {
        self.items.iter().cloned().collect()
    }

    /// Verifica si no hay nada pendiente ni sonando
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.current.is_none()
    }
}
