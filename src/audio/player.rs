use anyhow::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::queue::{MusicQueue, QueueItem},
    sources::AudioTrack,
};

pub const DEFAULT_VOLUME: u8 = 100;
pub const MAX_VOLUME: u8 = 200;

/// Track currently playing and how far into it playback is.
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub item: QueueItem,
    pub position_ms: u64,
}

/// Per-guild playback controller as seen by request intake and session
/// snapshots.
pub trait PlaybackManager: Send + Sync {
    /// Appends tracks in order. Starts playback if nothing is playing.
    /// Returns how many tracks were accepted.
    fn enqueue(&self, tracks: Vec<AudioTrack>, requester: UserId) -> Result<usize>;

    fn is_paused(&self) -> bool;

    fn set_paused(&self, paused: bool);

    /// Copy of the pending queue, in play order.
    fn queue(&self) -> Vec<QueueItem>;

    fn playing_track(&self) -> Option<NowPlaying>;

    /// Volume in percent, `0..=200`.
    fn volume(&self) -> u8;

    fn set_volume(&self, volume: u8);

    fn voice_channel(&self) -> Option<ChannelId>;

    fn text_channel(&self) -> Option<ChannelId>;

    fn set_channels(&self, voice: Option<ChannelId>, text: Option<ChannelId>);

    /// Makes `track` the playing track at `position_ms` without touching the queue.
    fn restore_playing(&self, track: AudioTrack, requester: UserId, position_ms: u64);
}

#[derive(Debug)]
struct PlayerState {
    paused: bool,
    position_ms: u64,
    volume: u8,
    voice_channel: Option<ChannelId>,
    text_channel: Option<ChannelId>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            paused: false,
            position_ms: 0,
            volume: DEFAULT_VOLUME,
            voice_channel: None,
            text_channel: None,
        }
    }
}

/// In-process playback state for one guild.
#[derive(Debug)]
pub struct GuildPlayer {
    guild_id: GuildId,
    queue: RwLock<MusicQueue>,
    state: RwLock<PlayerState>,
}

impl GuildPlayer {
    pub fn new(guild_id: GuildId, max_queue_size: usize) -> Self {
        Self {
            guild_id,
            queue: RwLock::new(MusicQueue::new(max_queue_size)),
            state: RwLock::new(PlayerState::default()),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Avanza al siguiente track de la cola
    pub fn skip(&self) -> Option<QueueItem> {
        let next = self.queue.write().next_track().cloned();
        self.state.write().position_ms = 0;
        next
    }

    /// Detiene la reproducción y limpia la cola
    pub fn stop(&self) {
        let mut queue = self.queue.write();
        queue.clear();
        queue.next_track();
        self.state.write().position_ms = 0;
        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
    }

    /// Actualiza la posición reportada por el reproductor
    pub fn set_position(&self, position_ms: u64) {
        self.state.write().position_ms = position_ms;
    }

    pub fn is_idle(&self) -> bool {
        self.queue.read().is_empty()
    }
}

impl PlaybackManager for GuildPlayer {
    fn enqueue(&self, tracks: Vec<AudioTrack>, requester: UserId) -> Result<usize> {
        let items: Vec<QueueItem> = tracks
            .into_iter()
            .map(|track| QueueItem::new(track, requester))
            .collect();

        let mut queue = self.queue.write();
        let added = match items.len() {
            0 => 0,
            1 => {
                let item = items.into_iter().next().ok_or_else(|| anyhow::anyhow!("empty batch"))?;
                queue.add_track(item)?;
                1
            }
            _ => queue.add_playlist(items),
        };

        if added > 0 && queue.current().is_none() {
            if let Some(item) = queue.next_track() {
                info!("🎵 Reproduciendo: {}", item.title());
            }
            self.state.write().position_ms = 0;
        }

        Ok(added)
    }

    fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    fn set_paused(&self, paused: bool) {
        let mut state = self.state.write();
        if state.paused != paused {
            state.paused = paused;
            if paused {
                info!("⏸️ Reproducción pausada");
            } else {
                info!("▶️ Reproducción reanudada");
            }
        }
    }

    fn queue(&self) -> Vec<QueueItem> {
        self.queue.read().items()
    }

    fn playing_track(&self) -> Option<NowPlaying> {
        let item = self.queue.read().current().cloned()?;
        Some(NowPlaying {
            item,
            position_ms: self.state.read().position_ms,
        })
    }

    fn volume(&self) -> u8 {
        self.state.read().volume
    }

    fn set_volume(&self, volume: u8) {
        let clamped = volume.min(MAX_VOLUME);
        self.state.write().volume = clamped;
        info!("🔊 Volumen ajustado a {}%", clamped);
    }

    fn voice_channel(&self) -> Option<ChannelId> {
        self.state.read().voice_channel
    }

    fn text_channel(&self) -> Option<ChannelId> {
        self.state.read().text_channel
    }

    fn set_channels(&self, voice: Option<ChannelId>, text: Option<ChannelId>) {
        let mut state = self.state.write();
        state.voice_channel = voice;
        state.text_channel = text;
    }

    fn restore_playing(&self, track: AudioTrack, requester: UserId, position_ms: u64) {
        debug!("♻️ Restaurando '{}' en {}ms", track.title(), position_ms);
        self.queue.write().set_current(QueueItem::new(track, requester));
        self.state.write().position_ms = position_ms;
    }
}

/// Registry of guild players.
pub struct PlayerManager {
    players: DashMap<GuildId, Arc<GuildPlayer>>,
    max_queue_size: usize,
}

impl PlayerManager {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            players: DashMap::new(),
            max_queue_size,
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildPlayer> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| Arc::new(GuildPlayer::new(guild_id, self.max_queue_size)))
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.get(&guild_id).map(|player| player.clone())
    }

    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.remove(&guild_id).map(|(_, player)| player)
    }

    /// Guilds with a player, active or not.
    pub fn guilds(&self) -> Vec<GuildId> {
        self.players.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::track;

    const GUILD: GuildId = GuildId::new(1);
    const USER: UserId = UserId::new(7);

    #[test]
    fn test_enqueue_starts_when_idle() {
        let player = GuildPlayer::new(GUILD, 10);
        player.set_position(5_000);

        let added = player
            .enqueue(vec![track("youtube", "a", "A"), track("youtube", "b", "B")], USER)
            .expect("enqueue");

        assert_eq!(added, 2);
        let now = player.playing_track().expect("playing");
        assert_eq!(now.item.title(), "A");
        assert_eq!(now.item.requested_by, USER);
        assert_eq!(now.position_ms, 0);
        assert_eq!(player.queue().len(), 1);
    }

    #[test]
    fn test_enqueue_while_playing_only_appends() {
        let player = GuildPlayer::new(GUILD, 10);
        player.enqueue(vec![track("youtube", "a", "A")], USER).expect("enqueue");
        player.set_position(1_000);
        player.enqueue(vec![track("youtube", "b", "B")], USER).expect("enqueue");

        let now = player.playing_track().expect("playing");
        assert_eq!(now.item.title(), "A");
        assert_eq!(now.position_ms, 1_000);
        assert_eq!(player.queue()[0].title(), "B");
    }

    #[test]
    fn test_single_track_into_full_queue_fails() {
        let player = GuildPlayer::new(GUILD, 1);
        player.enqueue(vec![track("youtube", "a", "A")], USER).expect("starts playing");
        player.enqueue(vec![track("youtube", "b", "B")], USER).expect("queued");
        assert!(player.enqueue(vec![track("youtube", "c", "C")], USER).is_err());
    }

    #[test]
    fn test_restore_playing_keeps_queue() {
        let player = GuildPlayer::new(GUILD, 10);
        player.restore_playing(track("youtube", "a", "A"), USER, 42_000);
        player.enqueue(vec![track("youtube", "b", "B")], USER).expect("enqueue");

        let now = player.playing_track().expect("playing");
        assert_eq!(now.item.title(), "A");
        assert_eq!(now.position_ms, 42_000);
        assert_eq!(player.queue().len(), 1);
    }

    #[test]
    fn test_volume_is_clamped_and_pause_toggles() {
        let player = GuildPlayer::new(GUILD, 10);
        assert_eq!(player.volume(), DEFAULT_VOLUME);
        player.set_volume(250);
        assert_eq!(player.volume(), MAX_VOLUME);

        player.set_paused(true);
        assert!(player.is_paused());
        player.set_paused(false);
        assert!(!player.is_paused());
    }

    #[test]
    fn test_skip_and_stop() {
        let player = GuildPlayer::new(GUILD, 10);
        player
            .enqueue(vec![track("youtube", "a", "A"), track("youtube", "b", "B")], USER)
            .expect("enqueue");

        assert_eq!(player.skip().map(|i| i.title().to_string()), Some("B".to_string()));
        player.stop();
        assert!(player.is_idle());
        assert!(player.playing_track().is_none());
    }

    #[test]
    fn test_manager_reuses_players() {
        let manager = PlayerManager::new(10);
        let first = manager.get_or_create(GUILD);
        let second = manager.get_or_create(GUILD);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.guilds(), vec![GUILD]);
        assert!(manager.remove(GUILD).is_some());
        assert!(manager.get(GUILD).is_none());
    }
}
