//! # Session Module
//!
//! Point-in-time snapshots of a guild's playback, used to survive restarts.
//!
//! [`capture`] copies the live state up front, then encodes each track with
//! [`crate::codec`]. [`restore`] decodes entries back into a
//! [`PlaybackManager`] in the original order. Tracks that fail either way are
//! dropped and counted, never raised.
//!
//! Channel ids use `0` for "none", matching the persisted record.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::{debug, info, warn};

use crate::{
    audio::{player::PlaybackManager, queue::QueueItem},
    codec,
};

/// One encoded track with the user who asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// [`codec::encode`] bytes, base64
    pub encoded: String,
    pub requester_id: u64,
    pub position_ms: u64,
}

/// Persisted snapshot record for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub guild_id: u64,
    pub voice_channel_id: u64,
    pub message_channel_id: u64,
    pub volume: u8,
    pub playing_track: Option<SnapshotEntry>,
    pub queue: Vec<SnapshotEntry>,
}

impl SessionSnapshot {
    /// Nothing worth restoring.
    pub fn is_empty(&self) -> bool {
        self.playing_track.is_none() && self.queue.is_empty()
    }

    pub fn guild(&self) -> Option<GuildId> {
        (self.guild_id != 0).then(|| GuildId::new(self.guild_id))
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        (self.voice_channel_id != 0).then(|| ChannelId::new(self.voice_channel_id))
    }

    pub fn message_channel(&self) -> Option<ChannelId> {
        (self.message_channel_id != 0).then(|| ChannelId::new(self.message_channel_id))
    }
}

/// How many entries a capture or restore kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub kept: usize,
    pub dropped: usize,
}

fn encode_entry(item: &QueueItem, position_ms: u64) -> Option<SnapshotEntry> {
    let bytes = codec::encode(&item.track)?;
    Some(SnapshotEntry {
        encoded: STANDARD.encode(bytes),
        requester_id: item.requested_by.get(),
        position_ms,
    })
}

/// Captures `player`'s state for `guild_id`.
pub fn capture(guild_id: GuildId, player: &dyn PlaybackManager) -> (SessionSnapshot, SnapshotReport) {
    // Copia defensiva antes de serializar
    let playing = player.playing_track();
    let pending = player.queue();

    let mut report = SnapshotReport::default();
    let mut keep = |entry: Option<SnapshotEntry>| {
        match &entry {
            Some(_) => report.kept += 1,
            None => report.dropped += 1,
        }
        entry
    };

    let playing_track = playing.and_then(|now| keep(encode_entry(&now.item, now.position_ms)));
    let queue: Vec<SnapshotEntry> = pending
        .iter()
        .filter_map(|item| keep(encode_entry(item, 0)))
        .collect();

    let snapshot = SessionSnapshot {
        guild_id: guild_id.get(),
        voice_channel_id: player.voice_channel().map_or(0, ChannelId::get),
        message_channel_id: player.text_channel().map_or(0, ChannelId::get),
        volume: player.volume(),
        playing_track,
        queue,
    };

    if report.dropped > 0 {
        warn!(
            "⚠️ Snapshot de guild {}: {} tracks no representables descartados",
            guild_id, report.dropped
        );
    }
    debug!("📸 Snapshot capturado para guild {} ({} tracks)", guild_id, report.kept);

    (snapshot, report)
}

fn decode_entry(entry: &SnapshotEntry) -> Option<(crate::sources::AudioTrack, UserId)> {
    if entry.requester_id == 0 {
        return None;
    }
    let bytes = STANDARD.decode(&entry.encoded).ok()?;
    let track = codec::decode(&bytes)?;
    Some((track, UserId::new(entry.requester_id)))
}

/// Replays `snapshot` into `player`.
///
/// The playing track is restored first, then queued entries are enqueued one
/// by one so their order and requesters survive.
pub fn restore(snapshot: &SessionSnapshot, player: &dyn PlaybackManager) -> SnapshotReport {
    let mut report = SnapshotReport::default();

    player.set_volume(snapshot.volume);
    player.set_channels(snapshot.voice_channel(), snapshot.message_channel());

    if let Some(entry) = &snapshot.playing_track {
        match decode_entry(entry) {
            Some((track, requester)) => {
                player.restore_playing(track, requester, entry.position_ms);
                report.kept += 1;
            }
            None => report.dropped += 1,
        }
    }

    for entry in &snapshot.queue {
        let restored = decode_entry(entry)
            .map(|(track, requester)| player.enqueue(vec![track], requester));

        match restored {
            Some(Ok(added)) if added > 0 => report.kept += 1,
            Some(Err(e)) => {
                debug!("Entrada de snapshot no encolada: {}", e);
                report.dropped += 1;
            }
            _ => report.dropped += 1,
        }
    }

    info!(
        "♻️ Sesión restaurada para guild {}: {} tracks ({} descartados)",
        snapshot.guild_id, report.kept, report.dropped
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::player::GuildPlayer,
        sources::{test_support::track, AudioTrack},
    };
    use pretty_assertions::assert_eq;

    const GUILD: GuildId = GuildId::new(10);

    fn unencodable() -> AudioTrack {
        let mut info = track("youtube", "x", "X").info().clone();
        info.source = "local".to_string();
        AudioTrack::new(info)
    }

    #[test]
    fn test_capture_is_a_copy() {
        let player = GuildPlayer::new(GUILD, 10);
        player
            .enqueue(vec![track("youtube", "a", "A"), track("youtube", "b", "B")], UserId::new(1))
            .expect("enqueue");

        let (snapshot, report) = capture(GUILD, &player);
        player.enqueue(vec![track("youtube", "c", "C")], UserId::new(1)).expect("enqueue");

        assert_eq!(report, SnapshotReport { kept: 2, dropped: 0 });
        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(snapshot.voice_channel_id, 0);
        assert_eq!(snapshot.volume, 100);
    }

    #[test]
    fn test_unencodable_tracks_are_dropped() {
        let player = GuildPlayer::new(GUILD, 10);
        player
            .enqueue(vec![unencodable(), track("youtube", "b", "B")], UserId::new(1))
            .expect("enqueue");

        let (snapshot, report) = capture(GUILD, &player);
        assert!(snapshot.playing_track.is_none());
        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_restore_drops_bad_entries() {
        let good = STANDARD.encode(codec::encode(&track("youtube", "a", "A")).expect("encodable"));
        let snapshot = SessionSnapshot {
            guild_id: GUILD.get(),
            voice_channel_id: 5,
            message_channel_id: 0,
            volume: 80,
            playing_track: Some(SnapshotEntry {
                encoded: "not base64!".to_string(),
                requester_id: 1,
                position_ms: 10,
            }),
            queue: vec![
                SnapshotEntry { encoded: STANDARD.encode(b"garbage"), requester_id: 1, position_ms: 0 },
                SnapshotEntry { encoded: good.clone(), requester_id: 0, position_ms: 0 },
                SnapshotEntry { encoded: good, requester_id: 3, position_ms: 0 },
            ],
        };

        let player = GuildPlayer::new(GUILD, 10);
        let report = restore(&snapshot, &player);

        assert_eq!(report, SnapshotReport { kept: 1, dropped: 3 });
        assert_eq!(player.volume(), 80);
        assert_eq!(player.voice_channel(), Some(ChannelId::new(5)));
        assert_eq!(player.text_channel(), None);
        let now = player.playing_track().expect("queued entry started playing");
        assert_eq!(now.item.requested_by, UserId::new(3));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = SessionSnapshot {
            guild_id: 1,
            voice_channel_id: 2,
            message_channel_id: 3,
            volume: 100,
            playing_track: None,
            queue: Vec::new(),
        };
        let json = serde_json::to_value(&snapshot).expect("json");
        assert_eq!(json["guild_id"], 1);
        assert_eq!(json["message_channel_id"], 3);
        assert!(json["playing_track"].is_null());
        assert!(snapshot.is_empty());
    }
}
