//! # Audio Module
//!
//! In-process playback state for each guild.
//!
//! ### [`player`] - Playback Manager
//! - [`player::PlaybackManager`]: the contract request intake and session
//!   snapshots program against
//! - [`player::GuildPlayer`]: queue, now-playing, pause, volume and channels
//!   for one guild
//! - [`player::PlayerManager`]: concurrent registry of guild players
//!
//! ### [`queue`] - Queue Management
//! - FIFO queue with a bounded size
//! - Current track and pending queue
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use open_music_resolver::audio::player::{PlaybackManager, PlayerManager};
//! use serenity::all::{GuildId, UserId};
//!
//! # fn example(tracks: Vec<open_music_resolver::sources::AudioTrack>) -> anyhow::Result<()> {
//! let players = PlayerManager::new(100);
//! let player = players.get_or_create(GuildId::new(123456789));
//!
//! player.enqueue(tracks, UserId::new(42))?;
//! player.set_paused(true);
//! # Ok(())
//! # }
//! ```

pub mod player;
pub mod queue;
