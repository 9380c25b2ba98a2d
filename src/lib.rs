//! # Open Music Resolver
//!
//! Turns user queries and URLs into playable tracks for the Open Music bot:
//! provider matching, a two-tier result cache, failover between providers
//! under throttling, and playback sessions that survive restarts.
//!
//! ```text
//! bot::intake ──► resolver ──► cooldown ─► cache ─► sources (yt-dlp / http)
//!      │                                              │
//!      ▼                                              ▼
//! audio::player ◄── session ◄── codec          classify ─► cooldown
//! ```

pub mod audio;
pub mod bot;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod resolver;
pub mod session;
pub mod sources;
pub mod storage;
pub mod ui;

pub use error::{ResolveError, UpstreamError, UpstreamErrorKind};
pub use resolver::{context::QueryContext, ResolveOptions, Resolver, ResolverConfig};
pub use sources::{AudioTrack, ResolvedPlaylist};
