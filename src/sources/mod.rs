//! # Sources Module
//!
//! Provider registry, the opaque track handle and the upstream loader seam.
//!
//! Every upstream integration implements [`UpstreamLoader`]: it receives the
//! fully-prefixed query (`ytsearch:...`, a URL, ...) and reports exactly one
//! [`LoadOutcome`] through a single callback. The resolution engine turns that
//! callback into an awaited future with a timeout.
//!
//! ## Loaders
//!
//! - [`ytdlp::YtDlpLoader`]: YouTube, YouTube Music, SoundCloud, Bandcamp,
//!   Twitch and Vimeo through the `yt-dlp` executable
//! - [`direct_url::HttpLoader`]: raw HTTP(S) audio URLs
//! - [`RoutingLoader`]: picks one of the above per query

pub mod direct_url;
pub mod registry;
pub mod ytdlp;

use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::UpstreamError;

pub use direct_url::HttpLoader;
pub use registry::{Provider, ProviderId};
pub use ytdlp::YtDlpLoader;

/// Metadata behind an [`AudioTrack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub author: String,
    pub length_ms: u64,
    pub identifier: String,
    pub is_stream: bool,
    pub uri: Option<String>,
    /// Name of the source that produced the track (`youtube`, `http`, ...)
    pub source: String,
}

/// Opaque, immutable handle to a playable resource.
///
/// Resolution only passes these around; the playback side is the one that
/// looks inside. Clones share the same allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioTrack {
    info: Arc<TrackInfo>,
}

impl AudioTrack {
    pub fn new(info: TrackInfo) -> Self {
        Self { info: Arc::new(info) }
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn duration(&self) -> Option<Duration> {
        (!self.info.is_stream).then(|| Duration::from_millis(self.info.length_ms))
    }
}

impl fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrack")
            .field("source", &self.info.source)
            .field("identifier", &self.info.identifier)
            .field("title", &self.info.title)
            .finish()
    }
}

/// Result of a resolution. "No match" is an empty playlist, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedPlaylist {
    pub selected: Option<usize>,
    pub tracks: Vec<AudioTrack>,
    /// Nombre de la playlist o etiqueta de la búsqueda
    pub label: String,
}

impl ResolvedPlaylist {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(track: AudioTrack) -> Self {
        Self {
            selected: Some(0),
            label: track.title().to_string(),
            tracks: vec![track],
        }
    }

    pub fn new(label: impl Into<String>, tracks: Vec<AudioTrack>, selected: Option<usize>) -> Self {
        Self {
            selected,
            tracks,
            label: label.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Mantiene solo el primer track (búsquedas de un solo resultado)
    pub fn first_only(mut self) -> Self {
        self.tracks.truncate(1);
        self.selected = self.selected.filter(|_| !self.tracks.is_empty()).map(|_| 0);
        self
    }
}

/// The single tagged outcome a loader reports for one query.
#[derive(Debug)]
pub enum LoadOutcome {
    TrackLoaded(AudioTrack),
    PlaylistLoaded(ResolvedPlaylist),
    NoMatches,
    LoadFailed(UpstreamError),
}

/// Callback invoked exactly once with the outcome of a load.
pub type LoadCallback = Box<dyn FnOnce(LoadOutcome) + Send + 'static>;

/// Handle to an in-flight upstream load.
///
/// Dropping it does not cancel the load.
pub struct LoadHandle {
    task: Option<JoinHandle<()>>,
}

impl LoadHandle {
    pub fn spawned(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// For loaders that already invoked the callback before returning.
    pub fn completed() -> Self {
        Self { task: None }
    }

    /// Cancela la carga si sigue en curso
    pub fn abort(&self) {
        if let Some(task) = self.task.as_ref().filter(|task| !task.is_finished()) {
            debug!("✂️ Cancelando carga pendiente");
            task.abort();
        }
    }
}

/// Upstream track loader.
pub trait UpstreamLoader: Send + Sync {
    /// Starts loading `query` and reports through `on_result` exactly once.
    fn load_item(&self, query: &str, on_result: LoadCallback) -> LoadHandle;

    fn name(&self) -> &'static str;
}

/// Sends raw URLs of unknown domains to the HTTP loader and everything else to yt-dlp.
pub struct RoutingLoader {
    ytdlp: Arc<dyn UpstreamLoader>,
    http: Arc<dyn UpstreamLoader>,
}

impl RoutingLoader {
    pub fn new(ytdlp: Arc<dyn UpstreamLoader>, http: Arc<dyn UpstreamLoader>) -> Self {
        Self { ytdlp, http }
    }

    fn route(&self, query: &str) -> &Arc<dyn UpstreamLoader> {
        let is_raw_url = crate::resolver::context::is_url(query)
            && registry::match_provider(query).id == registry::RAW_URL_PROVIDER;
        if is_raw_url {
            &self.http
        } else {
            &self.ytdlp
        }
    }
}

impl UpstreamLoader for RoutingLoader {
    fn load_item(&self, query: &str, on_result: LoadCallback) -> LoadHandle {
        let loader = self.route(query);
        debug!("🔀 Enrutando '{}' a {}", query, loader.name());
        loader.load_item(query, on_result)
    }

    fn name(&self) -> &'static str {
        "routing"
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::track;
    use super::*;
    use parking_lot::Mutex;

    struct NamedLoader {
        name: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl UpstreamLoader for NamedLoader {
        fn load_item(&self, query: &str, on_result: LoadCallback) -> LoadHandle {
            self.seen.lock().push(query.to_string());
            on_result(LoadOutcome::NoMatches);
            LoadHandle::completed()
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[test]
    fn test_first_only_keeps_first_track() {
        let playlist = ResolvedPlaylist::new(
            "search",
            vec![track("youtube", "a", "A"), track("youtube", "b", "B")],
            Some(1),
        );
        let trimmed = playlist.first_only();
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.tracks[0].title(), "A");
        assert_eq!(trimmed.selected, Some(0));

        assert_eq!(ResolvedPlaylist::empty().first_only().selected, None);
    }

    #[test]
    fn test_stream_has_no_duration() {
        let mut info = track("twitch", "live", "Live").info().clone();
        info.is_stream = true;
        assert_eq!(AudioTrack::new(info).duration(), None);
        assert_eq!(track("youtube", "a", "A").duration(), Some(Duration::from_millis(213_000)));
    }

    #[test]
    fn test_routing_sends_unknown_urls_to_http() {
        let ytdlp = Arc::new(NamedLoader { name: "ytdlp", seen: Mutex::new(Vec::new()) });
        let http = Arc::new(NamedLoader { name: "http", seen: Mutex::new(Vec::new()) });
        let router = RoutingLoader::new(ytdlp.clone(), http.clone());

        router.load_item("https://example.com/stream.mp3", Box::new(|_| {}));
        router.load_item("https://youtu.be/dQw4w9WgXcQ", Box::new(|_| {}));
        router.load_item("ytsearch:never gonna give you up", Box::new(|_| {}));

        assert_eq!(*http.seen.lock(), vec!["https://example.com/stream.mp3".to_string()]);
        assert_eq!(ytdlp.seen.lock().len(), 2);
    }
}
