use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    registry::{self, ProviderId},
    AudioTrack, LoadCallback, LoadHandle, LoadOutcome, ResolvedPlaylist, TrackInfo, UpstreamLoader,
};
use crate::error::{UpstreamError, UpstreamErrorKind};

static HTTP_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"HTTP Error (\d{3})").expect("valid regex"));

/// Loader que delega en el ejecutable `yt-dlp`
#[derive(Debug, Clone)]
pub struct YtDlpLoader {
    executable: String,
    search_results: usize,
}

/// Subset of the `--dump-single-json` document we care about.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
    webpage_url: Option<String>,
    is_live: Option<bool>,
    live_status: Option<String>,
    entries: Option<Vec<YtDlpEntry>>,
}

impl YtDlpLoader {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            search_results: 5,
        }
    }

    pub fn with_search_results(mut self, search_results: usize) -> Self {
        self.search_results = search_results.max(1);
        self
    }

    /// Verifica que el ejecutable responda y devuelve su versión
    pub async fn version(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.executable).arg("--version").output().await?;
        if !output.status.success() {
            anyhow::bail!("{} --version terminó con {}", self.executable, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Traduce el query con prefijo a un objetivo que yt-dlp entiende.
    ///
    /// Returns the target together with the provider the tracks belong to.
    fn build_target(&self, query: &str) -> (String, ProviderId) {
        if let Some(provider) = registry::by_search_prefix(query) {
            let prefix_len = provider.prefix.map_or(0, str::len);
            let terms = query[prefix_len..].trim();
            let target = match provider.id {
                ProviderId::YouTube => format!("ytsearch{}:{}", self.search_results, terms),
                ProviderId::SoundCloud => format!("scsearch{}:{}", self.search_results, terms),
                ProviderId::YouTubeMusic => search_url("https://music.youtube.com/search", &[("q", terms)]),
                ProviderId::Bandcamp => search_url("https://bandcamp.com/search", &[("q", terms), ("item_type", "t")]),
                _ => terms.to_string(),
            };
            return (target, provider.id);
        }

        (query.to_string(), registry::match_provider(query).id)
    }

    async fn run(executable: String, target: String, provider: ProviderId) -> LoadOutcome {
        info!("🔧 yt-dlp cargando: {}", target);

        let output = Command::new(&executable)
            .kill_on_drop(true)
            .args([
                "--dump-single-json",
                "--flat-playlist",
                "--no-warnings",
                "--ignore-config",
                "--",
                target.as_str(),
            ])
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("❌ No se pudo ejecutar {}: {}", executable, e);
                return LoadOutcome::LoadFailed(
                    UpstreamError::other(format!("failed to spawn {}", executable)).with_source(e),
                );
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("❌ yt-dlp falló con status {}: {}", output.status, stderr);
            return LoadOutcome::LoadFailed(error_from_stderr(&stderr));
        }

        parse_output(&output.stdout, provider)
    }
}

fn search_url(base: &str, params: &[(&str, &str)]) -> String {
    Url::parse_with_params(base, params)
        .map(String::from)
        .unwrap_or_else(|_| base.to_string())
}

/// Maps yt-dlp stderr onto a structured upstream error.
fn error_from_stderr(stderr: &str) -> UpstreamError {
    let kind = match HTTP_ERROR
        .captures(stderr)
        .and_then(|caps| caps.get(1))
        .map(|status| status.as_str())
    {
        Some("429") => UpstreamErrorKind::RateLimited,
        Some("503") => UpstreamErrorKind::Overloaded,
        _ => UpstreamErrorKind::Other,
    };

    let message = if stderr.is_empty() {
        "yt-dlp exited with a non-zero status".to_string()
    } else {
        stderr.to_string()
    };
    UpstreamError::new(kind, message)
}

fn parse_output(stdout: &[u8], provider: ProviderId) -> LoadOutcome {
    let root: YtDlpEntry = match serde_json::from_slice(stdout) {
        Ok(root) => root,
        Err(e) => {
            return LoadOutcome::LoadFailed(
                UpstreamError::other("yt-dlp produced unreadable output").with_source(e),
            )
        }
    };

    match root.kind.as_deref() {
        Some("playlist") => {
            let label = root.title.clone().unwrap_or_default();
            let tracks: Vec<AudioTrack> = root
                .entries
                .unwrap_or_default()
                .into_iter()
                .filter_map(|entry| entry_to_track(entry, provider))
                .collect();

            if tracks.is_empty() {
                debug!("📭 yt-dlp no devolvió resultados");
                LoadOutcome::NoMatches
            } else {
                LoadOutcome::PlaylistLoaded(ResolvedPlaylist::new(label, tracks, None))
            }
        }
        _ => match entry_to_track(root, provider) {
            Some(track) => LoadOutcome::TrackLoaded(track),
            None => LoadOutcome::NoMatches,
        },
    }
}

fn entry_to_track(entry: YtDlpEntry, provider: ProviderId) -> Option<AudioTrack> {
    let identifier = entry.id?;
    let is_stream = entry.is_live.unwrap_or(false) || entry.live_status.as_deref() == Some("is_live");
    let uri = entry.webpage_url.or(entry.url);

    Some(AudioTrack::new(TrackInfo {
        title: entry.title.unwrap_or_else(|| "Unknown title".to_string()),
        author: entry
            .uploader
            .or(entry.channel)
            .unwrap_or_else(|| "Unknown artist".to_string()),
        length_ms: entry.duration.map_or(0, |secs| (secs * 1000.0) as u64),
        identifier,
        is_stream,
        uri,
        source: provider.as_str().to_string(),
    }))
}

impl UpstreamLoader for YtDlpLoader {
    fn load_item(&self, query: &str, on_result: LoadCallback) -> LoadHandle {
        let (target, provider) = self.build_target(query);
        let executable = self.executable.clone();

        LoadHandle::spawned(tokio::spawn(async move {
            let outcome = Self::run(executable, target, provider).await;
            on_result(outcome);
        }))
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_prefixes_become_ytdlp_targets() {
        let loader = YtDlpLoader::new("yt-dlp");

        let (target, provider) = loader.build_target("ytsearch:never gonna give you up");
        assert_eq!(target, "ytsearch5:never gonna give you up");
        assert_eq!(provider, ProviderId::YouTube);

        let (target, provider) = loader.build_target("scsearch: lofi");
        assert_eq!(target, "scsearch5:lofi");
        assert_eq!(provider, ProviderId::SoundCloud);

        let (target, provider) = loader.build_target("ytmsearch:daft punk");
        assert_eq!(target, "https://music.youtube.com/search?q=daft+punk");
        assert_eq!(provider, ProviderId::YouTubeMusic);
    }

    #[test]
    fn test_urls_pass_through() {
        let loader = YtDlpLoader::new("yt-dlp").with_search_results(1);
        let (target, provider) = loader.build_target("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(target, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(provider, ProviderId::YouTube);
    }

    #[test]
    fn test_stderr_classification() {
        let err = error_from_stderr("ERROR: [youtube] abc: HTTP Error 429: Too Many Requests");
        assert_eq!(err.kind, UpstreamErrorKind::RateLimited);

        let err = error_from_stderr("ERROR: Unable to download webpage: HTTP Error 503: Service Unavailable");
        assert_eq!(err.kind, UpstreamErrorKind::Overloaded);

        let err = error_from_stderr("ERROR: Video unavailable");
        assert_eq!(err.kind, UpstreamErrorKind::Other);
        assert_eq!(err.message, "ERROR: Video unavailable");
    }

    #[test]
    fn test_parse_search_playlist() {
        let json = br#"{
            "_type": "playlist",
            "title": "never gonna give you up",
            "entries": [
                {"_type": "url", "id": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up",
                 "channel": "Rick Astley", "duration": 213.0,
                 "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"},
                {"_type": "url", "title": "missing id"}
            ]
        }"#;

        match parse_output(json, ProviderId::YouTube) {
            LoadOutcome::PlaylistLoaded(playlist) => {
                assert_eq!(playlist.label, "never gonna give you up");
                assert_eq!(playlist.len(), 1);
                let info = playlist.tracks[0].info();
                assert_eq!(info.author, "Rick Astley");
                assert_eq!(info.length_ms, 213_000);
                assert_eq!(info.source, "youtube");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_track_and_empty_search() {
        let json = br#"{"id": "abc", "title": "Live", "uploader": "Someone", "is_live": true,
                        "webpage_url": "https://www.twitch.tv/someone"}"#;
        match parse_output(json, ProviderId::Twitch) {
            LoadOutcome::TrackLoaded(track) => {
                assert!(track.info().is_stream);
                assert_eq!(track.info().uri.as_deref(), Some("https://www.twitch.tv/someone"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let empty = br#"{"_type": "playlist", "title": "nothing", "entries": []}"#;
        assert!(matches!(parse_output(empty, ProviderId::YouTube), LoadOutcome::NoMatches));
    }

    #[test]
    fn test_garbage_output_is_a_failure() {
        assert!(matches!(
            parse_output(b"not json", ProviderId::YouTube),
            LoadOutcome::LoadFailed(_)
        ));
    }
}
