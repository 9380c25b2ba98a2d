// Cliente de URL directa: verifica que la URL sirva audio antes de aceptarla

use reqwest::{header::CONTENT_TYPE, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{
    registry::RAW_URL_PROVIDER, AudioTrack, LoadCallback, LoadHandle, LoadOutcome, TrackInfo,
    UpstreamLoader,
};
use crate::error::{UpstreamError, UpstreamErrorKind};

const AUDIO_EXTENSIONS: [&str; 6] = [".mp3", ".wav", ".ogg", ".flac", ".m4a", ".opus"];

/// Loader for plain HTTP(S) audio URLs.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn is_valid_url(url: &str) -> bool {
        Url::parse(url).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"))
    }

    async fn probe(client: reqwest::Client, url: String) -> LoadOutcome {
        if !Self::is_valid_url(&url) {
            return LoadOutcome::NoMatches;
        }

        let response = match client.head(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                return LoadOutcome::LoadFailed(
                    UpstreamError::other(format!("request to {} failed", url)).with_source(e),
                )
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_lowercase);

        outcome_for_response(&url, status, content_type.as_deref())
    }
}

fn outcome_for_response(url: &str, status: StatusCode, content_type: Option<&str>) -> LoadOutcome {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => return LoadOutcome::NoMatches,
        StatusCode::TOO_MANY_REQUESTS => {
            return LoadOutcome::LoadFailed(UpstreamError::new(
                UpstreamErrorKind::RateLimited,
                format!("rate limit reached for {}", url),
            ))
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            return LoadOutcome::LoadFailed(UpstreamError::new(
                UpstreamErrorKind::Overloaded,
                format!("{} answered 503", url),
            ))
        }
        status if !status.is_success() => {
            return LoadOutcome::LoadFailed(UpstreamError::other(format!(
                "{} answered {}",
                url, status
            )))
        }
        _ => {}
    }

    let lower = url.to_lowercase();
    let looks_like_audio = content_type.is_some_and(is_audio_content_type)
        || AUDIO_EXTENSIONS.iter().any(|ext| lower.split('?').next().is_some_and(|path| path.ends_with(ext)));

    if !looks_like_audio {
        debug!("📭 {} no parece ser audio ({:?})", url, content_type);
        return LoadOutcome::NoMatches;
    }

    // Las radios (icecast, HLS) no declaran duración
    let is_stream = content_type.is_some_and(|ct| ct.contains("mpegurl") || ct.contains("aacp"))
        || !AUDIO_EXTENSIONS.iter().any(|ext| lower.contains(ext));

    LoadOutcome::TrackLoaded(AudioTrack::new(TrackInfo {
        title: title_from_url(url),
        author: "Unknown artist".to_string(),
        length_ms: 0,
        identifier: url.to_string(),
        is_stream,
        uri: Some(url.to_string()),
        source: RAW_URL_PROVIDER.as_str().to_string(),
    }))
}

fn is_audio_content_type(content_type: &str) -> bool {
    content_type.starts_with("audio/")
        || content_type.contains("ogg")
        || content_type.contains("mpegurl")
}

fn title_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| url.to_string())
}

impl UpstreamLoader for HttpLoader {
    fn load_item(&self, query: &str, on_result: LoadCallback) -> LoadHandle {
        let client = self.client.clone();
        let url = query.trim().to_string();
        info!("🌐 Verificando URL directa: {}", url);

        LoadHandle::spawned(tokio::spawn(async move {
            on_result(Self::probe(client, url).await);
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(HttpLoader::is_valid_url("https://example.com/song.mp3"));
        assert!(!HttpLoader::is_valid_url("ftp://example.com/song.mp3"));
        assert!(!HttpLoader::is_valid_url("never gonna give you up"));
    }

    #[test]
    fn test_audio_file_becomes_track() {
        match outcome_for_response("https://example.com/music/song.mp3", StatusCode::OK, Some("audio/mpeg")) {
            LoadOutcome::TrackLoaded(track) => {
                assert_eq!(track.title(), "song.mp3");
                assert_eq!(track.info().source, "http");
                assert!(!track.info().is_stream);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_radio_stream_is_marked_as_stream() {
        match outcome_for_response("https://radio.example.com/live", StatusCode::OK, Some("audio/aacp")) {
            LoadOutcome::TrackLoaded(track) => assert!(track.info().is_stream),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_status_codes_map_to_outcomes() {
        let url = "https://example.com/a.mp3";
        assert!(matches!(outcome_for_response(url, StatusCode::NOT_FOUND, None), LoadOutcome::NoMatches));
        assert!(matches!(
            outcome_for_response(url, StatusCode::TOO_MANY_REQUESTS, None),
            LoadOutcome::LoadFailed(UpstreamError { kind: UpstreamErrorKind::RateLimited, .. })
        ));
        assert!(matches!(
            outcome_for_response(url, StatusCode::SERVICE_UNAVAILABLE, None),
            LoadOutcome::LoadFailed(UpstreamError { kind: UpstreamErrorKind::Overloaded, .. })
        ));
        assert!(matches!(
            outcome_for_response(url, StatusCode::FORBIDDEN, None),
            LoadOutcome::LoadFailed(UpstreamError { kind: UpstreamErrorKind::Other, .. })
        ));
    }

    #[test]
    fn test_html_page_is_no_match() {
        assert!(matches!(
            outcome_for_response("https://example.com/", StatusCode::OK, Some("text/html")),
            LoadOutcome::NoMatches
        ));
    }
}
