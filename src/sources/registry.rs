use serde::{Deserialize, Serialize};
use std::fmt;

/// Identificador estable de cada proveedor de audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    YouTubeMusic,
    YouTube,
    SoundCloud,
    Bandcamp,
    Twitch,
    Vimeo,
    Http,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::YouTubeMusic => "youtube_music",
            ProviderId::YouTube => "youtube",
            ProviderId::SoundCloud => "soundcloud",
            ProviderId::Bandcamp => "bandcamp",
            ProviderId::Twitch => "twitch",
            ProviderId::Vimeo => "vimeo",
            ProviderId::Http => "http",
        }
    }

    pub fn provider(&self) -> &'static Provider {
        // PROVIDERS sigue el mismo orden que la enum
        &PROVIDERS[*self as usize]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upstream source of audio.
///
/// The set is fixed at compile time; see [`PROVIDERS`].
#[derive(Debug, PartialEq, Eq)]
pub struct Provider {
    pub id: ProviderId,
    /// Search prefix understood by the upstream loader (`ytsearch:` etc.)
    pub prefix: Option<&'static str>,
    pub domains: &'static [&'static str],
    /// Search results from this provider keep only their first track.
    pub single_result_search: bool,
}

impl Provider {
    pub fn is_searchable(&self) -> bool {
        self.prefix.is_some() && !self.domains.is_empty()
    }

    /// Case-insensitive substring match against the domain list.
    pub fn matches(&self, url_or_track: &str) -> bool {
        let lower = url_or_track.to_lowercase();
        self.domains.iter().any(|domain| lower.contains(domain))
    }
}

/// Proveedores en orden de coincidencia: los dominios más específicos van primero
pub static PROVIDERS: [Provider; 7] = [
    Provider {
        id: ProviderId::YouTubeMusic,
        prefix: Some("ytmsearch:"),
        domains: &["music.youtube.com"],
        single_result_search: true,
    },
    Provider {
        id: ProviderId::YouTube,
        prefix: Some("ytsearch:"),
        domains: &["youtube.com", "youtu.be"],
        single_result_search: true,
    },
    Provider {
        id: ProviderId::SoundCloud,
        prefix: Some("scsearch:"),
        domains: &["soundcloud.com"],
        single_result_search: true,
    },
    Provider {
        id: ProviderId::Bandcamp,
        prefix: Some("bcsearch:"),
        domains: &["bandcamp.com"],
        single_result_search: false,
    },
    Provider {
        id: ProviderId::Twitch,
        prefix: None,
        domains: &["twitch.tv"],
        single_result_search: false,
    },
    Provider {
        id: ProviderId::Vimeo,
        prefix: None,
        domains: &["vimeo.com"],
        single_result_search: false,
    },
    Provider {
        id: ProviderId::Http,
        prefix: None,
        domains: &[],
        single_result_search: false,
    },
];

/// Fallback for URLs that match no provider domain.
pub const RAW_URL_PROVIDER: ProviderId = ProviderId::Http;

/// Proveedor sujeto a cooldown por rate limiting
pub const COOLDOWN_TRACKED: ProviderId = ProviderId::YouTube;

/// Returns the provider whose domains match `url_or_track`, or the raw-URL default.
pub fn match_provider(url_or_track: &str) -> &'static Provider {
    PROVIDERS
        .iter()
        .find(|provider| provider.matches(url_or_track))
        .unwrap_or_else(|| RAW_URL_PROVIDER.provider())
}

pub fn is_searchable(provider: &Provider) -> bool {
    provider.is_searchable()
}

/// Busca un proveedor por nombre (sin distinguir mayúsculas)
pub fn by_name(name: &str) -> Option<&'static Provider> {
    let name = name.trim();
    PROVIDERS
        .iter()
        .find(|provider| provider.id.as_str().eq_ignore_ascii_case(name))
}

/// Provider whose search prefix starts `query`, if any (`scsearch:foo`).
pub fn by_search_prefix(query: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|provider| {
        provider
            .prefix
            .is_some_and(|prefix| query.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)))
    })
}

/// The other half of the failover pair, if `id` participates in it.
pub fn failover_partner(id: ProviderId) -> Option<ProviderId> {
    match id {
        ProviderId::YouTube => Some(ProviderId::SoundCloud),
        ProviderId::SoundCloud => Some(ProviderId::YouTube),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (index, provider) in PROVIDERS.iter().enumerate() {
            assert_eq!(provider.id as usize, index);
            assert_eq!(provider.id.provider(), provider);
        }
    }

    #[test]
    fn test_domain_urls_resolve_to_their_provider() {
        for provider in PROVIDERS.iter().filter(|p| !p.domains.is_empty()) {
            for domain in provider.domains {
                let url = format!("https://{}/some/path?x=1", domain);
                assert_eq!(match_provider(&url).id, provider.id, "url {}", url);
            }
        }
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(match_provider("https://WWW.YouTube.COM/watch?v=dQw4w9WgXcQ").id, ProviderId::YouTube);
        assert_eq!(match_provider("https://music.youtube.com/watch?v=test").id, ProviderId::YouTubeMusic);
        assert_eq!(match_provider("https://YOUTU.BE/dQw4w9WgXcQ").id, ProviderId::YouTube);
    }

    #[test]
    fn test_unknown_urls_fall_back_to_raw_url() {
        assert_eq!(match_provider("https://example.com/song.mp3").id, ProviderId::Http);
        assert_eq!(match_provider("never gonna give you up").id, ProviderId::Http);
    }

    #[test]
    fn test_searchability() {
        assert!(is_searchable(ProviderId::YouTube.provider()));
        assert!(is_searchable(ProviderId::Bandcamp.provider()));
        assert!(!is_searchable(ProviderId::Twitch.provider()));
        assert!(!is_searchable(ProviderId::Http.provider()));
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(by_name("SoundCloud").map(|p| p.id), Some(ProviderId::SoundCloud));
        assert_eq!(by_name(" youtube_music ").map(|p| p.id), Some(ProviderId::YouTubeMusic));
        assert!(by_name("napster").is_none());
    }

    #[test]
    fn test_lookup_by_search_prefix() {
        assert_eq!(by_search_prefix("scsearch:lofi").map(|p| p.id), Some(ProviderId::SoundCloud));
        assert_eq!(by_search_prefix("YTSEARCH:lofi").map(|p| p.id), Some(ProviderId::YouTube));
        assert!(by_search_prefix("lofi beats").is_none());
        assert!(by_search_prefix("yt").is_none());
    }

    #[test]
    fn test_failover_pair_is_symmetric() {
        assert_eq!(failover_partner(ProviderId::YouTube), Some(ProviderId::SoundCloud));
        assert_eq!(failover_partner(ProviderId::SoundCloud), Some(ProviderId::YouTube));
        assert_eq!(failover_partner(ProviderId::Vimeo), None);
    }
}
