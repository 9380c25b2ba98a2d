use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::sources::registry::{self, Provider, ProviderId};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// True for absolute http(s) URLs.
pub fn is_url(query: &str) -> bool {
    Url::parse(query.trim()).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Per-request state for one resolution.
///
/// The engine may swap the provider during failover; everything else is
/// fixed at construction. Not shared between requests.
#[derive(Debug, Clone)]
pub struct QueryContext {
    query: String,
    provider: &'static Provider,
    requested: ProviderId,
    direct_url: bool,
}

impl QueryContext {
    pub fn new(query: impl Into<String>, provider: &'static Provider) -> Self {
        let query = query.into();
        let direct_url = is_url(&query);
        Self {
            query,
            provider,
            requested: provider.id,
            direct_url,
        }
    }

    /// Construye el contexto a partir de lo que escribió el usuario.
    ///
    /// URLs go to the provider owning their domain, `scsearch:`-style queries
    /// to the provider owning the prefix, anything else to `default_search`.
    pub fn from_user_input(raw: &str, default_search: ProviderId) -> Self {
        // Discord envuelve URLs en <> para evitar embeds
        let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>').trim();

        if is_url(trimmed) {
            return Self::new(trimmed, registry::match_provider(trimmed));
        }

        if let Some(provider) = registry::by_search_prefix(trimmed) {
            let prefix_len = provider.prefix.map_or(0, str::len);
            return Self::new(trimmed[prefix_len..].trim(), provider);
        }

        Self::new(trimmed, default_search.provider())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn provider(&self) -> &'static Provider {
        self.provider
    }

    /// Provider the request originally targeted, before any failover.
    pub fn requested_provider(&self) -> ProviderId {
        self.requested
    }

    pub fn set_provider(&mut self, provider: &'static Provider) {
        self.provider = provider;
    }

    pub fn is_direct_url(&self) -> bool {
        self.direct_url
    }

    pub fn is_search(&self) -> bool {
        !self.direct_url
    }

    /// Search results from a single-result provider keep only the first track.
    pub fn is_single_result_search(&self) -> bool {
        self.is_search() && self.provider.single_result_search
    }

    /// Query sent upstream: prefix + query for searches on searchable providers.
    pub fn full_query(&self) -> String {
        match self.provider.prefix {
            Some(prefix) if self.is_search() && self.provider.is_searchable() => {
                format!("{}{}", prefix, self.query)
            }
            _ => self.query.clone(),
        }
    }

    /// Query text used in the cache key.
    ///
    /// Searches ignore case and whitespace. URLs keep their path and query
    /// verbatim since video ids are case-sensitive; only scheme and host are
    /// lowercased.
    pub fn normalized_query(&self) -> String {
        let trimmed = self.query.trim();
        if self.direct_url {
            return Url::parse(trimmed).map_or_else(|_| trimmed.to_string(), String::from);
        }

        WHITESPACE.replace_all(trimmed, " ").to_lowercase()
    }

    /// Cache key: provider id + normalized query.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.provider.id, self.normalized_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_query_for_search() {
        let ctx = QueryContext::from_user_input("never gonna give you up", ProviderId::YouTube);
        assert!(ctx.is_search());
        assert_eq!(ctx.full_query(), "ytsearch:never gonna give you up");
    }

    #[test]
    fn test_full_query_for_url_is_verbatim() {
        let ctx = QueryContext::from_user_input("<https://youtu.be/dQw4w9WgXcQ>", ProviderId::YouTube);
        assert!(ctx.is_direct_url());
        assert_eq!(ctx.provider().id, ProviderId::YouTube);
        assert_eq!(ctx.full_query(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_non_searchable_provider_passes_raw_query() {
        let ctx = QueryContext::new("some words", ProviderId::Twitch.provider());
        assert_eq!(ctx.full_query(), "some words");
    }

    #[test]
    fn test_explicit_prefix_selects_provider() {
        let ctx = QueryContext::from_user_input("scsearch: lofi beats", ProviderId::YouTube);
        assert_eq!(ctx.provider().id, ProviderId::SoundCloud);
        assert_eq!(ctx.query(), "lofi beats");
        assert_eq!(ctx.full_query(), "scsearch:lofi beats");
    }

    #[test]
    fn test_provider_reassignment_changes_full_query() {
        let mut ctx = QueryContext::from_user_input("lofi", ProviderId::YouTube);
        ctx.set_provider(ProviderId::SoundCloud.provider());
        assert_eq!(ctx.full_query(), "scsearch:lofi");
        assert_eq!(ctx.requested_provider(), ProviderId::YouTube);
    }

    #[test]
    fn test_fingerprint_normalizes_query() {
        let a = QueryContext::from_user_input("  Never   Gonna\tGive You Up ", ProviderId::YouTube);
        let b = QueryContext::from_user_input("never gonna give you up", ProviderId::YouTube);
        assert_eq!(a.fingerprint(), "youtube:never gonna give you up");
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = QueryContext::from_user_input("never gonna give you up", ProviderId::SoundCloud);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_url_fingerprint_keeps_case_of_video_id() {
        let lower = QueryContext::from_user_input("https://youtu.be/dQw4w9WgXcQ", ProviderId::YouTube);
        let upper = QueryContext::from_user_input("https://youtu.be/DQW4W9WGXCQ", ProviderId::YouTube);
        assert_ne!(lower.fingerprint(), upper.fingerprint());
        assert_eq!(lower.fingerprint(), "youtube:https://youtu.be/dQw4w9WgXcQ");

        let host_case = QueryContext::from_user_input(" HTTPS://YOUTU.BE/dQw4w9WgXcQ ", ProviderId::YouTube);
        assert_eq!(host_case.fingerprint(), lower.fingerprint());
    }

    #[test]
    fn test_single_result_search() {
        let search = QueryContext::from_user_input("lofi", ProviderId::YouTube);
        assert!(search.is_single_result_search());

        let playlist = QueryContext::from_user_input("https://www.youtube.com/playlist?list=PL123", ProviderId::YouTube);
        assert!(!playlist.is_single_result_search());
    }
}
