use anyhow::{Context, Result};
use std::{collections::HashSet, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    resolver::ResolverConfig,
    sources::{registry, ProviderId},
};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Caché
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub durable_cache_ttl: Duration,
    pub cache_promote_durable_hits: bool,

    // Resolución
    pub load_timeout: Duration,
    pub cooldown: Duration,
    pub disabled_providers: HashSet<ProviderId>,
    pub default_search_provider: ProviderId,

    // Paths
    pub data_dir: PathBuf,
    pub ytdlp_path: PathBuf,

    // Cola
    pub max_queue_size: usize,
}

fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("valor inválido para {}", key))
}

fn parse_provider(name: &str) -> Result<ProviderId> {
    registry::by_name(name)
        .map(|provider| provider.id)
        .ok_or_else(|| anyhow::anyhow!("proveedor desconocido: {}", name))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let disabled_providers = std::env::var("DISABLED_PROVIDERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(parse_provider)
            .collect::<Result<HashSet<_>>>()?;

        let config = Self {
            // Discord (el token solo lo exige el binario)
            discord_token: std::env::var("DISCORD_TOKEN").unwrap_or_default(),
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),

            cache_size: env_or("CACHE_SIZE", "500")?,
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL", "3600")?),
            durable_cache_ttl: Duration::from_secs(env_or("DURABLE_CACHE_TTL", "604800")?),
            cache_promote_durable_hits: env_or("CACHE_PROMOTE_DURABLE_HITS", "false")?,

            load_timeout: Duration::from_millis(env_or("LOAD_TIMEOUT_MS", "3000")?),
            cooldown: Duration::from_secs(60 * env_or::<u64>("COOLDOWN_MINUTES", "10")?),
            disabled_providers,
            default_search_provider: parse_provider(
                &std::env::var("DEFAULT_SEARCH_PROVIDER").unwrap_or_else(|_| "youtube".to_string()),
            )?,

            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            ytdlp_path: std::env::var("YTDLP_PATH")
                .unwrap_or_else(|_| "yt-dlp".to_string())
                .into(),

            max_queue_size: env_or("MAX_QUEUE_SIZE", "1000")?,
        };

        // Create directories if they don't exist
        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Cache size, TTLs, load timeout, cooldown and queue size must be > 0
    /// - The default search provider must be searchable and enabled
    pub fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        if self.cache_ttl.is_zero() || self.durable_cache_ttl.is_zero() {
            anyhow::bail!("Cache TTLs must be greater than 0");
        }

        if self.load_timeout.is_zero() {
            anyhow::bail!("Load timeout must be greater than 0");
        }

        if self.cooldown.is_zero() {
            anyhow::bail!("Cooldown must be greater than 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if !self.default_search_provider.provider().is_searchable() {
            anyhow::bail!(
                "Default search provider {} cannot search",
                self.default_search_provider
            );
        }

        if self.disabled_providers.contains(&self.default_search_provider) {
            anyhow::bail!(
                "Default search provider {} is disabled",
                self.default_search_provider
            );
        }

        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            load_timeout: self.load_timeout,
            cooldown: self.cooldown,
            disabled: self.disabled_providers.clone(),
            ..ResolverConfig::default()
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        let mut disabled: Vec<&str> = self.disabled_providers.iter().map(ProviderId::as_str).collect();
        disabled.sort_unstable();

        format!(
            "Config Summary:\n  \
            Cache: {} entries, TTL {}, durable TTL {}, promote={}\n  \
            Resolution: timeout {}ms, cooldown {}, search via {}\n  \
            Disabled providers: {}\n  \
            Data: {}, yt-dlp: {}\n  \
            Limits: {} queue, prefix '{}'",
            self.cache_size,
            humantime::format_duration(self.cache_ttl),
            humantime::format_duration(self.durable_cache_ttl),
            self.cache_promote_durable_hits,
            self.load_timeout.as_millis(),
            humantime::format_duration(self.cooldown),
            self.default_search_provider,
            if disabled.is_empty() { "none".to_string() } else { disabled.join(", ") },
            self.data_dir.display(),
            self.ytdlp_path.display(),
            self.max_queue_size,
            self.command_prefix,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            command_prefix: "!".to_string(),

            cache_size: 500,
            cache_ttl: Duration::from_secs(3600),
            durable_cache_ttl: Duration::from_secs(7 * 24 * 3600),
            cache_promote_durable_hits: false,

            load_timeout: Duration::from_millis(3000),
            cooldown: Duration::from_secs(10 * 60),
            disabled_providers: HashSet::new(),
            default_search_provider: ProviderId::YouTube,

            data_dir: "./data".into(),
            ytdlp_path: "yt-dlp".into(),

            max_queue_size: 1000,
        }
    }
}
