//! # Resolver Module
//!
//! Cache-first resolution of user queries into playable tracks.
//!
//! [`Resolver::resolve`] walks a fixed sequence:
//!
//! 1. **Validate**: a disabled provider fails over once to its partner
//!    (YouTube ⇄ SoundCloud), except for direct URLs which fail with
//!    "unsupported provider".
//! 2. **Cooldown**: a cooling-down provider fails direct URLs immediately and
//!    silently swaps searches to the partner.
//! 3. **Cache**: unless opted out, a cache hit returns straight away.
//! 4. **Dispatch**: the upstream loader runs with a hard timeout.
//! 5. **Classify**: failures become [`ResolveError`]s; throttling on the
//!    tracked provider starts a cooldown. Failures are always returned.
//! 6. **Store**: non-empty results go into the cache.
//!
//! A load that misses the timeout keeps running. If it finishes within the
//! grace window its result still lands in the cache.

pub mod classify;
pub mod context;
pub mod cooldown;

use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{sync::oneshot, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    cache::ResultCache,
    error::{ResolveError, UpstreamError},
    monitoring::{self, MetricsSink, Outcome},
    sources::{
        registry::{self, ProviderId},
        LoadHandle, LoadOutcome, ResolvedPlaylist, UpstreamLoader,
    },
};
use context::QueryContext;
use cooldown::CooldownGovernor;

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub load_timeout: Duration,
    pub cooldown: Duration,
    /// Cuánto se espera un resultado tardío para guardarlo en caché
    pub late_result_grace: Duration,
    pub disabled: HashSet<ProviderId>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_millis(3000),
            cooldown: Duration::from_secs(10 * 60),
            late_result_grace: Duration::from_secs(60),
            disabled: HashSet::new(),
        }
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub use_cache: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

pub struct Resolver {
    loader: Arc<dyn UpstreamLoader>,
    cache: Arc<ResultCache>,
    cooldown: Arc<CooldownGovernor>,
    metrics: Arc<dyn MetricsSink>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        loader: Arc<dyn UpstreamLoader>,
        cache: Arc<ResultCache>,
        cooldown: Arc<CooldownGovernor>,
        metrics: Arc<dyn MetricsSink>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            loader,
            cache,
            cooldown,
            metrics,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn cooldown(&self) -> &Arc<CooldownGovernor> {
        &self.cooldown
    }

    pub fn is_disabled(&self, provider: ProviderId) -> bool {
        self.config.disabled.contains(&provider)
    }

    /// Resolves `ctx` into a playlist. An empty playlist means "no matches".
    ///
    /// `ctx`'s provider may be swapped during failover; after the call it
    /// names the provider that actually served the request.
    pub async fn resolve(
        &self,
        ctx: &mut QueryContext,
        options: ResolveOptions,
    ) -> Result<ResolvedPlaylist, ResolveError> {
        self.metrics.increment(monitoring::REQUESTS_ISSUED, None);

        let result = self.run(ctx, options).await;
        match &result {
            Ok(playlist) if playlist.is_empty() => {
                self.metrics.increment(monitoring::LOAD_OUTCOME, Some(Outcome::Empty.as_str()));
            }
            Ok(_) => {}
            Err(e) => {
                debug!("❌ Resolución fallida para '{}': {}", ctx.query(), e);
                self.metrics.increment(monitoring::LOAD_FAILURES, None);
                self.metrics.increment(monitoring::LOAD_OUTCOME, Some(Outcome::Exception.as_str()));
            }
        }
        result
    }

    async fn run(
        &self,
        ctx: &mut QueryContext,
        options: ResolveOptions,
    ) -> Result<ResolvedPlaylist, ResolveError> {
        self.validate(ctx)?;
        self.check_cooldown(ctx)?;

        if options.use_cache {
            if let Some((playlist, tier)) = self.cache.lookup(ctx).await {
                debug!("⚡ '{}' servido desde caché ({:?})", ctx.query(), tier);
                self.metrics.increment(monitoring::CACHE_HITS, None);
                self.metrics.increment(monitoring::LOAD_OUTCOME, Some(Outcome::Cache.as_str()));
                return Ok(playlist);
            }
        }

        let playlist = match self.dispatch(ctx).await {
            Ok(playlist) => playlist,
            Err(e) => return Err(self.classify_failure(ctx, e)),
        };

        if !playlist.is_empty() {
            self.metrics
                .increment_by(monitoring::TRACKS_LOADED, None, playlist.len() as u64);
            self.metrics.increment(monitoring::LOAD_OUTCOME, Some(Outcome::Live.as_str()));
            self.cache.store(ctx, &playlist);
        }

        Ok(playlist)
    }

    /// Disabled providers get one deterministic failover, searches only.
    fn validate(&self, ctx: &mut QueryContext) -> Result<(), ResolveError> {
        let provider = ctx.provider().id;
        if !self.is_disabled(provider) {
            return Ok(());
        }

        if ctx.is_direct_url() {
            return Err(ResolveError::UnsupportedProvider(provider));
        }

        match self.usable_partner(provider) {
            Some(partner) => {
                info!("🔄 {} deshabilitado, usando {} para '{}'", provider, partner, ctx.query());
                ctx.set_provider(partner.provider());
                Ok(())
            }
            None => Err(ResolveError::ProviderDisabled(provider)),
        }
    }

    /// Direct URLs are never rerouted; searches move to the partner.
    fn check_cooldown(&self, ctx: &mut QueryContext) -> Result<(), ResolveError> {
        let provider = ctx.provider().id;
        let Some(remaining) = self.cooldown.remaining(provider) else {
            return Ok(());
        };

        let on_cooldown = ResolveError::ProviderOnCooldown { provider, remaining };
        if ctx.is_direct_url() {
            return Err(on_cooldown);
        }

        match self.usable_partner(provider) {
            Some(partner) => {
                debug!("⏳ {} en cooldown, búsqueda redirigida a {}", provider, partner);
                ctx.set_provider(partner.provider());
                Ok(())
            }
            None => Err(on_cooldown),
        }
    }

    fn usable_partner(&self, provider: ProviderId) -> Option<ProviderId> {
        registry::failover_partner(provider).filter(|partner| !self.is_disabled(*partner))
    }

    async fn dispatch(&self, ctx: &QueryContext) -> Result<ResolvedPlaylist, DispatchError> {
        let query = ctx.full_query();
        let (tx, mut rx) = oneshot::channel();

        debug!("📡 Despachando '{}' a {}", query, self.loader.name());
        let handle = self.loader.load_item(
            &query,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        match timeout(self.config.load_timeout, &mut rx).await {
            Ok(Ok(outcome)) => accept(ctx, outcome).map_err(DispatchError::Upstream),
            Ok(Err(_)) => Err(DispatchError::Upstream(UpstreamError::other(
                "loader dropped the request without reporting an outcome",
            ))),
            Err(_) => {
                self.store_late_result(ctx.clone(), rx, handle);
                Err(DispatchError::Timeout)
            }
        }
    }

    /// Keeps listening for a timed-out load and caches it if it succeeds.
    ///
    /// Once the grace period runs out the load is aborted.
    fn store_late_result(&self, ctx: QueryContext, rx: oneshot::Receiver<LoadOutcome>, handle: LoadHandle) {
        let cache = self.cache.clone();
        let grace = self.config.late_result_grace;

        tokio::spawn(async move {
            match timeout(grace, rx).await {
                Ok(Ok(outcome)) => {
                    if let Ok(playlist) = accept(&ctx, outcome) {
                        if !playlist.is_empty() {
                            debug!("🐢 Resultado tardío guardado en caché para '{}'", ctx.query());
                            cache.store(&ctx, &playlist);
                        }
                    }
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    debug!("⌛ '{}' no respondió tras la gracia, cancelando", ctx.query());
                    handle.abort();
                }
            }
        });
    }

    fn classify_failure(&self, ctx: &QueryContext, error: DispatchError) -> ResolveError {
        let error = match error {
            DispatchError::Timeout => return ResolveError::UpstreamTimeout(self.config.load_timeout),
            DispatchError::Upstream(upstream) => classify::classify(upstream),
        };

        let provider = ctx.provider().id;
        if error.is_throttling()
            && self.cooldown.tracks(provider)
            && self.cooldown.trigger(provider, self.config.cooldown)
        {
            warn!(
                "🚦 {} está limitando peticiones ({}), en cooldown por {}",
                provider,
                error,
                humantime::format_duration(self.config.cooldown)
            );
        }

        error
    }
}

#[derive(Debug)]
enum DispatchError {
    Timeout,
    Upstream(UpstreamError),
}

/// Converts a loader outcome into a playlist.
fn accept(ctx: &QueryContext, outcome: LoadOutcome) -> Result<ResolvedPlaylist, UpstreamError> {
    match outcome {
        LoadOutcome::TrackLoaded(track) => Ok(ResolvedPlaylist::single(track)),
        LoadOutcome::PlaylistLoaded(playlist) if ctx.is_single_result_search() => Ok(playlist.first_only()),
        LoadOutcome::PlaylistLoaded(playlist) => Ok(playlist),
        LoadOutcome::NoMatches => Ok(ResolvedPlaylist::empty()),
        LoadOutcome::LoadFailed(error) => Err(error),
    }
}
