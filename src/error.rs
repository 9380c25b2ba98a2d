//! Error types for track resolution.
//!
//! An empty search is not an error: it comes back as an empty
//! [`ResolvedPlaylist`](crate::sources::ResolvedPlaylist).

use std::time::Duration;
use thiserror::Error;

use crate::sources::registry::ProviderId;

/// Boxed cause carried across the loader boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured failure kind reported by an upstream loader.
///
/// Loaders that can see a status code should set `Overloaded` or
/// `RateLimited` themselves; `Other` leaves classification to message
/// matching in [`crate::resolver::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Overloaded,
    RateLimited,
    Other,
}

/// Failure reported by an upstream loader through `LoadOutcome::LoadFailed`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Other, message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Terminal failures of the resolution engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The provider is disabled and no failover was possible.
    #[error("provider {0} is disabled")]
    ProviderDisabled(ProviderId),

    /// A direct URL pointed at a disabled provider.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(ProviderId),

    /// A direct URL pointed at a provider that is cooling down.
    #[error("provider {provider} is cooling down for another {}", format_remaining(.remaining))]
    ProviderOnCooldown {
        provider: ProviderId,
        remaining: Duration,
    },

    #[error("upstream load timed out after {}ms", .0.as_millis())]
    UpstreamTimeout(Duration),

    /// HTTP 503 from the upstream.
    #[error("upstream backend overloaded")]
    UpstreamOverloaded(#[source] UpstreamError),

    /// Rate limit signature from the upstream.
    #[error("upstream is actively throttling requests")]
    UpstreamThrottled(#[source] UpstreamError),

    #[error("upstream rejected the request: {0}")]
    UpstreamRejected(#[source] UpstreamError),
}

fn format_remaining(remaining: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_secs(remaining.as_secs()))
}

impl ResolveError {
    /// True for errors raised before anything was dispatched upstream.
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            Self::ProviderDisabled(_) | Self::UnsupportedProvider(_) | Self::ProviderOnCooldown { .. }
        )
    }

    /// True for the two throttling classifications.
    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::UpstreamOverloaded(_) | Self::UpstreamThrottled(_))
    }
}
