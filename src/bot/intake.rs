//! Request intake: raw user query in, queue mutation out.
//!
//! Failures never reach the caller as errors. They bump `intake_failures`
//! and leave the queue exactly as it was.

use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    audio::player::PlaybackManager,
    monitoring::{self, MetricsSink},
    resolver::{context::QueryContext, ResolveOptions, Resolver},
    sources::ProviderId,
};

/// What a submission did to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued {
        added: usize,
        label: String,
        provider: ProviderId,
    },
    NoMatches,
    Failed(String),
}

pub struct RequestIntake {
    resolver: Arc<Resolver>,
    metrics: Arc<dyn MetricsSink>,
    default_search: ProviderId,
}

impl RequestIntake {
    pub fn new(resolver: Arc<Resolver>, metrics: Arc<dyn MetricsSink>, default_search: ProviderId) -> Self {
        Self {
            resolver,
            metrics,
            default_search,
        }
    }

    pub async fn submit(
        &self,
        player: &dyn PlaybackManager,
        requester: UserId,
        raw_query: &str,
    ) -> SubmitOutcome {
        let mut ctx = QueryContext::from_user_input(raw_query, self.default_search);
        debug!("🔍 Solicitud de {}: '{}' vía {}", requester, ctx.query(), ctx.provider().id);

        let playlist = match self.resolver.resolve(&mut ctx, ResolveOptions::default()).await {
            Ok(playlist) if playlist.is_empty() => {
                self.metrics.increment(monitoring::INTAKE_FAILURES, None);
                return SubmitOutcome::NoMatches;
            }
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("⚠️ No se pudo resolver '{}': {}", raw_query, e);
                self.metrics.increment(monitoring::INTAKE_FAILURES, None);
                return SubmitOutcome::Failed(e.to_string());
            }
        };

        let playlist = if ctx.is_single_result_search() {
            playlist.first_only()
        } else {
            playlist
        };

        let label = playlist.label.clone();
        match player.enqueue(playlist.tracks, requester) {
            Ok(added) if added > 0 => {
                if player.is_paused() {
                    player.set_paused(false);
                }
                info!("✅ {} tracks encolados desde '{}'", added, label);
                SubmitOutcome::Queued {
                    added,
                    label,
                    provider: ctx.provider().id,
                }
            }
            Ok(_) => {
                self.metrics.increment(monitoring::INTAKE_FAILURES, None);
                SubmitOutcome::Failed("queue is full".to_string())
            }
            Err(e) => {
                self.metrics.increment(monitoring::INTAKE_FAILURES, None);
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }
}
