use chrono::Utc;
use dashmap::DashMap;
use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};
use tracing::debug;

use crate::sources::registry::ProviderId;

/// Tracks upstream throttling and tells the engine which providers to avoid.
///
/// Each tracked provider has a single absolute "avoid until" timestamp (ms
/// since the epoch), created the first time it is triggered. Reads are a
/// plain atomic load. Concurrent triggers race through a compare-and-swap
/// that only ever moves the deadline forward.
#[derive(Debug)]
pub struct CooldownGovernor {
    tracked: Vec<ProviderId>,
    resume_after: DashMap<ProviderId, AtomicI64>,
}

impl CooldownGovernor {
    pub fn new(tracked: impl IntoIterator<Item = ProviderId>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
            resume_after: DashMap::new(),
        }
    }

    /// Whether throttling signals from `provider` should put it on cooldown.
    pub fn tracks(&self, provider: ProviderId) -> bool {
        self.tracked.contains(&provider)
    }

    pub fn is_on_cooldown(&self, provider: ProviderId) -> bool {
        self.remaining(provider).is_some()
    }

    /// Time left on the cooldown, if any.
    pub fn remaining(&self, provider: ProviderId) -> Option<Duration> {
        let until = self.resume_after.get(&provider)?.load(Ordering::Acquire);
        let left = until - now_millis();
        (left > 0).then(|| Duration::from_millis(left as u64))
    }

    /// Puts `provider` on cooldown for `duration` from now.
    ///
    /// Returns `false` when an equal or later deadline was already recorded.
    pub fn trigger(&self, provider: ProviderId, duration: Duration) -> bool {
        let until = now_millis().saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        let slot = self
            .resume_after
            .entry(provider)
            .or_insert_with(|| AtomicI64::new(0));

        let extended = slot
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (until > current).then_some(until)
            })
            .is_ok();

        debug!("⏳ Cooldown para {} hasta {} (extendido: {})", provider, until, extended);
        extended
    }

    /// Levanta el cooldown manualmente
    pub fn clear(&self, provider: ProviderId) {
        if let Some(slot) = self.resume_after.get(&provider) {
            slot.store(0, Ordering::Release);
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
