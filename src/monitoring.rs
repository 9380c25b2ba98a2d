//! # Monitoring
//!
//! Write-only labelled counters. Resolution code only ever increments; nothing
//! in the control flow reads them back.

use dashmap::DashMap;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

pub const REQUESTS_ISSUED: &str = "requests_issued";
pub const TRACKS_LOADED: &str = "tracks_loaded";
pub const LOAD_FAILURES: &str = "load_failures";
pub const CACHE_HITS: &str = "cache_hits";
pub const LOAD_OUTCOME: &str = "load_outcome";
pub const INTAKE_FAILURES: &str = "intake_failures";

/// Labels for [`LOAD_OUTCOME`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Cache,
    Live,
    Empty,
    Exception,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Cache => "cache",
            Outcome::Live => "live",
            Outcome::Empty => "empty",
            Outcome::Exception => "exception",
        }
    }
}

/// Sink for label-incremented counters.
pub trait MetricsSink: Send + Sync {
    fn increment_by(&self, name: &'static str, label: Option<&'static str>, value: u64);

    fn increment(&self, name: &'static str, label: Option<&'static str>) {
        self.increment_by(name, label, 1);
    }
}

/// In-process counter registry
#[derive(Debug, Default)]
pub struct MonitoringSystem {
    counters: DashMap<(&'static str, &'static str), AtomicU64>,
}

impl MonitoringSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &'static str, label: Option<&'static str>) -> u64 {
        self.counters
            .get(&(name, label.unwrap_or("")))
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Copia ordenada de todos los contadores
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|entry| {
                let (name, label) = *entry.key();
                let key = if label.is_empty() {
                    name.to_string()
                } else {
                    format!("{}{{{}}}", name, label)
                };
                (key, entry.value().load(Ordering::Relaxed))
            })
            .collect();
        entries.sort();
        entries
    }
}

impl MetricsSink for MonitoringSystem {
    fn increment_by(&self, name: &'static str, label: Option<&'static str>, value: u64) {
        self.counters
            .entry((name, label.unwrap_or("")))
            .or_default()
            .fetch_add(value, Ordering::Relaxed);
    }
}

impl fmt::Display for MonitoringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "📊 Métricas:")?;
        for (key, value) in self.snapshot() {
            write!(f, "\n  {} = {}", key, value)?;
        }
        Ok(())
    }
}
