//! Structured pipeline events.
//!
//! The pipeline never formats log lines itself; it reports what happened to a
//! `PipelineObserver`. `TracingObserver` is the production sink.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CacheLookup,
    Fetching,
    Extracting,
    Aggregating,
    Consolidating,
    Caching,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    StageFinished { stage: Stage, elapsed_ms: u64 },
    CacheHit { key: String },
    CacheMiss { key: String },
    BatchFailed { batch: usize, reason: String },
    ConsolidationFallback { reason: String },
    JoinedInFlight { term: String },
    RunFailed { reason: String },
}

impl PipelineEvent {
    pub fn finished(stage: Stage, elapsed: Duration) -> Self {
        PipelineEvent::StageFinished {
            stage,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards every event to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => debug!(?stage, "stage started"),
            PipelineEvent::StageFinished { stage, elapsed_ms } => {
                info!(?stage, elapsed_ms, "stage finished")
            }
            PipelineEvent::CacheHit { key } => info!(%key, "cache hit"),
            PipelineEvent::CacheMiss { key } => debug!(%key, "cache miss"),
            PipelineEvent::BatchFailed { batch, reason } => {
                warn!(batch, %reason, "extraction batch failed")
            }
            PipelineEvent::ConsolidationFallback { reason } => {
                warn!(%reason, "consolidation failed, keeping unconsolidated skills")
            }
            PipelineEvent::JoinedInFlight { term } => {
                info!(%term, "analysis already in flight, waiting for it")
            }
            PipelineEvent::RunFailed { reason } => warn!(%reason, "analysis run failed"),
        }
    }
}
