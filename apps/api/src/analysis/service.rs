//! Public face of the analysis core: de-duplication in front of the pipeline,
//! plus the administrative cache flush and the health probe.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::dedup::{Acquisition, SearchDeduplicator};
use crate::analysis::events::{PipelineEvent, PipelineObserver};
use crate::analysis::extractor::SkillExtractor;
use crate::analysis::normalize::normalize_term;
use crate::analysis::pipeline::SkillPipeline;
use crate::cache::ResultCache;
use crate::config::PipelineSettings;
use crate::errors::AnalysisError;
use crate::health::{HealthReport, HealthTracker};
use crate::models::analysis::AnalysisResult;
use crate::sources::PostingSource;

/// Status endpoint payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub health: HealthReport,
    /// Extraction outcomes currently inside the health window.
    pub recent_calls: usize,
    pub in_flight: usize,
    pub cached_results: usize,
}

pub struct AnalysisService {
    pipeline: Arc<SkillPipeline>,
    dedup: SearchDeduplicator,
    cache: Arc<ResultCache>,
    health: Arc<HealthTracker>,
    extractor: Arc<dyn SkillExtractor>,
    observer: Arc<dyn PipelineObserver>,
}

impl AnalysisService {
    pub fn new(
        source: Arc<dyn PostingSource>,
        extractor: Arc<dyn SkillExtractor>,
        cache: Arc<ResultCache>,
        health: Arc<HealthTracker>,
        observer: Arc<dyn PipelineObserver>,
        settings: PipelineSettings,
    ) -> Self {
        let pipeline = Arc::new(SkillPipeline::new(
            source,
            extractor.clone(),
            cache.clone(),
            health.clone(),
            observer.clone(),
            settings,
        ));
        Self {
            pipeline,
            dedup: SearchDeduplicator::new(),
            cache,
            health,
            extractor,
            observer,
        }
    }

    /// Analyzes `job_title`, sharing the work with any identical request already running.
    ///
    /// The owning run executes on its own task, so it finishes (and fills the cache for
    /// waiters) even when the caller that started it goes away.
    pub async fn request_analysis(&self, job_title: &str) -> Result<AnalysisResult, AnalysisError> {
        let term = normalize_term(job_title);
        if term.is_empty() {
            return Err(AnalysisError::EmptyJobTitle);
        }

        match self.dedup.acquire_or_join(&term) {
            Acquisition::Owner(guard) => {
                let pipeline = self.pipeline.clone();
                let span = info_span!("analysis", run_id = %Uuid::new_v4(), term = %guard.term());
                let run = tokio::spawn(
                    async move {
                        let result = pipeline.run(guard.term()).await;
                        // Release only after the result is cached so waiters find it.
                        drop(guard);
                        result
                    }
                    .instrument(span),
                );

                run.await
                    .unwrap_or_else(|e| Err(AnalysisError::RunAborted(e.to_string())))
            }
            Acquisition::Waiter(handle) => {
                self.observer
                    .on_event(&PipelineEvent::JoinedInFlight { term: term.clone() });
                handle.wait().await;
                self.pipeline
                    .cached(&term)
                    .ok_or(AnalysisError::NoResultAvailable)
            }
        }
    }

    pub fn flush_cache(&self) {
        if self.cache.is_empty() {
            debug!("Result cache already empty");
            return;
        }
        self.cache.flush_all();
    }

    pub async fn probe_health(&self) -> StatusReport {
        StatusReport {
            health: self.health.classify(self.extractor.as_ref()).await,
            recent_calls: self.health.sample_count(),
            in_flight: self.dedup.in_flight_count(),
            cached_results: self.cache.len(),
        }
    }
}
