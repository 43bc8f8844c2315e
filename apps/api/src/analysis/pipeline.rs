//! Skill pipeline: orchestrates one analysis run.
//!
//! Flow: cache lookup → fetch postings → chunk descriptions → concurrent
//!       extraction → aggregate → consolidate → cache store → return.
//!
//! Stages run strictly in order; only the extraction calls of one run overlap.
//! A failed batch is dropped, not retried. A run that fails leaves nothing in
//! the cache.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::Instant;

use crate::analysis::aggregator::aggregate;
use crate::analysis::consolidation::consolidate;
use crate::analysis::events::{PipelineEvent, PipelineObserver, Stage};
use crate::analysis::extractor::SkillExtractor;
use crate::cache::{cache_key, ResultCache};
use crate::config::PipelineSettings;
use crate::errors::AnalysisError;
use crate::health::HealthTracker;
use crate::models::analysis::{AnalysisResult, ExtractionBatch};
use crate::sources::PostingSource;

pub struct SkillPipeline {
    source: Arc<dyn PostingSource>,
    extractor: Arc<dyn SkillExtractor>,
    cache: Arc<ResultCache>,
    health: Arc<HealthTracker>,
    observer: Arc<dyn PipelineObserver>,
    settings: PipelineSettings,
}

impl SkillPipeline {
    pub fn new(
        source: Arc<dyn PostingSource>,
        extractor: Arc<dyn SkillExtractor>,
        cache: Arc<ResultCache>,
        health: Arc<HealthTracker>,
        observer: Arc<dyn PipelineObserver>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            extractor,
            cache,
            health,
            observer,
            settings,
        }
    }

    /// Cached result for `job_title` at the configured offer count, if still fresh.
    pub fn cached(&self, job_title: &str) -> Option<AnalysisResult> {
        self.cache
            .get(&cache_key(job_title, self.settings.offers_per_analysis))
    }

    /// Runs the full pipeline for an already-normalized job title.
    pub async fn run(&self, job_title: &str) -> Result<AnalysisResult, AnalysisError> {
        let result = self.run_stages(job_title).await;
        if let Err(e) = &result {
            self.emit(PipelineEvent::RunFailed {
                reason: e.to_string(),
            });
        }
        result
    }

    async fn run_stages(&self, job_title: &str) -> Result<AnalysisResult, AnalysisError> {
        let offers = self.settings.offers_per_analysis;
        let key = cache_key(job_title, offers);

        // Step 1: Cache lookup
        let started = self.start(Stage::CacheLookup);
        let cached = self.cache.get(&key);
        self.finish(Stage::CacheLookup, started);
        if let Some(hit) = cached {
            self.emit(PipelineEvent::CacheHit { key });
            return Ok(hit);
        }
        self.emit(PipelineEvent::CacheMiss { key: key.clone() });

        // Step 2: Extraction service must be usable before spending a posting search
        self.extractor
            .initialize()
            .await
            .map_err(|e| AnalysisError::ExtractorUnavailable(e.to_string()))?;

        // Step 3: Fetch postings
        let started = self.start(Stage::Fetching);
        let postings = self
            .source
            .search_offers(job_title, offers)
            .await
            .map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))?;
        self.finish(Stage::Fetching, started);
        if postings.is_empty() {
            return Err(AnalysisError::NoPostings);
        }

        // Step 4: Keep postings with a usable description
        let descriptions: Vec<String> = postings
            .iter()
            .filter_map(|p| p.usable_description())
            .map(str::to_string)
            .collect();
        if descriptions.is_empty() {
            return Err(AnalysisError::NoUsableDescriptions);
        }

        // Step 5: Concurrent extraction, one call per batch
        let started = self.start(Stage::Extracting);
        let batch_results = self.extract_batches(job_title, &descriptions).await;
        self.finish(Stage::Extracting, started);

        // Step 6: Aggregate
        let started = self.start(Stage::Aggregating);
        let aggregated = aggregate(&batch_results);
        self.finish(Stage::Aggregating, started);
        if aggregated.skills.is_empty() {
            return Err(AnalysisError::NoSkillsExtracted);
        }

        // Step 7: Consolidate the top candidates
        let started = self.start(Stage::Consolidating);
        let candidates = aggregated.top_candidates(self.settings.consolidation_candidate_limit);
        let consolidated = consolidate(
            self.extractor.as_ref(),
            &self.health,
            self.observer.as_ref(),
            candidates,
        )
        .await;
        self.finish(Stage::Consolidating, started);

        // Step 8: Rank and truncate
        let result = AnalysisResult::ranked(
            consolidated,
            self.settings.final_skill_limit,
            aggregated.top_education_level,
            postings.len(),
        );

        // Step 9: Cache
        let started = self.start(Stage::Caching);
        self.cache.put(key, result.clone(), self.settings.cache_ttl);
        self.finish(Stage::Caching, started);

        Ok(result)
    }

    /// Issues every batch concurrently. A failed batch becomes `None`.
    async fn extract_batches(
        &self,
        job_title: &str,
        descriptions: &[String],
    ) -> Vec<Option<ExtractionBatch>> {
        let calls = descriptions
            .chunks(self.settings.batch_size.max(1))
            .enumerate()
            .map(|(batch, chunk)| async move {
                match self.extractor.extract(job_title, chunk).await {
                    Ok(payload) => {
                        self.health.record_call(true);
                        Some(payload)
                    }
                    Err(e) => {
                        self.health.record_call(false);
                        self.emit(PipelineEvent::BatchFailed {
                            batch,
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            });

        join_all(calls).await
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    fn start(&self, stage: Stage) -> Instant {
        self.emit(PipelineEvent::StageStarted { stage });
        Instant::now()
    }

    fn finish(&self, stage: Stage, started: Instant) {
        self.emit(PipelineEvent::finished(stage, started.elapsed()));
    }
}
