//! Consolidation step: asks the extraction service to merge near-duplicate skill
//! names into canonical labels.
//!
//! Consolidation improves quality but is never required: any failure returns the
//! candidates unchanged. The health tracker still sees the real outcome.

use crate::analysis::events::{PipelineEvent, PipelineObserver};
use crate::analysis::extractor::SkillExtractor;
use crate::health::HealthTracker;

/// Returns canonical skill names for `candidates`, or `candidates` itself on failure.
pub async fn consolidate(
    extractor: &dyn SkillExtractor,
    health: &HealthTracker,
    observer: &dyn PipelineObserver,
    candidates: Vec<String>,
) -> Vec<String> {
    if candidates.is_empty() {
        return candidates;
    }

    let failure = match extractor.consolidate(&candidates).await {
        Ok(payload) => match payload.consolidated_skills {
            Some(consolidated) => {
                health.record_call(true);
                return consolidated;
            }
            None => "response is missing 'consolidated_skills'".to_string(),
        },
        Err(e) => e.to_string(),
    };

    health.record_call(false);
    observer.on_event(&PipelineEvent::ConsolidationFallback { reason: failure });
    candidates
}
