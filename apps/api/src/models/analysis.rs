use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured output of one extraction call: one record per posting in the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub extracted_data: Vec<ExtractedPosting>,
}

/// Skills and education level the model read out of a single posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPosting {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education_level: Option<String>,
}

/// Raw consolidation response. A missing key is a failed consolidation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsolidationPayload {
    pub consolidated_skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSkill {
    /// 1-based position in the final list.
    pub rank: u32,
    pub skill: String,
}

/// Final, immutable result of one pipeline run. This is what the cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub skills: Vec<RankedSkill>,
    pub top_diploma: String,
    /// Postings fetched from the source, including those that contributed no skills.
    pub actual_offers_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Ranks `skills` in order, keeping at most `limit`.
    pub fn ranked(
        skills: Vec<String>,
        limit: usize,
        top_diploma: String,
        actual_offers_count: usize,
    ) -> Self {
        let skills = skills
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, skill)| RankedSkill {
                rank: i as u32 + 1,
                skill,
            })
            .collect();

        Self {
            skills,
            top_diploma,
            actual_offers_count,
            generated_at: Utc::now(),
        }
    }
}
