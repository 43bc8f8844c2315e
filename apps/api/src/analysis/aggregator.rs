//! Batch aggregation: merges per-batch extraction payloads into a frequency-ranked
//! skill list and a dominant education level.
//!
//! Counting is per posting: a skill listed several times (in any casing) by one
//! posting counts once for it. Ranking is by count descending, ties broken by the
//! order in which skills were first seen.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::analysis::normalize::normalize_term;
use crate::models::analysis::{ExtractedPosting, ExtractionBatch};

/// Education level reported when no posting carries one.
pub const UNSPECIFIED_EDUCATION: &str = "unspecified";

/// Placeholder values the model uses for "no education requirement".
const EDUCATION_PLACEHOLDERS: &[&str] = &[
    "unspecified",
    "not specified",
    "none",
    "n/a",
    "non specifie",
    "non precise",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillFrequency {
    pub normalized_key: String,
    /// First-seen original spelling, trimmed.
    pub display_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub skills: Vec<SkillFrequency>,
    pub top_education_level: String,
}

impl AggregationResult {
    /// Display names of the `limit` most frequent skills.
    pub fn top_candidates(&self, limit: usize) -> Vec<String> {
        self.skills
            .iter()
            .take(limit)
            .map(|s| s.display_name.clone())
            .collect()
    }
}

/// Frequency table that remembers first-seen order.
#[derive(Debug, Default)]
struct Tally<T> {
    index: HashMap<String, usize>,
    rows: Vec<(T, u32)>,
}

impl<T> Tally<T> {
    fn bump(&mut self, key: String, first_seen: impl FnOnce() -> T) {
        match self.index.get(&key) {
            Some(&i) => self.rows[i].1 += 1,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push((first_seen(), 1));
            }
        }
    }
}

/// Aggregates the outputs of every extraction batch. Failed batches (`None`) are skipped.
pub fn aggregate(batch_results: &[Option<ExtractionBatch>]) -> AggregationResult {
    let mut skills: Tally<(String, String)> = Tally::default();
    let mut education: Tally<String> = Tally::default();

    let postings = batch_results
        .iter()
        .flatten()
        .flat_map(|batch| batch.extracted_data.iter());

    for posting in postings {
        tally_posting_skills(posting, &mut skills);

        if let Some(level) = meaningful_education(posting) {
            education.bump(level.to_string(), || level.to_string());
        }
    }

    let mut ranked: Vec<SkillFrequency> = skills
        .rows
        .into_iter()
        .map(|((normalized_key, display_name), count)| SkillFrequency {
            normalized_key,
            display_name,
            count,
        })
        .collect();
    // Stable: equal counts keep first-seen order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    AggregationResult {
        skills: ranked,
        top_education_level: most_common(education.rows)
            .unwrap_or_else(|| UNSPECIFIED_EDUCATION.to_string()),
    }
}

fn tally_posting_skills(posting: &ExtractedPosting, skills: &mut Tally<(String, String)>) {
    let mut seen_in_posting = HashSet::new();

    for raw in &posting.skills {
        let display = raw.trim();
        if display.is_empty() {
            continue;
        }
        let key = normalize_term(display);
        if key.is_empty() || !seen_in_posting.insert(key.clone()) {
            continue;
        }
        skills.bump(key.clone(), || (key, display.to_string()));
    }
}

fn meaningful_education(posting: &ExtractedPosting) -> Option<&str> {
    let level = posting.education_level.as_deref()?.trim();
    if level.is_empty() || EDUCATION_PLACEHOLDERS.contains(&normalize_term(level).as_str()) {
        return None;
    }
    Some(level)
}

/// The most frequent value; the earliest seen wins a tie.
fn most_common(rows: Vec<(String, u32)>) -> Option<String> {
    let mut best: Option<(String, u32)> = None;
    for (value, count) in rows {
        if best.as_ref().map_or(true, |(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
