//! In-memory collaborators shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::analysis::events::{PipelineEvent, PipelineObserver};
use crate::analysis::extractor::{ExtractionError, SkillExtractor};
use crate::llm_client::LlmError;
use crate::models::analysis::{ConsolidationPayload, ExtractedPosting, ExtractionBatch};
use crate::models::posting::JobPosting;
use crate::sources::{PostingSource, SourceError};

pub fn posting_record(skills: &[&str], education_level: &str) -> ExtractedPosting {
    ExtractedPosting {
        skills: skills.iter().map(|s| s.to_string()).collect(),
        education_level: Some(education_level.to_string()),
    }
}

fn server_error() -> ExtractionError {
    ExtractionError::Llm(LlmError::Api {
        status: 500,
        message: "fake failure".into(),
    })
}

pub struct FakeSource {
    postings: Option<Vec<JobPosting>>,
    delay: Option<Duration>,
    panics: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FakeSource {
    fn new(postings: Option<Vec<JobPosting>>) -> Self {
        Self {
            postings,
            delay: None,
            panics: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// One posting per description, in order.
    pub fn with_descriptions(descriptions: &[&str]) -> Self {
        let postings = descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| JobPosting {
                id: Some(format!("offer-{i}")),
                title: Some("Offer".into()),
                description: Some(d.to_string()),
            })
            .collect();
        Self::new(Some(postings))
    }

    pub fn without_descriptions(count: usize) -> Self {
        let postings = (0..count)
            .map(|i| JobPosting {
                id: Some(format!("offer-{i}")),
                title: Some("Offer".into()),
                description: if i % 2 == 0 { None } else { Some("   ".into()) },
            })
            .collect();
        Self::new(Some(postings))
    }

    pub fn failing() -> Self {
        Self::new(None)
    }

    /// Panics inside `search_offers`.
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new(None)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingSource for FakeSource {
    async fn search_offers(
        &self,
        title: &str,
        max_offers: usize,
    ) -> Result<Vec<JobPosting>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(title.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("posting source crashed");
        }
        match &self.postings {
            Some(postings) => Ok(postings.iter().take(max_offers).cloned().collect()),
            None => Err(SourceError::Api {
                status: 503,
                message: "fake source down".into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    Ok,
    Delay(Duration),
    Fail,
}

#[derive(Debug, Clone)]
pub enum ConsolidationBehavior {
    /// Returns the candidates unchanged.
    Echo,
    Return(Vec<String>),
    Fail,
    /// Responds without the `consolidated_skills` key.
    MissingKey,
}

pub struct FakeExtractor {
    records: HashMap<String, ExtractedPosting>,
    failing_descriptions: HashSet<String>,
    probe: ProbeBehavior,
    consolidation: ConsolidationBehavior,
    initialization_fails: bool,
    extract_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    consolidation_inputs: Mutex<Vec<Vec<String>>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            failing_descriptions: HashSet::new(),
            probe: ProbeBehavior::Ok,
            consolidation: ConsolidationBehavior::Echo,
            initialization_fails: false,
            extract_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            consolidation_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Record returned for a posting whose description is exactly `description`.
    /// Unknown descriptions yield an empty record.
    pub fn with_record(mut self, description: &str, record: ExtractedPosting) -> Self {
        self.records.insert(description.to_string(), record);
        self
    }

    /// Any batch containing `description` fails as a whole.
    pub fn failing_on(mut self, description: &str) -> Self {
        self.failing_descriptions.insert(description.to_string());
        self
    }

    pub fn with_probe(mut self, probe: ProbeBehavior) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_consolidation(mut self, consolidation: ConsolidationBehavior) -> Self {
        self.consolidation = consolidation;
        self
    }

    pub fn failing_initialization(mut self) -> Self {
        self.initialization_fails = true;
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn consolidation_calls(&self) -> usize {
        self.consolidation_inputs.lock().unwrap().len()
    }

    pub fn consolidation_inputs(&self) -> Vec<Vec<String>> {
        self.consolidation_inputs.lock().unwrap().clone()
    }
}

impl Default for FakeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SkillExtractor for FakeExtractor {
    async fn initialize(&self) -> Result<(), ExtractionError> {
        if self.initialization_fails {
            return Err(ExtractionError::Initialization("no credentials".into()));
        }
        Ok(())
    }

    async fn extract(
        &self,
        _job_title: &str,
        descriptions: &[String],
    ) -> Result<ExtractionBatch, ExtractionError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if descriptions
            .iter()
            .any(|d| self.failing_descriptions.contains(d))
        {
            return Err(server_error());
        }
        let extracted_data = descriptions
            .iter()
            .map(|d| self.records.get(d).cloned().unwrap_or_default())
            .collect();
        Ok(ExtractionBatch { extracted_data })
    }

    async fn consolidate(&self, skills: &[String]) -> Result<ConsolidationPayload, ExtractionError> {
        self.consolidation_inputs.lock().unwrap().push(skills.to_vec());
        let consolidated_skills = match &self.consolidation {
            ConsolidationBehavior::Echo => Some(skills.to_vec()),
            ConsolidationBehavior::Return(skills) => Some(skills.clone()),
            ConsolidationBehavior::Fail => return Err(server_error()),
            ConsolidationBehavior::MissingKey => None,
        };
        Ok(ConsolidationPayload { consolidated_skills })
    }

    async fn probe(&self) -> Result<(), ExtractionError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match &self.probe {
            ProbeBehavior::Ok => Ok(()),
            ProbeBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            ProbeBehavior::Fail => Err(server_error()),
        }
    }
}

/// Keeps every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
