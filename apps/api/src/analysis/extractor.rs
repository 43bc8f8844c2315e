//! Skill extraction capability: the seam between the pipeline and the language model.
//!
//! `SkillExtractor` only performs calls and parses payloads. Health recording,
//! fallbacks and concurrency live in the pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::llm_client::prompts::{
    render_consolidation_prompt, render_extraction_prompt, CONSOLIDATION_SYSTEM,
    DESCRIPTIONS_PLACEHOLDER, EXTRACTION_SYSTEM, SKILLS_PLACEHOLDER,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::{ConsolidationPayload, ExtractionBatch};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service cannot initialize: {0}")]
    Initialization(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[async_trait]
pub trait SkillExtractor: Send + Sync {
    /// Verifies credentials and loads prompt templates. Cheap after the first success.
    async fn initialize(&self) -> Result<(), ExtractionError>;

    /// Extracts one record per description, in input order.
    async fn extract(
        &self,
        job_title: &str,
        descriptions: &[String],
    ) -> Result<ExtractionBatch, ExtractionError>;

    /// Merges synonyms and variants into canonical skill names.
    async fn consolidate(&self, skills: &[String]) -> Result<ConsolidationPayload, ExtractionError>;

    /// Minimal round-trip used to measure latency.
    async fn probe(&self) -> Result<(), ExtractionError>;
}

#[derive(Debug, Clone)]
struct PromptTemplates {
    extraction: String,
    consolidation: String,
}

impl PromptTemplates {
    async fn load(extraction: &Path, consolidation: &Path) -> Result<Self, ExtractionError> {
        let templates = Self {
            extraction: read_template(extraction, DESCRIPTIONS_PLACEHOLDER).await?,
            consolidation: read_template(consolidation, SKILLS_PLACEHOLDER).await?,
        };
        info!("Prompt templates loaded");
        Ok(templates)
    }
}

async fn read_template(path: &Path, placeholder: &str) -> Result<String, ExtractionError> {
    let template = tokio::fs::read_to_string(path).await.map_err(|e| {
        ExtractionError::Initialization(format!("cannot read prompt {}: {e}", path.display()))
    })?;
    if !template.contains(placeholder) {
        return Err(ExtractionError::Initialization(format!(
            "prompt {} is missing the {placeholder} placeholder",
            path.display()
        )));
    }
    Ok(template)
}

/// Extractor backed by the shared `LlmClient`.
pub struct LlmSkillExtractor {
    /// `None` when no API key is configured; every call then fails initialization.
    llm: Option<LlmClient>,
    extraction_prompt_path: PathBuf,
    consolidation_prompt_path: PathBuf,
    templates: OnceCell<PromptTemplates>,
}

impl LlmSkillExtractor {
    pub fn new(
        llm: Option<LlmClient>,
        extraction_prompt_path: impl Into<PathBuf>,
        consolidation_prompt_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            extraction_prompt_path: extraction_prompt_path.into(),
            consolidation_prompt_path: consolidation_prompt_path.into(),
            templates: OnceCell::new(),
        }
    }

    async fn ready(&self) -> Result<(&LlmClient, &PromptTemplates), ExtractionError> {
        let llm = self.llm.as_ref().ok_or_else(|| {
            ExtractionError::Initialization("ANTHROPIC_API_KEY is not set".to_string())
        })?;
        let templates = self
            .templates
            .get_or_try_init(|| {
                PromptTemplates::load(&self.extraction_prompt_path, &self.consolidation_prompt_path)
            })
            .await?;
        Ok((llm, templates))
    }
}

#[async_trait]
impl SkillExtractor for LlmSkillExtractor {
    async fn initialize(&self) -> Result<(), ExtractionError> {
        self.ready().await.map(|_| ())
    }

    async fn extract(
        &self,
        job_title: &str,
        descriptions: &[String],
    ) -> Result<ExtractionBatch, ExtractionError> {
        let (llm, templates) = self.ready().await?;
        let prompt = render_extraction_prompt(&templates.extraction, job_title, descriptions);
        Ok(llm.call_json(&prompt, EXTRACTION_SYSTEM).await?)
    }

    async fn consolidate(&self, skills: &[String]) -> Result<ConsolidationPayload, ExtractionError> {
        let (llm, templates) = self.ready().await?;
        let prompt = render_consolidation_prompt(&templates.consolidation, skills);
        Ok(llm.call_json(&prompt, CONSOLIDATION_SYSTEM).await?)
    }

    async fn probe(&self) -> Result<(), ExtractionError> {
        let (llm, _) = self.ready().await?;
        let count = llm.count_tokens("ping").await?;
        debug!(input_tokens = count.input_tokens, "extraction service probe answered");
        Ok(())
    }
}
