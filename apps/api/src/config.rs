use std::time::Duration;

use anyhow::{Context, Result};

use crate::health::HealthSettings;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub france_travail_client_id: String,
    pub france_travail_client_secret: String,
    /// A missing key surfaces as an extraction outage, not a boot failure.
    pub anthropic_api_key: Option<String>,
    pub extraction_prompt_path: String,
    pub consolidation_prompt_path: String,
    pub llm_max_attempts: u32,
    pub cache_sweep_interval: Option<Duration>,
    pub pipeline: PipelineSettings,
    pub health: HealthSettings,
    pub port: u16,
    pub rust_log: String,
}

/// Tunables of a single analysis run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Number of postings requested from the job source per analysis.
    pub offers_per_analysis: usize,
    /// Descriptions sent to the extraction service per call.
    pub batch_size: usize,
    /// Top-N aggregated skills offered to the consolidation pass.
    pub consolidation_candidate_limit: usize,
    /// Maximum number of ranked skills in the final result.
    pub final_skill_limit: usize,
    pub cache_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            offers_per_analysis: 100,
            batch_size: 10,
            consolidation_candidate_limit: 30,
            final_skill_limit: 20,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            offers_per_analysis: parse_env("OFFERS_PER_ANALYSIS", defaults.offers_per_analysis)?,
            batch_size: parse_env("EXTRACTION_BATCH_SIZE", defaults.batch_size)?.max(1),
            consolidation_candidate_limit: parse_env(
                "CONSOLIDATION_CANDIDATE_LIMIT",
                defaults.consolidation_candidate_limit,
            )?,
            final_skill_limit: parse_env("TOP_SKILLS_FINAL_LIMIT", defaults.final_skill_limit)?,
            cache_ttl: Duration::from_secs(parse_env(
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
        };

        let sweep_secs: u64 = parse_env("CACHE_SWEEP_SECS", 300)?;

        Ok(Config {
            france_travail_client_id: require_env("FRANCE_TRAVAIL_CLIENT_ID")?,
            france_travail_client_secret: require_env("FRANCE_TRAVAIL_CLIENT_SECRET")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            extraction_prompt_path: std::env::var("EXTRACTION_PROMPT_PATH")
                .unwrap_or_else(|_| "prompts/extraction_prompt.md".to_string()),
            consolidation_prompt_path: std::env::var("CONSOLIDATION_PROMPT_PATH")
                .unwrap_or_else(|_| "prompts/consolidation_prompt.md".to_string()),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 1u32)?.max(1),
            cache_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            pipeline,
            health: HealthSettings::default(),
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
