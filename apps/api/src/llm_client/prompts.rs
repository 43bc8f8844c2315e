// Shared prompt constants and prompt-building utilities.
// The long-form extraction and consolidation templates live on disk (see `prompts/`)
// and are loaded once by the extractor; this file holds the fixed fragments.

/// System prompt for per-batch skill extraction.
pub const EXTRACTION_SYSTEM: &str = "You are an expert labour-market analyst. \
    You read job postings and list the concrete skills and the education level each one asks for. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// System prompt for the consolidation pass.
pub const CONSOLIDATION_SYSTEM: &str = "You are an expert taxonomist of professional skills. \
    You merge synonyms, abbreviations and spelling variants into canonical skill names. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

pub const JOB_TITLE_PLACEHOLDER: &str = "{job_title}";
pub const DESCRIPTIONS_PLACEHOLDER: &str = "{indexed_descriptions}";
pub const SKILLS_PLACEHOLDER: &str = "__SKILLS_TO_CONSOLIDATE__";

/// Separator between numbered descriptions inside one extraction prompt.
const DESCRIPTION_SEPARATOR: &str = "\n---\n";

/// Fills the extraction template. Descriptions are numbered from 0 so the
/// model can keep one output record per input posting.
pub fn render_extraction_prompt(template: &str, job_title: &str, descriptions: &[String]) -> String {
    let indexed = descriptions
        .iter()
        .enumerate()
        .map(|(i, desc)| format!("{i}: {desc}"))
        .collect::<Vec<_>>()
        .join(DESCRIPTION_SEPARATOR);

    template
        .replace(JOB_TITLE_PLACEHOLDER, job_title)
        .replace(DESCRIPTIONS_PLACEHOLDER, &indexed)
}

/// Fills the consolidation template with the candidates as a JSON array.
pub fn render_consolidation_prompt(template: &str, skills: &[String]) -> String {
    let skills_json = serde_json::to_string(skills).unwrap_or_else(|_| "[]".to_string());
    template.replace(SKILLS_PLACEHOLDER, &skills_json)
}
