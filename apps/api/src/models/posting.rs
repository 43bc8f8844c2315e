use serde::{Deserialize, Serialize};

/// A job posting as returned by the job source. Only the description feeds the
/// pipeline; the rest is carried for logging and debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "intitule")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl JobPosting {
    /// The description, if present and not blank.
    pub fn usable_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|desc| !desc.trim().is_empty())
    }
}
