//! Job-posting sources. The pipeline only sees the `PostingSource` trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::posting::JobPosting;

pub mod france_travail;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

#[async_trait]
pub trait PostingSource: Send + Sync {
    /// Up to `max_offers` postings matching `title`. An empty list is a normal outcome.
    async fn search_offers(
        &self,
        title: &str,
        max_offers: usize,
    ) -> Result<Vec<JobPosting>, SourceError>;
}
