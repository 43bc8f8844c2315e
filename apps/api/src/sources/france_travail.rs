//! France Travail "Offres d'emploi v2" client.
//!
//! Authenticates with OAuth2 client credentials (token cached until shortly
//! before it expires) and pages through `offres/search` with `range=start-end`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::posting::JobPosting;
use crate::sources::{PostingSource, SourceError};

pub const DEFAULT_TOKEN_URL: &str =
    "https://entreprise.francetravail.fr/connexion/oauth2/access_token?realm=%2Fpartenaire";
pub const DEFAULT_API_BASE_URL: &str = "https://api.francetravail.io/partenaire/offresdemploi/v2";
const SCOPE: &str = "api_offresdemploiv2 o2dsoffre";
/// The search endpoint serves at most 150 postings per request.
const PAGE_SIZE: usize = 150;
/// The API refuses ranges starting beyond this index.
const MAX_RANGE_START: usize = 3000;
/// Refresh the token this long before the server says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct FranceTravailConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl FranceTravailConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resultats: Vec<JobPosting>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FranceTravailClient {
    client: Client,
    config: FranceTravailConfig,
    token: Mutex<Option<CachedToken>>,
}

impl FranceTravailClient {
    pub fn new(config: FranceTravailConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            config,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("France Travail token refreshed (valid {}s)", token.expires_in);

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Fetches postings `start..=end`.
    async fn fetch_page(
        &self,
        token: &str,
        title: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<JobPosting>, SourceError> {
        let range = format!("{start}-{end}");
        let response = self
            .client
            .get(format!("{}/offres/search", self.config.api_base_url))
            .bearer_auth(token)
            .query(&[("motsCles", title), ("range", range.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(Vec::new()),
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                Ok(response.json::<SearchResponse>().await?.resultats)
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(SourceError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl PostingSource for FranceTravailClient {
    async fn search_offers(
        &self,
        title: &str,
        max_offers: usize,
    ) -> Result<Vec<JobPosting>, SourceError> {
        if max_offers == 0 {
            return Ok(Vec::new());
        }

        let token = self.access_token().await?;
        let mut postings: Vec<JobPosting> = Vec::with_capacity(max_offers.min(PAGE_SIZE));
        let mut start = 0;

        while postings.len() < max_offers && start <= MAX_RANGE_START {
            let end = (start + PAGE_SIZE).min(max_offers) - 1;
            let page = match self.fetch_page(&token, title, start, end).await {
                Ok(page) => page,
                // Keep what earlier pages returned rather than failing the whole search.
                Err(e) if !postings.is_empty() => {
                    warn!("France Travail page {start}-{end} failed, keeping {} postings: {e}", postings.len());
                    break;
                }
                Err(e) => return Err(e),
            };

            let fetched = page.len();
            postings.extend(page);
            if fetched < end - start + 1 {
                break;
            }
            start = end + 1;
        }

        postings.truncate(max_offers);
        info!("France Travail returned {} postings for '{title}'", postings.len());
        Ok(postings)
    }
}
