use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::config::{AuditorConfig, FetchMode};
use crate::completion::pagespeed::PageSpeedClient;
use crate::completion::{templates, CompletionClient};
use crate::digest;
use crate::error::AuditError;
use crate::extract::reducer::Extractor;
use crate::fetch::rendered::RenderedFetch;
use crate::fetch::static_fetch::StaticFetch;
use crate::fetch::{normalize, FetchStrategy};

/// Which critique the completion backend is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Full-site conversion analysis
    Analyze,
    /// Landing-page audit with the outreach email
    Audit,
}

impl AnalysisKind {
    fn template(&self) -> &'static str {
        match self {
            AnalysisKind::Analyze => templates::ANALYZE_TEMPLATE,
            AnalysisKind::Audit => templates::AUDIT_TEMPLATE,
        }
    }
}

/// The per-request pipeline: normalize, fetch, extract, assemble,
/// complete. Strictly sequential within a request; the only shared state
/// across requests is the read-only configuration.
pub struct AuditPipeline {
    config: AuditorConfig,
    fetcher: Arc<dyn FetchStrategy>,
    extractor: Extractor,
    completion: CompletionClient,
    pagespeed: Option<PageSpeedClient>,
}

impl AuditPipeline {
    /// Build a pipeline with the fetch strategy the configuration selects
    pub fn from_config(config: AuditorConfig) -> Result<Self> {
        let fetcher: Arc<dyn FetchStrategy> = match config.fetch.mode {
            FetchMode::Static => Arc::new(StaticFetch::new(
                config.fetch.clone(),
                config.browser.fingerprints.clone(),
            )?),
            FetchMode::Rendered => {
                Arc::new(RenderedFetch::new(config.browser.clone(), &config.fetch))
            }
        };

        Self::with_fetcher(config, fetcher)
    }

    /// Build a pipeline around an explicit fetch strategy
    pub fn with_fetcher(config: AuditorConfig, fetcher: Arc<dyn FetchStrategy>) -> Result<Self> {
        let extractor = Extractor::new(config.extractor.clone())?;
        let completion = CompletionClient::new(config.completion.clone())?;
        let pagespeed = match &config.completion.pagespeed_api_key {
            Some(key) => Some(PageSpeedClient::new(key.clone())?),
            None => None,
        };

        Ok(Self { config, fetcher, extractor, completion, pagespeed })
    }

    /// Run one request end to end and return the backend's critique text
    pub async fn run(&self, raw_url: &str, kind: AnalysisKind) -> Result<String, AuditError> {
        let request_id = Uuid::new_v4();

        // A missing key can never be fixed by fetching, so fail before
        // touching the network
        if !self.completion.is_configured() {
            return Err(AuditError::BackendConfig("GROQ_API_KEY is not set".to_string()));
        }

        let url = normalize::normalize(raw_url)
            .ok_or_else(|| AuditError::InvalidInput(raw_url.to_string()))?;

        info!(request = %request_id, url = %url, kind = ?kind, "Starting audit request");

        let page = self
            .fetcher
            .fetch(&url)
            .await
            .into_result(self.config.fetch.min_body_len)?;

        debug!(request = %request_id, "Fetched {} bytes from {}", page.html.len(), page.final_url);

        let fragments = self.extractor.extract(&page.html);

        let metrics = match &self.pagespeed {
            Some(client) => client.fetch_metrics(&url).await,
            None => None,
        };

        let digest = digest::assemble(&fragments, metrics.as_ref(), &self.config.digest);

        // Insufficient content is measured against the assembled digest,
        // the one place where all extracted text comes together
        let digest_len = digest.chars().count();
        if digest_len < self.config.digest.min_content_len {
            info!(request = %request_id, "Digest too short: {} chars", digest_len);
            return Err(AuditError::InsufficientContent { length: digest_len });
        }

        let result = self.completion.complete(&digest, kind.template()).await?;

        info!(request = %request_id, "Audit request completed");

        Ok(result)
    }
}
