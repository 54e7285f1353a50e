use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetch::normalize::NormalizedUrl;

/// Core Web Vitals summary for the audited page
#[derive(Debug, Clone, Default)]
pub struct PageSpeedMetrics {
    pub performance_score: Option<u32>,
    pub fcp: Option<String>,
    pub lcp: Option<String>,
    pub cls: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageSpeedResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Option<Categories>,
    audits: Option<std::collections::HashMap<String, AuditEntry>>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AuditEntry {
    #[serde(rename = "displayValue")]
    display_value: Option<String>,
}

/// Optional performance-insights collaborator. The pipeline treats it as
/// best-effort: any failure here degrades to a digest without the
/// Performance Metrics section, never a failed request.
pub struct PageSpeedClient {
    client: Client,
    api_key: String,
}

impl PageSpeedClient {
    const ENDPOINT: &'static str =
        "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create PageSpeed HTTP client")?;

        Ok(Self { client, api_key })
    }

    /// Fetch mobile performance metrics for the URL, or `None` when the
    /// API is unavailable or the payload is missing the fields we need
    pub async fn fetch_metrics(&self, url: &NormalizedUrl) -> Option<PageSpeedMetrics> {
        debug!("Fetching PageSpeed insights for {}", url);

        let response = match self
            .client
            .get(Self::ENDPOINT)
            .query(&[
                ("url", url.as_str()),
                ("key", self.api_key.as_str()),
                ("strategy", "MOBILE"),
                ("category", "PERFORMANCE"),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("PageSpeed request failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("PageSpeed API returned {} for {}", response.status(), url);
            return None;
        }

        let payload: PageSpeedResponse = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to parse PageSpeed response for {}: {}", url, e);
                return None;
            }
        };

        let lighthouse = payload.lighthouse_result?;

        let performance_score = lighthouse
            .categories
            .as_ref()
            .and_then(|c| c.performance.as_ref())
            .and_then(|p| p.score)
            .map(|score| (score * 100.0).round() as u32);

        let audits = lighthouse.audits.unwrap_or_default();
        let display = |key: &str| audits.get(key).and_then(|a| a.display_value.clone());

        let metrics = PageSpeedMetrics {
            performance_score,
            fcp: display("first-contentful-paint"),
            lcp: display("largest-contentful-paint"),
            cls: display("cumulative-layout-shift"),
        };

        if metrics.performance_score.is_none() && metrics.fcp.is_none() {
            warn!("PageSpeed response for {} carried no usable metrics", url);
            return None;
        }

        debug!(
            "PageSpeed insights for {}: score {:?}",
            url, metrics.performance_score
        );

        Some(metrics)
    }
}
