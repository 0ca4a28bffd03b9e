//! Search Console `searchAnalytics.query` client.

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::error;

use crate::config;
use crate::credentials::AuthToken;
use crate::error::{EtlError, Result};
use crate::models::{SearchAnalyticsRequest, SearchAnalyticsResponse};

/// The reporting API contract the extractor depends on.
///
/// `Ok(None)` means the API returned no response body for the query.
pub trait SearchAnalytics {
    fn query(
        &self,
        site: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<Option<SearchAnalyticsResponse>>;
}

/// Blocking HTTP client for the Search Console webmasters v3 API.
pub struct SearchConsoleClient {
    client: Client,
    token: AuthToken,
    base_url: String,
}

impl SearchConsoleClient {
    pub fn new(token: AuthToken, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            token,
            base_url: config::API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (e.g. a local stub).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn query_url(&self, site: &str) -> String {
        format!(
            "{}/sites/{}/searchAnalytics/query",
            self.base_url,
            urlencoding::encode(site)
        )
    }
}

impl SearchAnalytics for SearchConsoleClient {
    fn query(
        &self,
        site: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<Option<SearchAnalyticsResponse>> {
        let resp = self
            .client
            .post(self.query_url(site))
            .header(AUTHORIZATION, self.token.authorization_header())
            .json(request)
            .send()
            .map_err(EtlError::extraction)?;

        let status = resp.status();
        let body = resp.text().map_err(EtlError::extraction)?;
        if !status.is_success() {
            error!("HTTP error {}: {}", status, body);
            return Err(EtlError::Extraction(format!(
                "query for {} on {} failed with HTTP {}: {}",
                site, request.start_date, status, body
            )));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        let parsed: SearchAnalyticsResponse = serde_json::from_str(&body)
            .map_err(|e| EtlError::Extraction(format!("malformed response: {}", e)))?;
        Ok(Some(parsed))
    }
}
