//! Source client for the bank data API
//!
//! Issues HTTP requests to named endpoints of the upstream bank
//! service and normalizes transport, status, and decode failures into
//! `SourceRecord` error markers. Errors never escape this boundary:
//! every fetch returns a value. Uses a long-lived reqwest::Client for
//! connection pooling, with a per-call timeout owned by the client.

use crate::config::{BankApiConfig, SUBJECT_PLACEHOLDER};
use crate::error::ServiceError;
use crate::models::SourceRecord;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// The five subject-scoped sources merged into a CompositeRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Profile,
    Portfolio,
    Accounts,
    Transactions,
    RiskMetrics,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::Profile => "profile",
            Source::Portfolio => "portfolio",
            Source::Accounts => "accounts",
            Source::Transactions => "transactions",
            Source::RiskMetrics => "risk_metrics",
        }
    }
}

/// Client for the bank data API
pub struct BankApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    config: BankApiConfig,
}

impl BankApiClient {
    pub fn new(config: &BankApiConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            config: config.clone(),
        })
    }

    fn template_for(&self, source: Source) -> &str {
        let endpoints = &self.config.endpoints;
        match source {
            Source::Profile => &endpoints.customer,
            Source::Portfolio => &endpoints.portfolio,
            Source::Accounts => &endpoints.accounts,
            Source::Transactions => &endpoints.transactions,
            Source::RiskMetrics => &endpoints.risk_metrics,
        }
    }

    fn subject_url(&self, source: Source, customer_oid: &str) -> String {
        let path = self
            .template_for(source)
            .replace(SUBJECT_PLACEHOLDER, customer_oid);
        format!("{}{}", self.base_url, path)
    }

    /// Single GET returning the decoded JSON body, or a typed failure.
    async fn get_json(&self, source_name: &str, url: &str) -> Result<Value> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json");

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| ServiceError::SourceFetch {
            source_name: source_name.to_string(),
            message: format!("request error: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::SourceFetch {
                source_name: source_name.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ServiceError::SourceFetch {
                source_name: source_name.to_string(),
                message: format!("invalid JSON response: {}", e),
            })
    }

    /// Converts the typed failure into a per-source error marker so
    /// that callers always receive a value.
    async fn fetch_url(&self, source_name: &str, url: &str) -> SourceRecord {
        match self.get_json(source_name, url).await {
            Ok(data) => {
                debug!(source = source_name, "Source fetch succeeded");
                SourceRecord::Data(data)
            }
            Err(e) => {
                warn!(source = source_name, error = %e, "Source fetch failed");
                SourceRecord::failed(source_name, e.to_string())
            }
        }
    }

    /// Fetch one subject-scoped source.
    pub async fn fetch(&self, source: Source, customer_oid: &str) -> SourceRecord {
        let url = self.subject_url(source, customer_oid);
        self.fetch_url(source.name(), &url).await
    }

    /// Fetch the transaction history, bounded server-side via the
    /// `limit` query parameter. If the server ignores the limit the
    /// payload is passed through untruncated.
    pub async fn fetch_transactions(&self, customer_oid: &str, limit: u32) -> SourceRecord {
        let url = format!(
            "{}?limit={}",
            self.subject_url(Source::Transactions, customer_oid),
            limit
        );
        self.fetch_url(Source::Transactions.name(), &url).await
    }

    /// Fetch general market data (not subject-scoped).
    pub async fn fetch_market_data(&self, symbols: &[String]) -> SourceRecord {
        let mut url = format!("{}{}", self.base_url, self.config.endpoints.market_data);
        if !symbols.is_empty() {
            url = format!("{}?symbols={}", url, symbols.join(","));
        }
        self.fetch_url("market_data", &url).await
    }
}
