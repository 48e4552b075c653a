//! Parallel multi-source aggregation
//!
//! Fans out the five per-customer source fetches concurrently and
//! joins them with a wait-for-all barrier. Individual source failures
//! are isolated into per-field error markers; the aggregation itself
//! only fails on a malformed subject, before any fetch is dispatched.

use crate::bank::{BankApiClient, Source};
use crate::error::ServiceError;
use crate::models::CompositeRecord;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Server-side bound on the transaction history fetch
pub const TRANSACTION_FETCH_LIMIT: u32 = 50;

/// Fetches and merges the composite customer record
pub struct Aggregator {
    bank: Arc<BankApiClient>,
}

impl Aggregator {
    pub fn new(bank: Arc<BankApiClient>) -> Self {
        Self { bank }
    }

    /// Fetch all five sources concurrently and assemble the composite
    /// record once every fetch has settled.
    ///
    /// The five futures are joined in-task: none outlives the join
    /// point, and dropping the caller cancels all of them. No fetch is
    /// aborted because a sibling failed.
    pub async fn fetch_composite(&self, customer_oid: &str) -> Result<CompositeRecord> {
        let subject = customer_oid.trim();
        if subject.is_empty() {
            return Err(ServiceError::AggregationFault(
                "customer id must not be empty".to_string(),
            ));
        }

        let (profile, portfolio, accounts, transactions, risk_metrics) = tokio::join!(
            self.bank.fetch(Source::Profile, subject),
            self.bank.fetch(Source::Portfolio, subject),
            self.bank.fetch(Source::Accounts, subject),
            self.bank.fetch_transactions(subject, TRANSACTION_FETCH_LIMIT),
            self.bank.fetch(Source::RiskMetrics, subject),
        );

        let record = CompositeRecord {
            customer_oid: subject.to_string(),
            profile,
            portfolio,
            accounts,
            transactions,
            risk_metrics,
        };

        let failed = record.failed_count();
        if failed > 0 {
            warn!(
                customer_oid = subject,
                failed_sources = failed,
                "Composite record assembled with partial data"
            );
        } else {
            info!(customer_oid = subject, "Composite record assembled");
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankApiConfig;
    use crate::models::SourceRecord;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn payload_route(key: &'static str) -> axum::routing::MethodRouter {
        get(move |Path(id): Path<String>| async move {
            Json(json!({ "source": key, "id": id }))
        })
    }

    fn healthy_bank() -> Router {
        Router::new()
            .route("/api/customers/:id", payload_route("customer"))
            .route("/api/portfolio/:id", payload_route("portfolio"))
            .route("/api/accounts/:id", payload_route("accounts"))
            .route("/api/transactions/:id", payload_route("transactions"))
            .route("/api/risk/:id", payload_route("risk"))
    }

    async fn aggregator_for(app: Router, timeout_secs: u64) -> Aggregator {
        let config = BankApiConfig {
            base_url: spawn_stub(app).await,
            timeout_secs,
            ..BankApiConfig::default()
        };
        Aggregator::new(Arc::new(BankApiClient::new(&config).unwrap()))
    }

    #[tokio::test]
    async fn test_composite_has_all_five_fields() {
        let aggregator = aggregator_for(healthy_bank(), 2).await;

        let record = aggregator.fetch_composite("CUST1").await.unwrap();
        assert_eq!(record.customer_oid, "CUST1");
        assert_eq!(record.failed_count(), 0);
        assert!(matches!(record.profile, SourceRecord::Data(_)));
        assert!(matches!(record.transactions, SourceRecord::Data(_)));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_not_an_aggregate_error() {
        // Empty router: every source 404s.
        let aggregator = aggregator_for(Router::new(), 2).await;

        let record = aggregator.fetch_composite("CUST1").await.unwrap();
        assert_eq!(record.failed_count(), 5);
    }

    #[tokio::test]
    async fn test_single_timeout_leaves_siblings_intact() {
        // Accounts hangs past the client timeout; the other four answer.
        let app = Router::new()
            .route("/api/customers/:id", payload_route("customer"))
            .route("/api/portfolio/:id", payload_route("portfolio"))
            .route(
                "/api/accounts/:id",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!({"never": "reached"}))
                }),
            )
            .route("/api/transactions/:id", payload_route("transactions"))
            .route("/api/risk/:id", payload_route("risk"));

        let aggregator = aggregator_for(app, 1).await;

        let record = aggregator.fetch_composite("CUST1").await.unwrap();
        assert_eq!(record.failed_count(), 1);
        assert!(record.accounts.is_failed());
        assert!(matches!(record.profile, SourceRecord::Data(_)));
        assert!(matches!(record.portfolio, SourceRecord::Data(_)));
        assert!(matches!(record.transactions, SourceRecord::Data(_)));
        assert!(matches!(record.risk_metrics, SourceRecord::Data(_)));
    }

    #[tokio::test]
    async fn test_blank_subject_is_an_aggregation_fault() {
        let aggregator = aggregator_for(healthy_bank(), 2).await;

        let result = aggregator.fetch_composite("   ").await;
        assert!(matches!(result, Err(ServiceError::AggregationFault(_))));
    }
}
