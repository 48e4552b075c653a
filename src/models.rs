//! Core data models for the agent server

use serde::Serialize;
use serde_json::Value;

/// Sentinel agent name reported when routing found no candidate
pub const NO_AGENT: &str = "none";

//
// ================= Source Records =================
//

/// Per-source failure marker, isolated from its sibling fetches
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceError {
    pub error: String,
    pub source: String,
}

/// Result of one source fetch: either the decoded payload or an
/// isolated error descriptor. Immutable once produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SourceRecord {
    Data(Value),
    Failed(SourceError),
}

impl SourceRecord {
    pub fn failed(source: &str, message: impl Into<String>) -> Self {
        Self::Failed(SourceError {
            error: message.into(),
            source: source.to_string(),
        })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Compact rendering for prompt context.
    pub fn render(&self) -> String {
        match self {
            Self::Data(value) => value.to_string(),
            Self::Failed(err) => format!("unavailable ({})", err.error),
        }
    }
}

//
// ================= Composite Record =================
//

/// Merged result of the five parallel per-source fetches.
///
/// Always carries all five fields regardless of how many sources
/// failed; assembled atomically after every fetch has settled.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRecord {
    pub customer_oid: String,
    pub profile: SourceRecord,
    pub portfolio: SourceRecord,
    pub accounts: SourceRecord,
    pub transactions: SourceRecord,
    pub risk_metrics: SourceRecord,
}

impl CompositeRecord {
    /// Number of sources that came back with an error marker.
    pub fn failed_count(&self) -> usize {
        [
            &self.profile,
            &self.portfolio,
            &self.accounts,
            &self.transactions,
            &self.risk_metrics,
        ]
        .iter()
        .filter(|r| r.is_failed())
        .count()
    }

    /// Text block handed to an agent as customer context.
    pub fn context_block(&self) -> String {
        format!(
            "Customer Data for {}:\n\
             - Customer Profile: {}\n\
             - Portfolio: {}\n\
             - Accounts: {}\n\
             - Recent Transactions: {}\n\
             - Risk Metrics: {}\n",
            self.customer_oid,
            self.profile.render(),
            self.portfolio.render(),
            self.accounts.render(),
            self.transactions.render(),
            self.risk_metrics.render(),
        )
    }
}

//
// ================= Routing Result =================
//

/// Outcome of one routed request.
///
/// Exactly one of `response` / `error` is set, so callers can tell an
/// answer apart from a recovered failure. `agent_name` is `"none"`
/// when no agent could be selected at all.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingResult {
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoutingResult {
    pub fn answered(agent_name: &str, response: String) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(agent_name: &str, error: String) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            response: None,
            error: Some(error),
        }
    }

    pub fn no_agent(error: impl Into<String>) -> Self {
        Self {
            agent_name: NO_AGENT.to_string(),
            response: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composite() -> CompositeRecord {
        CompositeRecord {
            customer_oid: "CUST1".to_string(),
            profile: SourceRecord::Data(json!({"name": "Ada"})),
            portfolio: SourceRecord::Data(json!({"holdings": []})),
            accounts: SourceRecord::failed("accounts", "timeout"),
            transactions: SourceRecord::Data(json!({"transactions": []})),
            risk_metrics: SourceRecord::Data(json!({"var_95": 0.02})),
        }
    }

    #[test]
    fn test_composite_serializes_all_five_keys() {
        let value = serde_json::to_value(composite()).unwrap();
        for key in ["profile", "portfolio", "accounts", "transactions", "risk_metrics"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["accounts"]["error"], "timeout");
        assert_eq!(value["accounts"]["source"], "accounts");
    }

    #[test]
    fn test_failed_count() {
        assert_eq!(composite().failed_count(), 1);
    }

    #[test]
    fn test_context_block_includes_failures_inline() {
        let block = composite().context_block();
        assert!(block.contains("Customer Data for CUST1"));
        assert!(block.contains("unavailable (timeout)"));
        assert!(block.contains("var_95"));
    }

    #[test]
    fn test_routing_result_union() {
        let ok = RoutingResult::answered("risk_analyst", "fine".to_string());
        assert!(!ok.is_error());

        let none = RoutingResult::no_agent("No agents available");
        assert_eq!(none.agent_name, NO_AGENT);
        assert!(none.is_error());

        let value = serde_json::to_value(&none).unwrap();
        assert!(value.get("response").is_none());
    }
}
