//! Request pipeline
//!
//! Composes aggregation, routing, and generation for one inbound
//! request: fetch the composite customer record when a subject id is
//! present, select an agent, invoke it, and recover failures into
//! typed routing results.

use crate::agent::Agent;
use crate::aggregator::Aggregator;
use crate::bank::BankApiClient;
use crate::models::{CompositeRecord, RoutingResult};
use crate::registry::AgentRegistry;
use crate::router::AgentRouter;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Agent selection for the analyze operation. Independent of the
/// task-type routing table and kept that way deliberately.
const ANALYSIS_AGENTS: &[(&str, &str)] = &[
    ("portfolio", "portfolio_manager"),
    ("risk", "risk_analyst"),
    ("market", "market_analyst"),
    ("comprehensive", "explainability_agent"),
];

const DEFAULT_ANALYSIS_AGENT: &str = "explainability_agent";

pub struct Pipeline {
    registry: Arc<AgentRegistry>,
    router: AgentRouter,
    aggregator: Aggregator,
    bank: Arc<BankApiClient>,
}

impl Pipeline {
    pub fn new(registry: Arc<AgentRegistry>, bank: Arc<BankApiClient>) -> Self {
        Self {
            router: AgentRouter::new(registry.clone()),
            aggregator: Aggregator::new(bank.clone()),
            registry,
            bank,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Composite record for one customer, re-fetched on every call.
    pub async fn fetch_customer(&self, customer_oid: &str) -> Result<CompositeRecord> {
        self.aggregator.fetch_composite(customer_oid).await
    }

    /// Route by task type (with fallback) and invoke the selected
    /// agent.
    pub async fn query_best(
        &self,
        prompt: &str,
        task_type: &str,
        customer_oid: Option<&str>,
        context: Option<&str>,
    ) -> RoutingResult {
        let Some(agent) = self.router.select_for_task(task_type) else {
            warn!(task_type, "No agents registered");
            return RoutingResult::no_agent("No agents available");
        };

        info!(task_type, agent = agent.name(), "Routing query");
        self.invoke(agent, prompt, context, customer_oid).await
    }

    /// Address a specific agent by name.
    pub async fn query_agent(
        &self,
        agent_name: &str,
        prompt: &str,
        customer_oid: Option<&str>,
        context: Option<&str>,
    ) -> RoutingResult {
        let Some(agent) = self.registry.get(agent_name) else {
            return RoutingResult::no_agent(format!("Agent not found: {}", agent_name));
        };

        self.invoke(agent, prompt, context, customer_oid).await
    }

    /// Route by tool name (no fallback) and invoke the mapped agent
    /// with a tool-execution prompt.
    pub async fn call_tool(&self, tool_name: &str, arguments: &Value) -> RoutingResult {
        let Some(agent) = self.router.select_for_tool(tool_name) else {
            return RoutingResult::no_agent(format!(
                "No agent available for tool: {}",
                tool_name
            ));
        };

        let customer_oid = arguments
            .get("customer_oid")
            .or_else(|| arguments.get("CustomerOID"))
            .and_then(|v| v.as_str());

        // Market tools may name symbols; consult the market-data
        // endpoint and hand the payload to the agent as context.
        let market_context = if tool_name == "get_market_data" {
            let symbols = extract_symbols(arguments);
            let record = self.bank.fetch_market_data(&symbols).await;
            Some(format!("Market data: {}", record.render()))
        } else {
            None
        };

        let prompt = format!(
            "Execute the following tool: {}\n\
             Arguments: {}\n\n\
             Provide a detailed response based on your role as {}.\n\
             Analyze the request and provide insights according to your expertise.\n\
             If customer data is available, provide personalized recommendations.",
            tool_name, arguments, agent.role()
        );

        info!(tool_name, agent = agent.name(), "Routing tool call");
        self.invoke(agent, &prompt, market_context.as_deref(), customer_oid)
            .await
    }

    /// Customer analysis with the fixed analysis-type mapping. No
    /// fallback: a missing mapped agent is reported, not substituted.
    pub async fn analyze(&self, customer_oid: &str, analysis_type: &str) -> RoutingResult {
        let agent_name = ANALYSIS_AGENTS
            .iter()
            .find(|(kind, _)| *kind == analysis_type)
            .map(|(_, agent)| *agent)
            .unwrap_or(DEFAULT_ANALYSIS_AGENT);

        let Some(agent) = self.registry.get(agent_name) else {
            return RoutingResult::no_agent(format!("Agent not available: {}", agent_name));
        };

        let prompt = format!(
            "Provide a {} analysis for this customer's financial situation.",
            analysis_type
        );

        info!(customer_oid, analysis_type, agent = agent_name, "Running analysis");
        self.invoke(agent, &prompt, None, Some(customer_oid)).await
    }

    /// Aggregate (when a subject is present), generate, and recover
    /// failures into results attributed to the responsible agent.
    async fn invoke(
        &self,
        agent: &Agent,
        prompt: &str,
        context: Option<&str>,
        customer_oid: Option<&str>,
    ) -> RoutingResult {
        let customer_data = match customer_oid {
            Some(oid) => match self.aggregator.fetch_composite(oid).await {
                Ok(record) => Some(record),
                Err(e) => {
                    return RoutingResult::failed(agent.name(), e.to_string());
                }
            },
            None => None,
        };

        match agent
            .generate_response(prompt, context, customer_data.as_ref())
            .await
        {
            Ok(response) => RoutingResult::answered(agent.name(), response),
            Err(e) => RoutingResult::failed(
                agent.name(),
                format!("Error: Unable to generate response - {}", e),
            ),
        }
    }
}

/// Accepts either a JSON array of symbols or a comma-separated string.
fn extract_symbols(arguments: &Value) -> Vec<String> {
    match arguments.get("symbols") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
