//! Capability registry
//!
//! Holds the set of agents that passed model-availability probing,
//! plus the static routing tables mapping task types and tool names to
//! agents. Built once at startup, read-shared by all requests, never
//! mutated afterwards.

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::ServiceError;
use crate::runtime::ModelRuntime;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Default collaborator for task types absent from the table
pub const DEFAULT_AGENT: &str = "explainability_agent";

/// Static task-type routing table — editorial mapping, not derived
/// from agent configuration.
const TASK_AGENTS: &[(&str, &str)] = &[
    ("market_analysis", "market_analyst"),
    ("portfolio", "portfolio_manager"),
    ("strategy", "portfolio_manager"),
    ("risk", "risk_analyst"),
    ("explanation", "explainability_agent"),
    ("swot", "explainability_agent"),
    ("general", "explainability_agent"),
];

/// Static tool-name routing table
const TOOL_AGENTS: &[(&str, &str)] = &[
    // Market analysis tools
    ("get_market_data", "market_analyst"),
    ("analyze_stock", "market_analyst"),
    ("get_economic_indicators", "market_analyst"),
    ("market_sentiment", "market_analyst"),
    ("generate_signals", "market_analyst"),
    // Portfolio tools
    ("portfolio_analysis", "portfolio_manager"),
    ("asset_allocation", "portfolio_manager"),
    ("rebalance_portfolio", "portfolio_manager"),
    ("performance_metrics", "portfolio_manager"),
    ("backtest_strategy", "portfolio_manager"),
    ("optimize_portfolio", "portfolio_manager"),
    // Risk tools
    ("calculate_var", "risk_analyst"),
    ("stress_test", "risk_analyst"),
    ("correlation_analysis", "risk_analyst"),
    ("risk_metrics", "risk_analyst"),
    // Explanation tools
    ("explain_analysis", "explainability_agent"),
    ("swot_analysis", "explainability_agent"),
    ("summarize_results", "explainability_agent"),
];

/// Preferred agent for a task type; unknown task types route to the
/// default collaborator.
pub fn agent_for_task_type(task_type: &str) -> &'static str {
    TASK_AGENTS
        .iter()
        .find(|(task, _)| *task == task_type)
        .map(|(_, agent)| *agent)
        .unwrap_or(DEFAULT_AGENT)
}

/// Agent mapped to a tool name. Unlike task routing there is no
/// default: an unknown tool has no agent.
pub fn agent_for_tool(tool_name: &str) -> Option<&'static str> {
    TOOL_AGENTS
        .iter()
        .find(|(tool, _)| *tool == tool_name)
        .map(|(_, agent)| *agent)
}

/// Names of all routable tools.
pub fn tool_names() -> Vec<&'static str> {
    TOOL_AGENTS.iter().map(|(tool, _)| *tool).collect()
}

/// Insertion-ordered set of probed agents
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    /// Registry with no agents, used when the runtime is unreachable
    /// at startup so the server can still answer status requests.
    pub fn empty() -> Self {
        Self { agents: Vec::new() }
    }

    /// Probe model availability for each enabled agent configuration
    /// and register the agents whose model (or a same-family variant)
    /// is installed.
    ///
    /// A missing model excludes that one agent; a runtime connectivity
    /// failure fails initialization as a whole.
    pub async fn initialize(
        configs: &[AgentConfig],
        runtime: Arc<dyn ModelRuntime>,
    ) -> Result<Self> {
        let models = runtime.list_models().await?;
        let available: Vec<String> = models
            .into_iter()
            .map(|m| m.name)
            .filter(|name| !name.is_empty())
            .collect();

        info!(available = ?available, "Probing agent models");

        let mut agents = Vec::new();
        for config in configs.iter().filter(|c| c.enabled) {
            match resolve_model(&config.model, &available) {
                Some(resolved) => {
                    if resolved != config.model {
                        info!(
                            agent = %config.name,
                            configured = %config.model,
                            resolved = %resolved,
                            "Substituting available model variant"
                        );
                    }
                    info!(agent = %config.name, model = %resolved, "Registered agent");
                    agents.push(Agent::new(config.clone(), resolved, runtime.clone()));
                }
                None => {
                    let e = ServiceError::ModelUnavailable(format!(
                        "model '{}' for agent '{}' not found in {:?}",
                        config.model, config.name, available
                    ));
                    warn!(agent = %config.name, error = %e, "Agent not registered");
                }
            }
        }

        info!(agent_count = agents.len(), "Agent registry initialized");
        Ok(Self { agents })
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// First registered agent by insertion order, the task-routing
    /// fallback candidate.
    pub fn first(&self) -> Option<&Agent> {
        self.agents.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Matching policy: exact model identity first, then prefix match on
/// the base name before any `:` tag separator.
fn resolve_model(configured: &str, available: &[String]) -> Option<String> {
    if available.iter().any(|m| m.as_str() == configured) {
        return Some(configured.to_string());
    }

    let base = configured.split(':').next().unwrap_or(configured);
    available
        .iter()
        .find(|m| m.starts_with(base))
        .cloned()
}
