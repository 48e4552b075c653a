//! Capability-based agent selection
//!
//! Two independent routing axes over the registry: task types fall
//! back to any registered agent when the preferred one is missing;
//! tool names do not fall back at all.

use crate::agent::Agent;
use crate::registry::{agent_for_task_type, agent_for_tool, AgentRegistry};
use std::sync::Arc;
use tracing::debug;

pub struct AgentRouter {
    registry: Arc<AgentRegistry>,
}

impl AgentRouter {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Select the agent for a task type: the table's preferred agent
    /// if registered, otherwise the first registered agent, otherwise
    /// `None` (no agents at all).
    pub fn select_for_task(&self, task_type: &str) -> Option<&Agent> {
        let preferred = agent_for_task_type(task_type);

        if let Some(agent) = self.registry.get(preferred) {
            return Some(agent);
        }

        let fallback = self.registry.first();
        if let Some(agent) = &fallback {
            debug!(
                task_type,
                preferred,
                fallback = agent.name(),
                "Preferred agent unavailable, falling back"
            );
        }
        fallback
    }

    /// Select the agent mapped to a tool name. No fallback: an
    /// unknown tool, or a mapped agent that failed probing, yields
    /// `None`.
    pub fn select_for_tool(&self, tool_name: &str) -> Option<&Agent> {
        agent_for_tool(tool_name).and_then(|name| self.registry.get(name))
    }
}
