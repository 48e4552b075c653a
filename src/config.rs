//! Typed configuration with explicit defaults
//!
//! All settings have code-level defaults and may be overridden through
//! environment variables (a `.env` file is honored by the binary).
//! Validation happens once at load time, not at point of use.

use crate::error::ServiceError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Placeholder substituted with the customer id in endpoint templates
pub const SUBJECT_PLACEHOLDER: &str = "{customer_oid}";

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration for the Ollama runtime connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Endpoint templates for the bank data API.
///
/// Subject-scoped templates carry a `{customer_oid}` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointTemplates {
    pub customer: String,
    pub portfolio: String,
    pub accounts: String,
    pub transactions: String,
    pub risk_metrics: String,
    pub market_data: String,
}

impl Default for EndpointTemplates {
    fn default() -> Self {
        Self {
            customer: "/api/customers/{customer_oid}".to_string(),
            portfolio: "/api/portfolio/{customer_oid}".to_string(),
            accounts: "/api/accounts/{customer_oid}".to_string(),
            transactions: "/api/transactions/{customer_oid}".to_string(),
            risk_metrics: "/api/risk/{customer_oid}".to_string(),
            market_data: "/api/market-data".to_string(),
        }
    }
}

/// Configuration for the bank data API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
    pub endpoints: EndpointTemplates,
}

impl Default for BankApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 10,
            api_key: None,
            endpoints: EndpointTemplates::default(),
        }
    }
}

/// Configuration for one agent persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub role: String,
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_enabled() -> bool {
    true
}

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub port: u16,
    pub ollama: OllamaConfig,
    pub bank_api: BankApiConfig,
    pub agents: Vec<AgentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "openbanking-agents".to_string(),
            port: 8001,
            ollama: OllamaConfig::default(),
            bank_api: BankApiConfig::default(),
            agents: default_agents("llama3.2:latest"),
        }
    }
}

impl Config {
    /// Build configuration from environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server_name: env_or("SERVER_NAME", "openbanking-agents"),
            port: env_parse_or("PORT", 8001),
            ollama: OllamaConfig {
                base_url: env_or("OLLAMA_BASE_URL", "http://localhost:11434"),
                timeout_secs: env_parse_or("OLLAMA_TIMEOUT_SECS", 30),
            },
            bank_api: BankApiConfig {
                base_url: env_or("BANK_API_BASE_URL", "http://localhost:3000"),
                timeout_secs: env_parse_or("BANK_API_TIMEOUT_SECS", 10),
                api_key: env::var("BANK_API_KEY").ok().filter(|k| !k.is_empty()),
                endpoints: EndpointTemplates::default(),
            },
            agents: default_agents(&env_or("AGENT_MODEL", "llama3.2:latest")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that later code relies on.
    pub fn validate(&self) -> Result<()> {
        if self.bank_api.base_url.trim().is_empty() {
            return Err(ServiceError::Config(
                "bank_api.base_url must not be empty".to_string(),
            ));
        }
        if self.ollama.base_url.trim().is_empty() {
            return Err(ServiceError::Config(
                "ollama.base_url must not be empty".to_string(),
            ));
        }

        let subject_scoped = [
            ("customer", &self.bank_api.endpoints.customer),
            ("portfolio", &self.bank_api.endpoints.portfolio),
            ("accounts", &self.bank_api.endpoints.accounts),
            ("transactions", &self.bank_api.endpoints.transactions),
            ("risk_metrics", &self.bank_api.endpoints.risk_metrics),
        ];
        for (name, template) in subject_scoped {
            if !template.contains(SUBJECT_PLACEHOLDER) {
                return Err(ServiceError::Config(format!(
                    "endpoint template '{}' is missing the {} placeholder",
                    name, SUBJECT_PLACEHOLDER
                )));
            }
        }

        for agent in &self.agents {
            if agent.name.trim().is_empty() || agent.model.trim().is_empty() {
                return Err(ServiceError::Config(
                    "agent name and model must not be empty".to_string(),
                ));
            }
            if !(0.0..=2.0).contains(&agent.temperature) {
                return Err(ServiceError::Config(format!(
                    "agent '{}': temperature {} out of range [0.0, 2.0]",
                    agent.name, agent.temperature
                )));
            }
            if agent.max_tokens == 0 {
                return Err(ServiceError::Config(format!(
                    "agent '{}': max_tokens must be positive",
                    agent.name
                )));
            }
        }

        Ok(())
    }
}

/// The four default personas, all bound to the same configured model.
pub fn default_agents(model: &str) -> Vec<AgentConfig> {
    let agent = |name: &str, role: &str, system_prompt: &str| AgentConfig {
        name: name.to_string(),
        model: model.to_string(),
        role: role.to_string(),
        system_prompt: system_prompt.to_string(),
        temperature: default_temperature(),
        max_tokens: default_max_tokens(),
        enabled: true,
    };

    vec![
        agent(
            "market_analyst",
            "Market Data Analyst",
            "You are a specialized market data analyst agent. Your role is to \
             analyze market conditions, identify volatile situations, and provide \
             insights on current market trends. Focus on real-time data analysis \
             and market volatility assessment.",
        ),
        agent(
            "portfolio_manager",
            "Portfolio Manager",
            "You are a portfolio management agent specializing in strategy \
             development. Your role is to analyze portfolios, recommend investment \
             strategies, and provide optimization suggestions. Focus on \
             risk-adjusted returns and strategic asset allocation.",
        ),
        agent(
            "risk_analyst",
            "Risk Analyst",
            "You are a risk analysis agent focused on user-specific risk \
             assessment. Your role is to evaluate financial risks, assess user \
             risk profiles, and provide risk management recommendations. Focus on \
             personalized risk analysis and mitigation strategies.",
        ),
        agent(
            "explainability_agent",
            "Explainability & Strategy Agent",
            "You are an explainability agent specializing in making complex \
             financial concepts understandable. Your role is to provide clear \
             explanations, conduct SWOT analysis, and help users understand \
             financial decisions. Focus on clarity and educational value.",
        ),
    ]
}
