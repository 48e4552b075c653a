//! Agent persona wrapper
//!
//! An agent binds a system prompt and generation parameters to a model
//! identity resolved during registry probing. Prompt assembly layers
//! the system prompt, the caller-supplied context, and the aggregated
//! customer context ahead of the user query.

use crate::config::AgentConfig;
use crate::error::ServiceError;
use crate::models::CompositeRecord;
use crate::runtime::{GenerateOptions, ModelRuntime};
use crate::Result;
use std::sync::Arc;
use tracing::{error, info};

pub struct Agent {
    config: AgentConfig,
    model: String,
    runtime: Arc<dyn ModelRuntime>,
}

impl Agent {
    /// `model` is the resolved identity, which may differ from
    /// `config.model` after a probing substitution.
    pub fn new(config: AgentConfig, model: String, runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            config,
            model,
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn role(&self) -> &str {
        &self.config.role
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a response for the given query.
    ///
    /// Failures come back as a typed `Generation` error attributed to
    /// this agent; the pipeline decides how to surface them.
    pub async fn generate_response(
        &self,
        prompt: &str,
        context: Option<&str>,
        customer_data: Option<&CompositeRecord>,
    ) -> Result<String> {
        let full_prompt = build_prompt(&self.config.system_prompt, prompt, context, customer_data);

        let options = GenerateOptions {
            temperature: self.config.temperature,
            num_predict: self.config.max_tokens,
        };

        info!(agent = %self.config.name, model = %self.model, "Generating response");

        self.runtime
            .generate(&self.model, &full_prompt, options)
            .await
            .map_err(|e| {
                error!(agent = %self.config.name, error = %e, "Generation failed");
                ServiceError::Generation {
                    agent: self.config.name.clone(),
                    message: e.to_string(),
                }
            })
    }
}

/// Assemble the full prompt handed to the runtime.
fn build_prompt(
    system_prompt: &str,
    query: &str,
    context: Option<&str>,
    customer_data: Option<&CompositeRecord>,
) -> String {
    let mut full_prompt = format!("{}\n\n", system_prompt);

    if let Some(context) = context {
        full_prompt.push_str(&format!("Context: {}\n\n", context));
    }

    if let Some(customer) = customer_data {
        full_prompt.push_str(&format!("Customer Context: {}\n\n", customer.context_block()));
    }

    full_prompt.push_str(&format!("User Query: {}", query));
    full_prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceRecord;
    use serde_json::json;

    fn composite() -> CompositeRecord {
        CompositeRecord {
            customer_oid: "CUST1".to_string(),
            profile: SourceRecord::Data(json!({"name": "Ada"})),
            portfolio: SourceRecord::Data(json!({})),
            accounts: SourceRecord::Data(json!({})),
            transactions: SourceRecord::Data(json!({})),
            risk_metrics: SourceRecord::Data(json!({})),
        }
    }

    #[test]
    fn test_prompt_layering_with_customer_data() {
        let prompt = build_prompt(
            "You are a risk analyst.",
            "How risky is my portfolio?",
            Some("Quarterly review"),
            Some(&composite()),
        );

        let system_pos = prompt.find("You are a risk analyst.").unwrap();
        let context_pos = prompt.find("Context: Quarterly review").unwrap();
        let customer_pos = prompt.find("Customer Data for CUST1").unwrap();
        let query_pos = prompt.find("User Query: How risky is my portfolio?").unwrap();

        assert!(system_pos < context_pos);
        assert!(context_pos < customer_pos);
        assert!(customer_pos < query_pos);
    }

    #[test]
    fn test_prompt_without_optional_sections() {
        let prompt = build_prompt("System.", "Question?", None, None);
        assert!(!prompt.contains("Context:"));
        assert!(!prompt.contains("Customer Context:"));
        assert!(prompt.ends_with("User Query: Question?"));
    }
}
