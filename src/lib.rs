//! OpenBanking Agent Server
//!
//! Routes natural-language requests to one of several specialized
//! agent personas backed by a local Ollama runtime, and enriches those
//! requests with customer financial data fetched in parallel from the
//! bank data API.
//!
//! REQUEST FLOW:
//! INPUT → AGGREGATE (if customer id present) → ROUTE → GENERATE → RESULT

pub mod agent;
pub mod aggregator;
pub mod api;
pub mod bank;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod runtime;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use registry::AgentRegistry;
