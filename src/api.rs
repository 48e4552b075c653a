//! REST API server
//!
//! Exposes the agent pipeline via HTTP+JSON. Domain-level failures are
//! returned as 200 responses with an `error` body; only transport
//! failures against upstream services appear, as text, inside that
//! body.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::RoutingResult;
use crate::pipeline::Pipeline;
use crate::registry::tool_names;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
    #[serde(default, alias = "CustomerOID")]
    pub customer_oid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, alias = "CustomerOID")]
    pub customer_oid: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

fn default_agent_type() -> String {
    "market_analyst".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, alias = "CustomerOID")]
    pub customer_oid: Option<String>,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
}

fn default_analysis_type() -> String {
    "comprehensive".to_string()
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize)]
pub struct AgentStatus {
    pub available: bool,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub agents: BTreeMap<String, AgentStatus>,
    pub tools: Vec<&'static str>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Handlers
/// =============================

async fn call_tool(
    State(state): State<ApiState>,
    Json(req): Json<CallRequest>,
) -> Json<Value> {
    info!(tool_name = %req.tool_name, "Received tool call");

    let mut arguments = match req.arguments {
        Some(Value::Object(map)) => Value::Object(map),
        Some(other) => json!({ "input": other }),
        None => json!({}),
    };

    // Mirror a top-level customer id into the tool arguments under
    // both accepted spellings.
    if let Some(oid) = &req.customer_oid {
        arguments["customer_oid"] = json!(oid);
        arguments["CustomerOID"] = json!(oid);
    }

    match state.pipeline.call_tool(&req.tool_name, &arguments).await {
        RoutingResult {
            response: Some(result),
            ..
        } => Json(json!({ "result": result })),
        RoutingResult { error, .. } => Json(json!({
            "error": error.unwrap_or_else(|| "tool call failed".to_string())
        })),
    }
}

async fn query_agent(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> Json<Value> {
    let Some(query) = req.query.as_deref().filter(|q| !q.trim().is_empty()) else {
        return Json(json!({ "error": "Query is required" }));
    };

    info!(agent_type = %req.agent_type, "Received agent query");

    let result = state
        .pipeline
        .query_agent(
            &req.agent_type,
            query,
            req.customer_oid.as_deref(),
            req.context.as_deref(),
        )
        .await;

    match result {
        RoutingResult {
            response: Some(response),
            ..
        } => Json(json!({ "response": response })),
        RoutingResult { error, .. } => Json(json!({
            "error": error.unwrap_or_else(|| "query failed".to_string())
        })),
    }
}

async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let agents = state
        .pipeline
        .registry()
        .iter()
        .map(|agent| {
            (
                agent.name().to_string(),
                AgentStatus {
                    available: true,
                    model: agent.model().to_string(),
                },
            )
        })
        .collect();

    Json(StatusResponse {
        status: "running",
        agents,
        tools: tool_names(),
    })
}

async fn customer_record(
    State(state): State<ApiState>,
    Path(customer_oid): Path<String>,
) -> Json<Value> {
    match state.pipeline.fetch_customer(&customer_oid).await {
        Ok(record) => Json(serde_json::to_value(record).unwrap_or_else(|e| {
            json!({ "error": format!("serialization failed: {}", e) })
        })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

async fn analyze_customer(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<Value> {
    let Some(customer_oid) = req.customer_oid.as_deref().filter(|c| !c.trim().is_empty())
    else {
        return Json(json!({ "error": "customer_oid is required" }));
    };

    let result = state
        .pipeline
        .analyze(customer_oid, &req.analysis_type)
        .await;

    match result {
        RoutingResult {
            agent_name,
            response: Some(analysis),
            ..
        } => Json(json!({
            "customer_oid": customer_oid,
            "analysis_type": req.analysis_type,
            "agent_used": agent_name,
            "analysis": analysis,
        })),
        RoutingResult { error, .. } => Json(json!({
            "error": error.unwrap_or_else(|| "analysis failed".to_string())
        })),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<Pipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", get(health))
        .route("/call", post(call_tool))
        .route("/query", post(query_agent))
        .route("/status", get(status))
        .route("/customer/:customer_oid", get(customer_record))
        .route("/analyze", post(analyze_customer))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<Pipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankApiClient;
    use crate::config::{default_agents, BankApiConfig};
    use crate::registry::AgentRegistry;
    use crate::runtime::testing::StubRuntime;
    use axum::extract::Path as AxumPath;
    use axum::routing::get as axum_get;
    use serde_json::json;

    async fn spawn_bank_stub() -> String {
        let route = |key: &'static str| {
            axum_get(move |AxumPath(id): AxumPath<String>| async move {
                Json(json!({ "source": key, "id": id }))
            })
        };
        let app = Router::new()
            .route("/api/customers/:id", route("customer"))
            .route("/api/portfolio/:id", route("portfolio"))
            .route("/api/accounts/:id", route("accounts"))
            .route("/api/transactions/:id", route("transactions"))
            .route("/api/risk/:id", route("risk"));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn spawn_api(registry: AgentRegistry) -> String {
        let config = BankApiConfig {
            base_url: spawn_bank_stub().await,
            timeout_secs: 2,
            ..BankApiConfig::default()
        };
        let bank = Arc::new(BankApiClient::new(&config).unwrap());
        let pipeline = Arc::new(Pipeline::new(Arc::new(registry), bank));

        let app = create_router(pipeline);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn full_registry() -> AgentRegistry {
        AgentRegistry::initialize(
            &default_agents("llama3.2:latest"),
            Arc::new(StubRuntime::with_models(&["llama3.2:latest"])),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_with_zero_agents() {
        let base = spawn_api(AgentRegistry::empty()).await;

        let body: Value = reqwest::get(format!("{}/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "running");
        assert_eq!(body["agents"], json!({}));
        assert!(!body["tools"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_agent_models() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::get(format!("{}/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["agents"]["risk_analyst"]["available"], true);
        assert_eq!(body["agents"]["risk_analyst"]["model"], "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_analyze_end_to_end() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/analyze", base))
            .json(&json!({"customer_oid": "CUST1", "analysis_type": "risk"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(
            body,
            json!({
                "customer_oid": "CUST1",
                "analysis_type": "risk",
                "agent_used": "risk_analyst",
                "analysis": "OK",
            })
        );
    }

    #[tokio::test]
    async fn test_analyze_requires_customer() {
        let base = spawn_api(full_registry().await).await;

        let response = reqwest::Client::new()
            .post(format!("{}/analyze", base))
            .json(&json!({"analysis_type": "risk"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("customer_oid"));
    }

    #[tokio::test]
    async fn test_query_requires_query_text() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/query", base))
            .json(&json!({"agent_type": "risk_analyst"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["error"], "Query is required");
    }

    #[tokio::test]
    async fn test_query_answers() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/query", base))
            .json(&json!({"agent_type": "portfolio_manager", "query": "Rebalance?"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["response"], "OK");
    }

    #[tokio::test]
    async fn test_call_with_unknown_tool() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/call", base))
            .json(&json!({"tool_name": "made_up_tool"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("No agent available for tool"));
    }

    #[tokio::test]
    async fn test_call_routes_and_answers() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/call", base))
            .json(&json!({"tool_name": "stress_test", "customer_oid": "CUST1"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["result"], "OK");
    }

    #[tokio::test]
    async fn test_customer_record_shape() {
        let base = spawn_api(full_registry().await).await;

        let body: Value = reqwest::get(format!("{}/customer/CUST1", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["customer_oid"], "CUST1");
        for key in ["profile", "portfolio", "accounts", "transactions", "risk_metrics"] {
            assert!(body.get(key).is_some(), "missing key {}", key);
        }
    }
}
