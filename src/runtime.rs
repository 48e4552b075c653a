//! Ollama model runtime client
//!
//! The runtime is treated as a black-box text-completion service with
//! two calls: list available models and generate a completion. The
//! `ModelRuntime` trait is the seam that lets the registry and the
//! pipeline run against a stub in tests.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::ServiceError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// One installed model as reported by the runtime
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Generation parameters forwarded per call
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Black-box text-completion runtime
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String>;
}

/// Reusable Ollama client (connection-pooled)
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelRuntime for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Runtime(format!("model list request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Runtime(format!(
                "model list returned HTTP {}: {}",
                status, body
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Runtime(format!("model list parse error: {}", e)))?;

        Ok(tags.models)
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: WireOptions {
                temperature: options.temperature,
                num_predict: options.num_predict,
            },
        };

        info!(model, "Calling Ollama generate");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Runtime(format!("generate request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Runtime(format!(
                "generate returned HTTP {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Runtime(format!("generate parse error: {}", e)))?;

        Ok(generated.response)
    }
}

//
// Wire types, private to this module
//

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: WireOptions,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest {
            model: "llama3.2:3b",
            prompt: "What is portfolio diversification?",
            stream: false,
            options: WireOptions {
                temperature: 0.7,
                num_predict: 2048,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.2:3b");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 2048);
    }

    #[tokio::test]
    async fn test_list_and_generate_against_stub() {
        let app = Router::new()
            .route(
                "/api/tags",
                get(|| async {
                    Json(json!({"models": [
                        {"name": "llama3.2:3b", "size": 2019393189u64},
                        {"name": "gemma3:4b"}
                    ]}))
                }),
            )
            .route(
                "/api/generate",
                post(|Json(body): Json<serde_json::Value>| async move {
                    Json(json!({"response": format!("echo:{}", body["model"].as_str().unwrap())}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = OllamaClient::new(&format!("http://{}", addr), 2).unwrap();

        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3.2:3b");
        assert_eq!(models[1].size, None);

        let options = GenerateOptions {
            temperature: 0.7,
            num_predict: 64,
        };
        let text = client.generate("llama3.2:3b", "hi", options).await.unwrap();
        assert_eq!(text, "echo:llama3.2:3b");
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_a_runtime_error() {
        // Port 9 (discard) is unassigned locally; connection fails fast.
        let client = OllamaClient::new("http://127.0.0.1:9", 1).unwrap();
        let result = client.list_models().await;
        assert!(matches!(result, Err(ServiceError::Runtime(_))));
    }
}
