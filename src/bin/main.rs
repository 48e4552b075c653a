use openbanking_agents::{
    api::start_server,
    bank::BankApiClient,
    config::Config,
    pipeline::Pipeline,
    registry::AgentRegistry,
    runtime::OllamaClient,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    info!("OpenBanking Agent Server");
    info!("Port: {}", config.port);
    info!("Bank API: {}", config.bank_api.base_url);
    info!("Ollama: {}", config.ollama.base_url);

    // Create upstream clients
    let bank = Arc::new(BankApiClient::new(&config.bank_api)?);
    let runtime = Arc::new(OllamaClient::new(
        &config.ollama.base_url,
        config.ollama.timeout_secs,
    )?);

    // Probe models and build the registry. An unreachable runtime is
    // not fatal: the server starts with zero agents and /status keeps
    // answering.
    let registry = match AgentRegistry::initialize(&config.agents, runtime).await {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Agent registry initialization failed (Ollama not available?): {}", e);
            AgentRegistry::empty()
        }
    };

    if registry.is_empty() {
        warn!("No agents registered; queries will report no agent available");
    } else {
        info!("Registered {} agents", registry.len());
    }

    let pipeline = Arc::new(Pipeline::new(Arc::new(registry), bank));

    info!("Starting API server...");
    start_server(pipeline, config.port).await?;

    Ok(())
}
