//! Startup wiring: configuration from the environment, remote discovery,
//! registry, orchestrator.
//!
//! ```ignore
//! parley_core::observability::init_tracing();
//! let prompt = PromptTemplate::from_file(Path::new("resources/system_prompt.txt"))?;
//! let orchestrator = bootstrap::from_env(prompt, my_tools::descriptors()?).await?;
//! // per inbound message:
//! orchestrator.respond(&platform, &message).await?;
//! ```

use std::sync::Arc;

use anyhow::{Context as _, Result};
use parley_core::config::{
    LlmConfig, OrchestratorConfig, RemoteHostsConfig, ResponseConfig, ToolsConfig,
};

use crate::builtin;
use crate::llm::OpenAiClient;
use crate::orchestrator::Orchestrator;
use crate::registry::{FunctionDescriptor, Registry};
use crate::tools;
use crate::remote::{self, McpConnector, RemoteConnector};
use crate::transcript::{PromptTemplate, TranscriptBuilder};

/// Built-in tools, then `local`, then every tool discovered on `hosts`.
/// Any name collision fails.
pub async fn build_registry(
    connector: &dyn RemoteConnector,
    hosts: &RemoteHostsConfig,
    local: Vec<FunctionDescriptor>,
) -> Result<Registry> {
    let discovered = remote::discover(connector, hosts).await;
    let registry = Registry::builder()
        .register(builtin::descriptors()?)
        .register(local)
        .register_remote(discovered)
        .build()?;
    Ok(registry)
}

/// Assemble an orchestrator from `PARLEY_*` / `OPENAI_*` / `MCP_*` settings.
/// Web tools whose credentials are set are registered ahead of `local`.
pub async fn from_env(
    prompt: PromptTemplate,
    local: Vec<FunctionDescriptor>,
) -> Result<Orchestrator> {
    let llm = LlmConfig::try_from_env().context("LLM provider is not configured")?;
    tracing::info!(kind = ?llm.kind, model = %llm.model, stream = llm.stream, "LLM provider configured");
    let provider = OpenAiClient::new(llm)?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .context("building the tool HTTP client")?;
    let mut configured = tools::descriptors(&ToolsConfig::from_env(), &http)?;
    configured.extend(local);

    let hosts = Arc::new(RemoteHostsConfig::from_env()?);
    let connector = Arc::new(McpConnector::new());
    let registry = build_registry(connector.as_ref(), &hosts, configured).await?;
    tracing::info!(tools = registry.tool_definitions().len(), hosts = hosts.hosts.len(), "registry ready");

    Ok(Orchestrator::new(
        Arc::new(provider),
        Arc::new(registry),
        TranscriptBuilder::new(prompt),
    )
    .with_remote(connector, hosts)
    .with_response_config(ResponseConfig::from_env()?)
    .with_config(OrchestratorConfig::from_env()?))
}
