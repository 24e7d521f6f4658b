//! Parley agent: turns one inbound chat message into one streamed, tool-assisted reply.
//!
//! - `orchestrator`: the request → collect → dispatch loop against the model provider
//! - `context`: per-reply state, throttled rendering, final render
//! - `schema`: JSON-schema derivation for local tool parameters
//! - `registry`: immutable name → tool table (local and remote)
//! - `remote`: remote tool discovery, HTTP transport and per-reply sessions
//! - `llm`: chat completions provider (OpenAI / Azure, streaming or not)
//! - `transcript`: system prompt templating and history formatting
//! - `builtin`: tools that act on the reply itself (embeds, status, attachments)
//! - `tools`: web search and image generation, enabled by credentials
//! - `bootstrap`: startup wiring from the environment

pub mod accumulator;
pub mod bootstrap;
pub mod builtin;
pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod platform;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod tools;
pub mod transcript;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ResponseContext;
pub use error::{OrchestratorError, PlatformError, ProviderError, RemoteError};
pub use orchestrator::{Orchestrator, RunSummary};
pub use registry::{FunctionDescriptor, Registry, RegistryBuilder, RemoteToolDescriptor};
pub use schema::{Param, ParamType, SchemaError};
pub use transcript::{PromptTemplate, TranscriptBuilder};
