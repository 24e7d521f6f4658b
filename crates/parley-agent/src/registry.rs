//! Registry: one immutable name → tool table shared by every reply.
//!
//! Tool sources are registered at startup. Pattern:
//! ```ignore
//! let registry = Registry::builder()
//!     .register(builtin::descriptors()?)
//!     .register(my_module::descriptors()?)
//!     .register_remote(remote::discover(&connector, &hosts).await)
//!     .build()?;
//! ```
//! Any name registered twice, from whatever source, fails `build()`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use parley_core::ConfigError;
use serde_json::Value;

use crate::context::ResponseContext;
use crate::platform::{Attachment, Author};
use crate::schema::{self, CompiledSchema, Param, SchemaError};
use crate::types::ToolDefinition;

// ─── Handlers ───────────────────────────────────────────────────────────────

/// A handler that runs on the reply task and may mutate the reply.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &mut ResponseContext, args: Value) -> Result<Value>;
}

/// Input of a blocking handler. It runs on the blocking pool, so it gets a
/// snapshot of the reply plus [`ReplyEffects`] to change it.
#[derive(Debug, Clone)]
pub struct BlockingCall {
    pub author: Author,
    pub args: Value,
    /// `additional_data` as it was when the call started.
    pub additional_data: HashMap<String, Value>,
    pub effects: ReplyEffects,
}

/// Reply changes recorded by a blocking handler, applied to the
/// [`ResponseContext`] once the handler returns (or fails).
#[derive(Debug, Clone, Default)]
pub struct ReplyEffects {
    pending: Arc<Mutex<PendingEffects>>,
}

#[derive(Debug, Default)]
struct PendingEffects {
    attachments: Vec<Attachment>,
    data: Vec<(String, Value)>,
}

impl ReplyEffects {
    fn lock(&self) -> MutexGuard<'_, PendingEffects> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_attachment(&self, attachment: Attachment) {
        self.lock().attachments.push(attachment);
    }

    pub fn set_data(&self, key: &str, value: Value) {
        self.lock().data.push((key.to_string(), value));
    }

    pub(crate) fn apply(&self, ctx: &mut ResponseContext) {
        let pending = std::mem::take(&mut *self.lock());
        for attachment in pending.attachments {
            ctx.add_attachment(attachment);
        }
        ctx.additional_data.extend(pending.data);
    }
}

pub type BlockingFn = dyn Fn(BlockingCall) -> Result<Value> + Send + Sync;

#[derive(Clone)]
pub enum Handler {
    Async(Arc<dyn ToolHandler>),
    Blocking(Arc<BlockingFn>),
}

impl Handler {
    pub fn from_async(handler: impl ToolHandler + 'static) -> Self {
        Handler::Async(Arc::new(handler))
    }

    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(BlockingCall) -> Result<Value> + Send + Sync + 'static,
    {
        Handler::Blocking(Arc::new(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Async(_) => f.write_str("Handler::Async"),
            Handler::Blocking(_) => f.write_str("Handler::Blocking"),
        }
    }
}

// ─── Descriptors ────────────────────────────────────────────────────────────

/// A local tool: schema derived from its parameter list plus a handler.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub schema: CompiledSchema,
    pub handler: Handler,
}

impl FunctionDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        params: &[Param],
        handler: Handler,
    ) -> Result<Self, SchemaError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(SchemaError::MissingDescription(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            schema: schema::compile(params)?,
            handler,
        })
    }

    /// Inject a parameter description after compilation.
    #[must_use]
    pub fn describe(mut self, param: &str, description: &str) -> Self {
        if !self.schema.set_description(param, description) {
            tracing::warn!(tool = %self.name, param, "description for unknown parameter ignored");
        }
        self
    }

    pub fn is_async(&self) -> bool {
        matches!(self.handler, Handler::Async(_))
    }

    pub fn tool_definition(&self) -> ToolDefinition {
        schema::function_schema(&self.name, &self.description, &self.schema)
    }
}

/// A tool offered by a remote host, discovered at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteToolDescriptor {
    pub name: String,
    pub host: String,
    pub description: String,
    pub input_schema: Value,
}

impl RemoteToolDescriptor {
    /// The `$schema` key is dropped; providers reject it in tool parameters.
    pub fn new(name: &str, host: &str, description: &str, mut input_schema: Value) -> Self {
        if let Some(obj) = input_schema.as_object_mut() {
            obj.remove("$schema");
        }
        if input_schema.is_null() {
            input_schema = serde_json::json!({"type": "object", "properties": {}});
        }
        Self {
            name: name.to_string(),
            host: host.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    pub fn tool_definition(&self) -> ToolDefinition {
        ToolDefinition::function(&self.name, &self.description, self.input_schema.clone())
    }
}

#[derive(Debug, Clone)]
pub enum ToolEntry {
    Local(FunctionDescriptor),
    Remote(RemoteToolDescriptor),
}

impl ToolEntry {
    pub fn name(&self) -> &str {
        match self {
            ToolEntry::Local(d) => &d.name,
            ToolEntry::Remote(d) => &d.name,
        }
    }

    fn source(&self) -> String {
        match self {
            ToolEntry::Local(_) => "local registration".to_string(),
            ToolEntry::Remote(d) => format!("remote host '{}'", d.host),
        }
    }

    fn tool_definition(&self) -> ToolDefinition {
        match self {
            ToolEntry::Local(d) => d.tool_definition(),
            ToolEntry::Remote(d) => d.tool_definition(),
        }
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Registry {
    entries: HashMap<String, ToolEntry>,
    /// Registration order; the model sees tools in this order.
    definitions: Vec<ToolDefinition>,
}

/// Builder for [`Registry`] with explicit registration.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<ToolEntry>,
}

impl RegistryBuilder {
    /// Register local tools. Add one line per tool module.
    #[must_use]
    pub fn register(mut self, descs: impl IntoIterator<Item = FunctionDescriptor>) -> Self {
        self.entries.extend(descs.into_iter().map(ToolEntry::Local));
        self
    }

    /// Register tools discovered on remote hosts.
    #[must_use]
    pub fn register_remote(mut self, descs: impl IntoIterator<Item = RemoteToolDescriptor>) -> Self {
        self.entries.extend(descs.into_iter().map(ToolEntry::Remote));
        self
    }

    pub fn build(self) -> Result<Registry, ConfigError> {
        let mut entries: HashMap<String, ToolEntry> = HashMap::with_capacity(self.entries.len());
        let mut definitions = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            if let Some(existing) = entries.get(entry.name()) {
                return Err(ConfigError::DuplicateTool {
                    name: entry.name().to_string(),
                    existing: existing.source(),
                    incoming: entry.source(),
                });
            }
            definitions.push(entry.tool_definition());
            entries.insert(entry.name().to_string(), entry);
        }
        tracing::info!(tools = definitions.len(), "tool registry built");
        Ok(Registry {
            entries,
            definitions,
        })
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    /// Schemas of every registered tool, in registration order.
    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;
    use serde_json::json;

    fn echo(name: &str) -> FunctionDescriptor {
        FunctionDescriptor::new(
            name,
            "Echo the arguments back.",
            &[Param::new("text", ParamType::string())],
            Handler::blocking(|call| Ok(call.args)),
        )
        .unwrap()
    }

    #[test]
    fn builds_in_registration_order() {
        let registry = Registry::builder()
            .register([echo("b"), echo("a")])
            .register_remote([RemoteToolDescriptor::new("c", "search", "Remote", json!({}))])
            .build()
            .unwrap();
        let names: Vec<&str> = registry.tool_definitions().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(matches!(registry.get("c"), Some(ToolEntry::Remote(_))));
        assert!(registry.get("zzz").is_none());
    }

    #[test]
    fn duplicate_local_names_fail() {
        let err = Registry::builder()
            .register([echo("a")])
            .register([echo("a")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTool { ref name, .. } if name == "a"));
    }

    #[test]
    fn remote_colliding_with_local_fails() {
        let err = Registry::builder()
            .register([echo("search")])
            .register_remote([RemoteToolDescriptor::new("search", "web", "", json!({}))])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateTool {
                name: "search".into(),
                existing: "local registration".into(),
                incoming: "remote host 'web'".into(),
            }
        );
    }

    #[test]
    fn remote_schema_is_stripped() {
        let desc = RemoteToolDescriptor::new(
            "fetch",
            "web",
            "Fetch a URL",
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "properties": {"url": {"type": "string"}}
            }),
        );
        assert_eq!(
            desc.tool_definition().function.parameters,
            json!({"type": "object", "properties": {"url": {"type": "string"}}})
        );
    }

    #[test]
    fn missing_description_rejected() {
        let err = FunctionDescriptor::new("x", "  ", &[], Handler::blocking(|_| Ok(Value::Null)))
            .unwrap_err();
        assert_eq!(err, SchemaError::MissingDescription("x".into()));
    }

    #[test]
    fn describe_injects_after_compile() {
        let desc = echo("a").describe("text", "what to echo");
        assert_eq!(
            desc.tool_definition().function.parameters["properties"]["text"]["description"],
            json!("what to echo")
        );
        assert!(!desc.is_async());
    }
}
