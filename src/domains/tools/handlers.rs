//! Tool handlers module.
//!
//! A handler is the callable half of a [`Tool`](super::Tool): it receives the
//! call's arguments (and, when the tool asks for it, the registry snapshot)
//! and produces a JSON result. Manifests refer to compiled-in handlers by key
//! through the [`HandlerCatalog`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::definitions::{AddHandler, EchoHandler, ListToolsHandler, PingHandler};
use super::error::ToolError;
use super::registry::ToolRegistry;

// ============================================================================
// Tool call
// ============================================================================

/// Input handed to a handler for one invocation.
///
/// Each call owns its arguments; nothing is shared between calls.
#[derive(Debug, Clone, Default)]
pub struct ToolCall {
    /// Client-supplied keyword arguments.
    pub args: Map<String, Value>,

    /// The snapshot the call was routed against. Set only for tools that
    /// declare the registry parameter.
    pub registry: Option<Arc<ToolRegistry>>,
}

impl ToolCall {
    pub fn new(args: Map<String, Value>) -> Self {
        Self {
            args,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Deserialize the arguments into a typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.args.clone()))
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))
    }

    /// The injected registry snapshot.
    pub fn registry(&self) -> Result<&ToolRegistry, ToolError> {
        self.registry
            .as_deref()
            .ok_or_else(|| ToolError::internal("tool registry was not injected"))
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// Trait implemented by every tool callable.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool.
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError> {
        (self.f)(call).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

// ============================================================================
// Handler catalog
// ============================================================================

/// Compiled-in handlers that manifests can bind to by key.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl HandlerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog containing every handler shipped with the server.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(PingHandler::KEY, Arc::new(PingHandler));
        catalog.register(ListToolsHandler::KEY, Arc::new(ListToolsHandler));
        catalog.register(AddHandler::KEY, Arc::new(AddHandler));
        catalog.register(EchoHandler::KEY, Arc::new(EchoHandler));
        catalog
    }

    /// Register a handler under `key`, returning any handler it replaced.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.insert(key.into(), handler)
    }

    /// Chaining form of [`HandlerCatalog::register`].
    pub fn with(mut self, key: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        self.register(key, handler);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(key).cloned()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("keys", &self.keys())
            .finish()
    }
}
