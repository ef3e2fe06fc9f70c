//! Tool Registry - immutable snapshots of the available tools.
//!
//! This module provides:
//! - [`Tool`]: one callable plus the metadata clients see
//! - [`ToolRegistry`]: an immutable name→tool map for one point in time
//! - [`RegistryHandle`]: the single register through which snapshots are
//!   published and read
//!
//! A snapshot is never mutated once built. Reloading builds a new one and
//! swaps it in with one replace on the handle, so readers always observe a
//! complete tool set. A reader that took a snapshot keeps it alive (and every
//! tool in it) until it drops its `Arc`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::handlers::ToolHandler;

// ============================================================================
// Tool metadata
// ============================================================================

fn default_required() -> bool {
    true
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,

    /// Declared type name. Catalog metadata only; not enforced on the wire.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_required")]
    pub required: bool,
}

impl ToolParam {
    /// A required parameter with the given name and type.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: None,
            required: true,
        }
    }
}

/// Catalog entry describing a tool to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub args_list: Vec<ToolParam>,
}

/// Where a tool was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Compiled into the server.
    Builtin,
    /// Declared by a manifest on disk.
    Manifest(PathBuf),
}

impl std::fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => f.write_str("<builtin>"),
            Self::Manifest(path) => write!(f, "{}", path.display()),
        }
    }
}

// ============================================================================
// Tool
// ============================================================================

/// A named, remotely callable unit.
pub struct Tool {
    name: String,
    description: String,
    params: Vec<ToolParam>,
    needs_registry: bool,
    handler: Arc<dyn ToolHandler>,
    origin: ToolOrigin,
}

impl Tool {
    /// Parameter name that asks for the live registry to be injected.
    pub const REGISTRY_PARAM: &'static str = "tool_registry";

    /// Build a tool from its declared parameters.
    ///
    /// A parameter named [`Tool::REGISTRY_PARAM`] is not part of the public
    /// signature: it is removed from the parameter list and turns on
    /// registry injection instead.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        declared: Vec<ToolParam>,
        handler: Arc<dyn ToolHandler>,
        origin: ToolOrigin,
    ) -> Self {
        let needs_registry = declared.iter().any(|p| p.name == Self::REGISTRY_PARAM);
        let params = declared
            .into_iter()
            .filter(|p| p.name != Self::REGISTRY_PARAM)
            .collect();

        Self {
            name: name.into(),
            description: description.into(),
            params,
            needs_registry,
            handler,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Public parameters, in declaration order.
    pub fn params(&self) -> &[ToolParam] {
        &self.params
    }

    /// Whether the executor must inject the registry snapshot.
    pub fn needs_registry(&self) -> bool {
        self.needs_registry
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    pub fn origin(&self) -> &ToolOrigin {
        &self.origin
    }

    /// The catalog entry for this tool.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            args_list: self.params.clone(),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("needs_registry", &self.needs_registry)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tool Registry
// ============================================================================

/// Immutable name→tool snapshot.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<Tool>>,
    version: u64,
    loaded_at: DateTime<Utc>,
}

impl ToolRegistry {
    /// Start building a new snapshot.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A snapshot with no tools.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Catalog entries for every tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Publish counter; 0 until the snapshot goes through a [`RegistryHandle`].
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Accumulates tools for a new snapshot.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tools: BTreeMap<String, Arc<Tool>>,
}

impl RegistryBuilder {
    /// Add a tool, replacing any earlier tool of the same name.
    ///
    /// Returns the replaced tool so callers can report the shadowing.
    pub fn insert(&mut self, tool: Tool) -> Option<Arc<Tool>> {
        self.tools.insert(tool.name.clone(), Arc::new(tool))
    }

    /// Chaining form of [`RegistryBuilder::insert`].
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.insert(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Freeze the accumulated tools into a snapshot.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: self.tools,
            version: 0,
            loaded_at: Utc::now(),
        }
    }
}

// ============================================================================
// Registry Handle
// ============================================================================

/// The one shared register holding the current snapshot.
///
/// Readers call [`RegistryHandle::current`] and never wait on a reload;
/// the loader calls [`RegistryHandle::publish`] once per successful scan.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: Arc<watch::Sender<Arc<ToolRegistry>>>,
}

impl RegistryHandle {
    /// Create a handle and publish `initial` as version 1.
    pub fn new(mut initial: ToolRegistry) -> Self {
        initial.version = 1;
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// The snapshot that is current right now.
    pub fn current(&self) -> Arc<ToolRegistry> {
        self.tx.borrow().clone()
    }

    /// Atomically replace the current snapshot. Returns the new version.
    pub fn publish(&self, mut registry: ToolRegistry) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|current| {
            registry.version = current.version + 1;
            version = registry.version;
            *current = Arc::new(registry);
        });
        version
    }

    /// Receive a notification every time a snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ToolRegistry>> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("RegistryHandle")
            .field("version", &current.version())
            .field("tools", &current.len())
            .finish()
    }
}
