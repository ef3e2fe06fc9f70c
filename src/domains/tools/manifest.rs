//! Tool manifest types.
//!
//! A manifest is a `*.tool.json` file declaring one or more tools. Each tool
//! binds either to a compiled-in handler (`handler`) or to an external
//! program (`command`).

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::registry::ToolParam;

/// File name suffix that marks a tool manifest.
pub const MANIFEST_SUFFIX: &str = ".tool.json";

/// Whether `path` names a tool manifest.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(MANIFEST_SUFFIX) && !n.starts_with('.'))
        .unwrap_or(false)
}

/// Contents of one manifest file.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

/// One tool declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub params: Vec<ParamSpec>,

    /// Key into the handler catalog.
    #[serde(default)]
    pub handler: Option<String>,

    /// Program and arguments to run per call.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Per-call limit for command tools, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// One parameter declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type", default = "default_param_type")]
    pub kind: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_param_type() -> String {
    "any".to_string()
}

fn default_required() -> bool {
    true
}

/// How a validated tool declaration is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Handler(String),
    Command(Vec<String>),
}

impl ToolSpec {
    /// Check the declaration and work out its binding.
    pub fn validate(&self) -> Result<Binding, String> {
        if self.name.trim().is_empty() {
            return Err("tool name must not be empty".into());
        }

        let documented = self
            .description
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        if !documented {
            return Err(format!("tool '{}' must have a description", self.name));
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(format!("tool '{}' has a parameter with no name", self.name));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, param.name
                ));
            }
        }

        match (&self.handler, &self.command) {
            (Some(key), None) => Ok(Binding::Handler(key.clone())),
            (None, Some(argv)) if argv.is_empty() || argv[0].trim().is_empty() => {
                Err(format!("tool '{}' has an empty command", self.name))
            }
            (None, Some(argv)) => Ok(Binding::Command(argv.clone())),
            (Some(_), Some(_)) => Err(format!(
                "tool '{}' must set either 'handler' or 'command', not both",
                self.name
            )),
            (None, None) => Err(format!(
                "tool '{}' must set 'handler' or 'command'",
                self.name
            )),
        }
    }

    /// Declared parameters as registry metadata.
    pub fn tool_params(&self) -> Vec<ToolParam> {
        self.params
            .iter()
            .map(|p| ToolParam {
                name: p.name.clone(),
                kind: p.kind.clone(),
                description: p.description.clone(),
                required: p.required,
            })
            .collect()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().map(str::trim).unwrap_or_default()
    }
}
