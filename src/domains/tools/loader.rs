//! Tool Loader - builds registry snapshots from tool repositories.
//!
//! A scan walks every configured root for `*.tool.json` manifests, binds each
//! declared tool to its callable, and finally adds the built-in tools from
//! the core manifest.
//!
//! ## Scan order
//!
//! 1. Roots, in the order they were configured.
//! 2. Within a root, a depth-first walk with directory entries sorted by
//!    file name. Hidden files and directories are skipped.
//! 3. Within a manifest, declaration order.
//! 4. The core manifest, last.
//!
//! When two declarations share a name, the one discovered last wins and the
//! shadowing is logged. Because the core manifest comes last, `ping` and
//! `list_tools_available` cannot be replaced by a user tool.
//!
//! A scan is all-or-nothing: any unreadable or invalid manifest fails it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use tracing::{debug, info, instrument, warn};

use super::command::CommandHandler;
use super::definitions::{CORE_MANIFEST, CORE_MANIFEST_PATH};
use super::error::LoadError;
use super::handlers::{HandlerCatalog, ToolHandler};
use super::manifest::{Binding, ToolManifest, is_manifest};
use super::registry::{RegistryBuilder, Tool, ToolOrigin, ToolRegistry};

/// Discovers tools in a set of repository roots.
#[derive(Debug, Clone)]
pub struct ToolLoader {
    roots: Vec<PathBuf>,
    catalog: Arc<HandlerCatalog>,
}

impl ToolLoader {
    /// Create a loader for the given roots and handler catalog.
    pub fn new<I, P>(roots: I, catalog: HandlerCatalog) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            catalog: Arc::new(catalog),
        }
    }

    /// Configured repository roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Scan every root and build a fresh snapshot.
    ///
    /// Roots that do not exist are skipped with a warning. Blocking; run it
    /// on a blocking thread from async code.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<ToolRegistry, LoadError> {
        let mut builder = ToolRegistry::builder();

        for root in &self.roots {
            if !root.is_dir() {
                warn!("Tool repository not found: {}", root.display());
                continue;
            }
            for path in Self::manifests_in(root)? {
                self.load_manifest_file(&path, &mut builder)?;
            }
        }

        let core: ToolManifest = serde_json::from_str(CORE_MANIFEST)
            .map_err(|e| LoadError::parse(CORE_MANIFEST_PATH, e))?;
        self.register(core, Path::new(CORE_MANIFEST_PATH), ToolOrigin::Builtin, &mut builder)?;

        let registry = builder.build();
        info!("Registry build complete: {} tools loaded", registry.len());
        Ok(registry)
    }

    /// Manifest paths under `root`, in scan order.
    fn manifests_in(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && is_manifest(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn load_manifest_file(&self, path: &Path, builder: &mut RegistryBuilder) -> Result<(), LoadError> {
        debug!("Loading manifest {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let manifest: ToolManifest =
            serde_json::from_str(&raw).map_err(|e| LoadError::parse(path, e))?;

        self.register(manifest, path, ToolOrigin::Manifest(path.to_path_buf()), builder)
    }

    fn register(
        &self,
        manifest: ToolManifest,
        path: &Path,
        origin: ToolOrigin,
        builder: &mut RegistryBuilder,
    ) -> Result<(), LoadError> {
        let manifest_dir = path.parent().unwrap_or_else(|| Path::new("."));

        for spec in manifest.tools {
            let binding = spec.validate().map_err(|reason| LoadError::invalid(path, reason))?;

            let handler: Arc<dyn ToolHandler> = match binding {
                Binding::Handler(key) => self.catalog.get(&key).ok_or_else(|| {
                    LoadError::invalid(
                        path,
                        format!("tool '{}' refers to unknown handler '{}'", spec.name, key),
                    )
                })?,
                Binding::Command(argv) => {
                    Arc::new(CommandHandler::new(&argv, manifest_dir, spec.timeout_ms))
                }
            };

            let tool = Tool::new(
                spec.name.trim(),
                spec.description(),
                spec.tool_params(),
                handler,
                origin.clone(),
            );

            debug!("Discovered tool '{}' in {}", tool.name(), origin);
            let name = tool.name().to_string();
            if let Some(previous) = builder.insert(tool) {
                warn!(
                    "Tool '{}' from {} shadows the one from {}",
                    name,
                    origin,
                    previous.origin()
                );
            }
        }

        Ok(())
    }
}
