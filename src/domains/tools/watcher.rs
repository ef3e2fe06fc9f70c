//! Tool Watcher - hot reload of the registry.
//!
//! The OS watcher forwards create/modify/remove events on manifests to a
//! single background task. That task waits until events stop arriving for
//! the debounce interval, rescans every root from scratch and publishes the
//! result. A failed rescan is logged and the current snapshot stays.

use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::LoadError;
use super::loader::ToolLoader;
use super::manifest::is_manifest;
use super::registry::RegistryHandle;

/// Default quiet period before a burst of changes triggers a rescan.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Handle for a running watcher.
///
/// Dropping it stops the OS watch; [`WatcherHandle::stop`] also waits for
/// the reload task to finish.
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    watcher: RecommendedWatcher,
}

impl WatcherHandle {
    /// Stop watching and wait for the reload task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        drop(self.watcher);
        if let Err(e) = self.task.await {
            warn!("Watcher task ended abnormally: {}", e);
        }
        info!("Tool watcher stopped");
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

/// Whether a filesystem event can change the result of a scan.
fn is_relevant(event: &Event) -> bool {
    match event.kind {
        // Removing or renaming a directory never names the manifests inside it.
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => true,
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .any(|p| is_manifest(p) || p.is_dir()),
        _ => false,
    }
}

/// Start watching every existing root of `loader`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_watcher(
    loader: ToolLoader,
    registry: RegistryHandle,
    debounce: Duration,
) -> Result<WatcherHandle, LoadError> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event) {
                debug!("Tool repository change: {:?} {:?}", event.kind, event.paths);
                let _ = event_tx.send(());
            }
        }
        Err(e) => error!("Tool watcher error: {}", e),
    })?;

    for root in loader.roots() {
        if root.is_dir() {
            watcher.watch(root, RecursiveMode::Recursive)?;
            info!("Watching tool repository {}", root.display());
        } else {
            warn!("Not watching missing tool repository {}", root.display());
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(reload_loop(loader, registry, debounce, event_rx, shutdown_rx));

    Ok(WatcherHandle {
        shutdown: shutdown_tx,
        task,
        watcher,
    })
}

async fn reload_loop(
    loader: ToolLoader,
    registry: RegistryHandle,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        // Idle until the first change of a burst.
        tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            event = events.recv() => {
                if event.is_none() {
                    return;
                }
            }
        }

        // Trailing edge: every further event restarts the quiet period.
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        reload(&loader, &registry).await;
    }
}

/// Rescan all roots and publish the result if the scan succeeds.
pub async fn reload(loader: &ToolLoader, registry: &RegistryHandle) -> Option<u64> {
    let scan = loader.clone();
    match tokio::task::spawn_blocking(move || scan.load()).await {
        Ok(Ok(snapshot)) => {
            let tools = snapshot.len();
            let version = registry.publish(snapshot);
            info!("Published tool registry v{} ({} tools)", version, tools);
            Some(version)
        }
        Ok(Err(e)) => {
            error!(
                "Reload failed, keeping registry v{}: {}",
                registry.current().version(),
                e
            );
            None
        }
        Err(e) => {
            error!("Reload task failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::handlers::HandlerCatalog;
    use crate::domains::tools::registry::ToolRegistry;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const DEBOUNCE: Duration = Duration::from_millis(100);
    const WAIT: Duration = Duration::from_secs(10);

    fn write_add(dir: &Path, file: &str, name: &str) {
        let manifest = json!({"tools": [{
            "name": name,
            "description": "Add two integers.",
            "params": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
            "handler": "math.add"
        }]});
        fs::write(dir.join(file), manifest.to_string()).unwrap();
    }

    fn setup(dir: &Path) -> (ToolLoader, RegistryHandle) {
        let loader = ToolLoader::new([dir], HandlerCatalog::with_builtins());
        let handle = RegistryHandle::new(loader.load().unwrap());
        (loader, handle)
    }

    /// Wait for a published snapshot matching `pred`.
    async fn wait_for(
        handle: &RegistryHandle,
        pred: impl Fn(&ToolRegistry) -> bool,
    ) -> Arc<ToolRegistry> {
        let mut rx = handle.subscribe();
        tokio::time::timeout(WAIT, async {
            loop {
                let current = rx.borrow_and_update().clone();
                if pred(&current) {
                    return current;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("registry did not reach the expected state")
    }

    #[test]
    fn test_is_relevant() {
        let manifest = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path("/repo/a.tool.json".into());
        assert!(is_relevant(&manifest));

        let other = Event::new(EventKind::Modify(ModifyKind::Data(
            notify::event::DataChange::Content,
        )))
        .add_path("/repo/readme.md".into());
        assert!(!is_relevant(&other));

        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::Folder))
            .add_path("/repo/sub".into());
        assert!(is_relevant(&removed));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Read))
            .add_path("/repo/a.tool.json".into());
        assert!(!is_relevant(&access));
    }

    #[tokio::test]
    async fn test_reload_publishes_on_success() {
        let dir = TempDir::new().unwrap();
        let (loader, handle) = setup(dir.path());

        write_add(dir.path(), "add.tool.json", "add");
        assert_eq!(reload(&loader, &handle).await, Some(2));
        assert!(handle.current().contains("add"));
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        write_add(dir.path(), "add.tool.json", "add");
        let (loader, handle) = setup(dir.path());

        fs::write(dir.path().join("broken.tool.json"), "{ not json").unwrap();
        assert_eq!(reload(&loader, &handle).await, None);

        let current = handle.current();
        assert_eq!(current.version(), 1);
        assert!(current.contains("add"));
    }

    #[tokio::test]
    async fn test_hot_add_and_delete() {
        let dir = TempDir::new().unwrap();
        let (loader, handle) = setup(dir.path());
        let watcher = spawn_watcher(loader, handle.clone(), DEBOUNCE).unwrap();

        write_add(dir.path(), "add.tool.json", "add");
        let snapshot = wait_for(&handle, |r| r.contains("add")).await;
        assert!(snapshot.contains("ping"));

        fs::remove_file(dir.path().join("add.tool.json")).unwrap();
        let snapshot = wait_for(&handle, |r| !r.contains("add")).await;
        assert!(snapshot.contains("list_tools_available"));

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_stable_tool_survives_reload() {
        let dir = TempDir::new().unwrap();
        write_add(dir.path(), "stable.tool.json", "stable");
        let (loader, handle) = setup(dir.path());
        let watcher = spawn_watcher(loader, handle.clone(), DEBOUNCE).unwrap();

        let mut rx = handle.subscribe();
        write_add(dir.path(), "other.tool.json", "other");
        tokio::time::sleep(DEBOUNCE * 3).await;
        write_add(dir.path(), "stable.tool.json", "stable");
        write_add(dir.path(), "extra.tool.json", "extra");

        tokio::time::timeout(WAIT, async {
            loop {
                rx.changed().await.unwrap();
                let snapshot = rx.borrow_and_update().clone();
                assert!(
                    snapshot.contains("stable"),
                    "v{} lost the stable tool",
                    snapshot.version()
                );
                if snapshot.contains("extra") {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert!(handle.current().contains("stable"));

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_change_keeps_previous() {
        let dir = TempDir::new().unwrap();
        write_add(dir.path(), "add.tool.json", "add");
        let (loader, handle) = setup(dir.path());
        let watcher = spawn_watcher(loader, handle.clone(), DEBOUNCE).unwrap();

        fs::write(dir.path().join("broken.tool.json"), "{ not json").unwrap();
        tokio::time::sleep(DEBOUNCE * 5).await;
        assert_eq!(handle.current().version(), 1);
        assert!(handle.current().contains("add"));

        // Fixing the file recovers.
        write_add(dir.path(), "broken.tool.json", "fixed");
        let snapshot = wait_for(&handle, |r| r.contains("fixed")).await;
        assert!(snapshot.contains("add"));

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let dir = TempDir::new().unwrap();
        let (loader, handle) = setup(dir.path());
        let watcher = spawn_watcher(loader, handle.clone(), Duration::from_millis(300)).unwrap();

        for i in 0..5 {
            write_add(dir.path(), &format!("t{}.tool.json", i), &format!("t{}", i));
        }
        let snapshot = wait_for(&handle, |r| r.contains("t4")).await;
        assert!((0..5).all(|i| snapshot.contains(&format!("t{}", i))));
        // Far fewer publishes than writes.
        assert!(snapshot.version() <= 3, "version {}", snapshot.version());

        watcher.stop().await;
    }
}
