use crate::core::engine::BundleEngine;
use crate::core::glob::GlobPattern;
use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Rebuilds the bundle whenever a file matching the watch pattern changes.
pub struct AssetWatcher<S: Storage> {
    engine: BundleEngine<S>,
    root: PathBuf,
    pattern: GlobPattern,
    build_dir: String,
    debounce: Duration,
}

impl<S: Storage> AssetWatcher<S> {
    pub fn new(engine: BundleEngine<S>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root)
            .map_err(|e| BundleError::file_operation(root.display().to_string(), e))?;

        let config = engine.config();
        let pattern = GlobPattern::new(&config.watch.pattern, false)?;
        let build_dir = config.output.build_dir.trim_end_matches('/').to_string();
        let debounce = Duration::from_millis(config.watch.debounce_ms);

        Ok(Self {
            engine,
            root,
            pattern,
            build_dir,
            debounce,
        })
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                _ => return None,
            }
        }
        Some(parts.join("/"))
    }

    fn is_relevant_path(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        let in_build_dir = rel == self.build_dir
            || rel
                .strip_prefix(self.build_dir.as_str())
                .is_some_and(|rest| rest.starts_with('/'));

        !in_build_dir && self.pattern.matches(&rel)
    }

    /// Content changes to watched sources; access events and build output are ignored.
    pub fn is_relevant(&self, event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) && event.paths.iter().any(|p| self.is_relevant_path(p))
    }

    fn watch_dir(&self) -> PathBuf {
        let base = self.root.join(self.pattern.base());
        if base.is_dir() {
            base
        } else {
            self.root.clone()
        }
    }

    /// Watches until Ctrl-C.
    pub async fn run(&self) -> Result<usize> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Watches until `shutdown` resolves and returns how many rebuilds ran.
    /// A failed rebuild is logged and watching continues.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> Result<usize> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let watch_dir = self.watch_dir();
        watcher.watch(&watch_dir, RecursiveMode::Recursive)?;
        tracing::info!(
            "Watching {} for {} (debounce {:?})",
            watch_dir.display(),
            self.pattern.as_str(),
            self.debounce
        );

        tokio::pin!(shutdown);
        let mut rebuilds = 0usize;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping watcher");
                    break;
                }
                received = rx.recv() => {
                    let Some(res) = received else { break };
                    match res {
                        Ok(event) if self.is_relevant(&event) => {
                            tracing::debug!("Change detected: {:?} {:?}", event.kind, event.paths);
                            self.settle(&mut rx).await;
                            self.rebuild().await;
                            rebuilds += 1;
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Watch error: {}", e),
                    }
                }
            }
        }

        Ok(rebuilds)
    }

    // Drain the burst of events one save usually produces.
    async fn settle(&self, rx: &mut UnboundedReceiver<notify::Result<Event>>) {
        loop {
            match tokio::time::timeout(self.debounce, rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    }

    async fn rebuild(&self) {
        match self.engine.build().await {
            Ok(report) => tracing::info!(
                "Rebuilt {} ({} files) in {:?}",
                report.archive.path,
                report.total_files(),
                report.duration
            ),
            Err(e) => {
                tracing::error!("Rebuild failed: {}", e);
                tracing::error!("Suggestion: {}", e.recovery_suggestion());
            }
        }
    }
}
