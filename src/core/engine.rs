use crate::config::BundleConfig;
use crate::core::archive;
use crate::core::task::CopyTask;
use crate::domain::model::{BuildPlan, BuildReport, TaskReport};
use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Runs the build actions: clean, single tasks, the full build and plans.
#[derive(Clone)]
pub struct BundleEngine<S: Storage> {
    storage: S,
    config: Arc<BundleConfig>,
    tasks: Arc<Vec<CopyTask>>,
}

impl<S: Storage> BundleEngine<S> {
    pub fn new(storage: S, config: BundleConfig) -> Result<Self> {
        let tasks = config.copy_tasks()?;
        Ok(Self {
            storage,
            config: Arc::new(config),
            tasks: Arc::new(tasks),
        })
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub async fn clean(&self) -> Result<()> {
        tracing::info!("Cleaning {}", self.config.output.build_dir);
        self.storage.remove_dir_all(&self.config.output.build_dir).await
    }

    /// Runs one task into the staging directory, without clean or packaging.
    pub async fn run_task(&self, name: &str) -> Result<TaskReport> {
        let task = CopyTask::new(self.config.task(name)?.clone())?;
        task.run(&self.storage, &self.config.output.staging_dir).await
    }

    /// clean, then every task concurrently, then the archive. A failing task
    /// stops the build before packaging; the other tasks still run to
    /// completion and the first failure in declaration order is returned.
    pub async fn build(&self) -> Result<BuildReport> {
        let started = Instant::now();

        self.clean().await?;

        let tasks = self.run_all_tasks().await?;

        let archive_path = self.config.archive_path();
        tracing::info!("Packaging {} into {}", self.config.output.staging_dir, archive_path);
        let archive = archive::package(&self.storage, &self.config.output.staging_dir, &archive_path).await?;

        let report = BuildReport {
            tasks,
            archive,
            finished_at: Utc::now(),
            duration: started.elapsed(),
        };

        tracing::info!(
            "Build finished: {} files staged, {} ({} bytes) in {:?}",
            report.total_files(),
            report.archive.path,
            report.archive.bytes,
            report.duration
        );

        Ok(report)
    }

    async fn run_all_tasks(&self) -> Result<Vec<TaskReport>> {
        let mut join_set = JoinSet::new();
        let mut task_ids = HashMap::new();

        for (idx, task) in self.tasks.iter().enumerate() {
            let task = task.clone();
            let storage = self.storage.clone();
            let staging_dir = self.config.output.staging_dir.clone();

            let handle = join_set.spawn(async move { (idx, task.run(&storage, &staging_dir).await) });
            task_ids.insert(handle.id(), idx);
        }

        let mut results: Vec<Option<Result<TaskReport>>> = (0..self.tasks.len()).map(|_| None).collect();

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (idx, result))) => {
                    if let Err(e) = &result {
                        tracing::error!("[{}] failed: {}", self.tasks[idx].name(), e);
                    }
                    results[idx] = Some(result);
                }
                Err(e) => {
                    let Some(&idx) = task_ids.get(&e.id()) else {
                        tracing::error!("Unknown task panicked: {}", e);
                        continue;
                    };
                    let name = self.tasks[idx].name().to_string();
                    tracing::error!("[{}] panicked: {}", name, e);
                    results[idx] = Some(Err(BundleError::TaskPanickedError {
                        task: name,
                        message: e.to_string(),
                    }));
                }
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(idx, result)| {
                result.unwrap_or_else(|| {
                    Err(BundleError::TaskPanickedError {
                        task: self.tasks[idx].name().to_string(),
                        message: "task did not report a result".to_string(),
                    })
                })
            })
            .collect()
    }

    /// Dry run: what clean would remove and where every matched file would go.
    pub async fn plan(&self) -> Result<BuildPlan> {
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for task in self.tasks.iter() {
            tasks.push(task.plan(&self.storage, &self.config.output.staging_dir).await?);
        }

        Ok(BuildPlan {
            clean: self.config.output.build_dir.clone(),
            staging_dir: self.config.output.staging_dir.clone(),
            archive: self.config.archive_path(),
            tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MockStorage;
    use crate::domain::model::AssetTask;

    async fn sample_storage() -> MockStorage {
        MockStorage::with_files(&[
            ("src/css/site.css", "body {\n  color: red;\n}\n"),
            ("src/js/app.js", "console.log('app');\n"),
            ("src/layouts/default.hbs", "<html>{{> header}}</html>"),
            ("src/partials/header.hbs", "<header/>"),
            ("src/helpers/eq.js", "module.exports = (a, b) => a === b;"),
        ])
        .await
    }

    #[tokio::test]
    async fn test_build_stages_every_task_and_packages() {
        let storage = sample_storage().await;
        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();

        let report = engine.build().await.unwrap();

        assert_eq!(report.tasks.len(), 6);
        assert_eq!(report.total_files(), 5);
        assert_eq!(report.tasks[5].task, "images");
        assert_eq!(report.tasks[5].files_copied, 0);
        assert_eq!(report.archive.path, "build/ui-bundle.zip");
        assert_eq!(report.archive.files, 5);

        assert_eq!(
            storage.get_file("build/ui-bundle/css/site.css").await.unwrap(),
            b"body{color:red}"
        );
        assert_eq!(
            storage.get_file("build/ui-bundle/js/app.js").await.unwrap(),
            b"console.log('app');\n"
        );
        assert!(storage.get_file("build/ui-bundle/partials/header.hbs").await.is_some());
        assert!(storage.get_file("build/ui-bundle.zip").await.is_some());
    }

    #[tokio::test]
    async fn test_build_removes_stale_output() {
        let storage = sample_storage().await;
        storage.put("build/ui-bundle/js/removed.js", b"old").await;
        storage.put("build/leftover.txt", b"old").await;

        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();
        engine.build().await.unwrap();

        assert!(storage.get_file("build/ui-bundle/js/removed.js").await.is_none());
        assert!(storage.get_file("build/leftover.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_task_stops_before_packaging() {
        let storage = sample_storage().await;
        storage.put("src/css/broken.css", &[0xff, 0xfe, 0x00]).await;
        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();

        let err = engine.build().await.unwrap_err();
        match err {
            BundleError::TransformError { path, .. } => assert_eq!(path, "src/css/broken.css"),
            other => panic!("unexpected error: {other}"),
        }

        // the other tasks still ran
        assert!(storage.get_file("build/ui-bundle/js/app.js").await.is_some());
        assert!(storage.get_file("build/ui-bundle.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_optional_directories_still_build() {
        let storage = MockStorage::with_files(&[
            ("src/css/site.css", "a{}"),
            ("src/js/app.js", "x"),
            ("src/layouts/default.hbs", "<html/>"),
            ("src/partials/header.hbs", "<header/>"),
        ])
        .await;
        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();

        let report = engine.build().await.unwrap();
        assert_eq!(report.tasks[4].task, "helpers");
        assert_eq!(report.tasks[4].files_copied, 0);
        assert_eq!(report.archive.files, 4);
        assert!(storage.get_file("build/ui-bundle.zip").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_singular_source_fails_the_build() {
        let storage = sample_storage().await;
        let mut config = BundleConfig::default();
        config.tasks.push(AssetTask::new("favicon", "src/img/favicon.ico", "img"));
        let engine = BundleEngine::new(storage.clone(), config).unwrap();

        let err = engine.build().await.unwrap_err();
        assert!(matches!(err, BundleError::EmptyGlobError { task, .. } if task == "favicon"));
        assert!(storage.get_file("build/ui-bundle.zip").await.is_none());
    }

    /// Storage whose reads panic for one path.
    #[derive(Clone)]
    struct PanickingStorage {
        inner: MockStorage,
        poisoned: &'static str,
    }

    impl Storage for PanickingStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            if path == self.poisoned {
                panic!("disk exploded reading {path}");
            }
            self.inner.read_file(path).await
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.inner.write_file(path, data).await
        }

        async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
            self.inner.list_files(dir).await
        }

        async fn remove_dir_all(&self, dir: &str) -> Result<()> {
            self.inner.remove_dir_all(dir).await
        }
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let inner = sample_storage().await;
        let storage = PanickingStorage {
            inner: inner.clone(),
            poisoned: "src/js/app.js",
        };
        let engine = BundleEngine::new(storage, BundleConfig::default()).unwrap();

        let err = engine.build().await.unwrap_err();
        match err {
            BundleError::TaskPanickedError { task, .. } => assert_eq!(task, "scripts"),
            other => panic!("unexpected error: {other}"),
        }

        assert!(inner.get_file("build/ui-bundle/css/site.css").await.is_some());
        assert!(inner.get_file("build/ui-bundle.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_run_task_skips_clean_and_packaging() {
        let storage = sample_storage().await;
        storage.put("build/ui-bundle/js/keep.js", b"kept").await;

        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();
        let report = engine.run_task("styles").await.unwrap();

        assert_eq!(report.files_copied, 1);
        assert!(storage.get_file("build/ui-bundle/css/site.css").await.is_some());
        assert!(storage.get_file("build/ui-bundle/js/keep.js").await.is_some());
        assert!(storage.get_file("build/ui-bundle.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_run_unknown_task() {
        let engine = BundleEngine::new(MockStorage::new(), BundleConfig::default()).unwrap();
        let err = engine.run_task("fonts").await.unwrap_err();
        assert!(matches!(err, BundleError::UnknownTaskError { .. }));
    }

    #[tokio::test]
    async fn test_clean_without_build_dir() {
        let storage = sample_storage().await;
        let engine = BundleEngine::new(storage.clone(), BundleConfig::default()).unwrap();

        engine.clean().await.unwrap();
        assert_eq!(storage.paths().await.len(), 5);
    }

    #[tokio::test]
    async fn test_plan_lists_targets_without_writing() {
        let storage = sample_storage().await;
        let mut config = BundleConfig::default();
        config.tasks.push(AssetTask::new("fonts", "src/fonts/*.woff2", "fonts"));
        config.tasks.push(AssetTask::new("favicon", "src/img/favicon.ico", "img"));

        let engine = BundleEngine::new(storage.clone(), config).unwrap();
        let plan = engine.plan().await.unwrap();

        assert_eq!(plan.clean, "build");
        assert_eq!(plan.archive, "build/ui-bundle.zip");
        assert_eq!(plan.tasks.len(), 8);
        assert_eq!(plan.tasks[0].files[0].target, "build/ui-bundle/css/site.css");
        assert!(!plan.tasks[5].would_fail);
        assert!(!plan.tasks[6].would_fail);
        assert!(plan.tasks[7].would_fail);
        assert_eq!(storage.paths().await.len(), 5);
    }
}
