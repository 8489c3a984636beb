use crate::adapters::storage::join_relative;
use crate::core::glob::GlobPattern;
use crate::domain::model::{AssetTask, PlannedFile, TaskPlan, TaskReport};
use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use std::time::Instant;

/// An [`AssetTask`] with its glob compiled.
#[derive(Debug, Clone)]
pub struct CopyTask {
    task: AssetTask,
    glob: GlobPattern,
}

impl CopyTask {
    pub fn new(task: AssetTask) -> Result<Self> {
        let glob = GlobPattern::new(&task.src, task.dot)?;
        Ok(Self { task, glob })
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }

    fn target_path(&self, staging_dir: &str, source: &str) -> Result<String> {
        let relative = self.glob.relative_to_base(source).ok_or_else(|| BundleError::InvalidGlobError {
            pattern: self.glob.as_str().to_string(),
            reason: format!("matched file '{}' is outside the glob base", source),
        })?;
        Ok(join_relative(&join_relative(staging_dir, &self.task.dest), relative))
    }

    // Only a singular pattern naming a missing file is an error; a wildcard
    // that matches nothing just copies nothing.
    fn fails_on_empty(&self) -> bool {
        self.glob.is_singular() && !self.task.allow_empty
    }

    async fn matched_files<S: Storage>(&self, storage: &S) -> Result<Vec<String>> {
        let files = self.glob.expand(storage).await?;
        if files.is_empty() && self.fails_on_empty() {
            return Err(BundleError::EmptyGlobError {
                task: self.task.name.clone(),
                pattern: self.task.src.clone(),
            });
        }
        Ok(files)
    }

    /// Copies every matched file into `staging_dir/dest`, applying the
    /// task's transform.
    pub async fn run<S: Storage>(&self, storage: &S, staging_dir: &str) -> Result<TaskReport> {
        let started = Instant::now();
        let files = self.matched_files(storage).await?;

        let mut bytes_in = 0u64;
        let mut bytes_out = 0u64;

        for source in &files {
            let target = self.target_path(staging_dir, source)?;
            let data = storage.read_file(source).await?;
            bytes_in += data.len() as u64;

            let output = self.task.transform.apply(source, data)?;
            bytes_out += output.len() as u64;

            tracing::debug!("[{}] {} -> {}", self.task.name, source, target);
            storage.write_file(&target, &output).await?;
        }

        let report = TaskReport {
            task: self.task.name.clone(),
            files_copied: files.len(),
            bytes_in,
            bytes_out,
            duration: started.elapsed(),
        };

        tracing::info!(
            "[{}] copied {} files ({} -> {} bytes) in {:?}",
            report.task,
            report.files_copied,
            report.bytes_in,
            report.bytes_out,
            report.duration
        );

        Ok(report)
    }

    /// Resolves what [`CopyTask::run`] would do without touching any file.
    pub async fn plan<S: Storage>(&self, storage: &S, staging_dir: &str) -> Result<TaskPlan> {
        let sources = self.glob.expand(storage).await?;
        let files = sources
            .iter()
            .map(|source| {
                Ok(PlannedFile {
                    source: source.clone(),
                    target: self.target_path(staging_dir, source)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TaskPlan {
            task: self.task.name.clone(),
            pattern: self.task.src.clone(),
            transform: self.task.transform,
            would_fail: files.is_empty() && self.fails_on_empty(),
            files,
        })
    }
}
