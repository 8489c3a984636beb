use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-type transform applied while copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    #[default]
    Passthrough,
    CssMinify,
}

/// One leaf copy task: every file matching `src` lands under `staging/dest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTask {
    pub name: String,
    pub src: String,
    pub dest: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub allow_empty: bool,
    #[serde(default)]
    pub dot: bool,
}

impl AssetTask {
    pub fn new(name: &str, src: &str, dest: &str) -> Self {
        Self {
            name: name.to_string(),
            src: src.to_string(),
            dest: dest.to_string(),
            transform: Transform::Passthrough,
            allow_empty: false,
            dot: false,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub files_copied: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub path: String,
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub tasks: Vec<TaskReport>,
    pub archive: ArchiveReport,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl BuildReport {
    pub fn total_files(&self) -> usize {
        self.tasks.iter().map(|t| t.files_copied).sum()
    }
}

/// A source file and where a build would put it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPlan {
    pub task: String,
    pub pattern: String,
    pub transform: Transform,
    pub files: Vec<PlannedFile>,
    /// Set when the task would fail with an empty match.
    pub would_fail: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub clean: String,
    pub staging_dir: String,
    pub archive: String,
    pub tasks: Vec<TaskPlan>,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
