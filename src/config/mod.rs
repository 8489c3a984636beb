#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::storage::join_relative;
use crate::core::glob::GlobPattern;
use crate::core::task::CopyTask;
use crate::domain::model::{AssetTask, Transform};
use crate::utils::error::{BundleError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "bundle.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub project: ProjectConfig,
    pub output: OutputConfig,
    pub watch: WatchConfig,
    pub tasks: Vec<AssetTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub build_dir: String,
    pub staging_dir: String,
    /// File name of the archive, written into `build_dir`.
    pub archive: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub pattern: String,
    pub debounce_ms: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "ui-bundle".to_string(),
            root: ".".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            build_dir: "build".to_string(),
            staging_dir: "build/ui-bundle".to_string(),
            archive: "ui-bundle.zip".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pattern: "src/**/*".to_string(),
            debounce_ms: 200,
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            output: OutputConfig::default(),
            watch: WatchConfig::default(),
            tasks: default_tasks(),
        }
    }
}

/// styles, scripts, layouts, partials, helpers and images under `src/`.
pub fn default_tasks() -> Vec<AssetTask> {
    vec![
        AssetTask::new("styles", "src/css/**/*.css", "css").with_transform(Transform::CssMinify),
        AssetTask::new("scripts", "src/js/**/*.js", "js"),
        AssetTask::new("layouts", "src/layouts/**/*.hbs", "layouts"),
        AssetTask::new("partials", "src/partials/**/*.hbs", "partials"),
        AssetTask::new("helpers", "src/helpers/**/*.js", "helpers"),
        AssetTask::new("images", "src/img/**/*", "img").allow_empty(true),
    ]
}

impl BundleConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BundleError::file_operation(path.as_ref().display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BundleError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 載入配置：明確指定的檔案必須存在；預設檔案不存在時使用內建配置
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("{} not found, using the built-in layout", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// 替換環境變數 (例如 ${BUILD_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BundleError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("project.name", &self.project.name)?;
        validation::validate_path("project.root", &self.project.root)?;

        let output = &self.output;
        validation::validate_relative_path("output.build_dir", &output.build_dir)?;
        validation::validate_relative_path("output.staging_dir", &output.staging_dir)?;

        // clean 只刪除 build_dir，所以 staging_dir 必須位於其內
        let build_dir = output.build_dir.trim_end_matches('/');
        let inside_build = output
            .staging_dir
            .strip_prefix(build_dir)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1);
        if build_dir == "." || !inside_build {
            return Err(BundleError::InvalidConfigValueError {
                field: "output.staging_dir".to_string(),
                value: output.staging_dir.clone(),
                reason: format!("must be a subdirectory of output.build_dir ({})", output.build_dir),
            });
        }

        validation::validate_non_empty_string("output.archive", &output.archive)?;
        if output.archive.contains('/') || output.archive.contains('\\') {
            return Err(BundleError::InvalidConfigValueError {
                field: "output.archive".to_string(),
                value: output.archive.clone(),
                reason: "must be a file name, not a path".to_string(),
            });
        }
        validation::validate_file_extension("output.archive", &output.archive, &["zip"])?;
        if self.archive_path() == output.staging_dir.trim_end_matches('/') {
            return Err(BundleError::InvalidConfigValueError {
                field: "output.archive".to_string(),
                value: output.archive.clone(),
                reason: "archive path collides with the staging directory".to_string(),
            });
        }

        GlobPattern::new(&self.watch.pattern, false)?;
        validation::validate_range("watch.debounce_ms", self.watch.debounce_ms, 0, 60_000)?;

        if self.tasks.is_empty() {
            return Err(BundleError::MissingConfigError {
                field: "tasks".to_string(),
            });
        }
        validation::validate_unique("tasks.name", self.tasks.iter().map(|t| t.name.as_str()))?;
        for task in &self.tasks {
            validation::validate_non_empty_string("tasks.name", &task.name)?;
            validation::validate_relative_path(&format!("tasks.{}.dest", task.name), &task.dest)?;
            GlobPattern::new(&task.src, task.dot)?;
        }

        Ok(())
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.project.root)
    }

    pub fn archive_path(&self) -> String {
        join_relative(&self.output.build_dir, &self.output.archive)
    }

    pub fn task(&self, name: &str) -> Result<&AssetTask> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| BundleError::UnknownTaskError {
                name: name.to_string(),
            })
    }

    pub fn copy_tasks(&self) -> Result<Vec<CopyTask>> {
        self.tasks.iter().cloned().map(CopyTask::new).collect()
    }
}

impl Validate for BundleConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
