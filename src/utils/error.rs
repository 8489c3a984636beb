use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("File operation failed on '{path}': {source}")]
    FileOperationError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobError { pattern: String, reason: String },

    #[error("Task '{task}' matched no files for pattern '{pattern}'")]
    EmptyGlobError { task: String, pattern: String },

    #[error("Unknown task: {name}")]
    UnknownTaskError { name: String },

    #[error("Transform failed for '{path}': {message}")]
    TransformError { path: String, message: String },

    #[error("Task '{task}' panicked: {message}")]
    TaskPanickedError { task: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    FileSystem,
    Archive,
    Watch,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BundleError {
    pub fn file_operation(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileOperationError {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownTaskError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::FileOperationError { .. } => ErrorCategory::FileSystem,
            Self::ZipError(_) | Self::SerializationError(_) => ErrorCategory::Archive,
            Self::WatchError(_) => ErrorCategory::Watch,
            Self::InvalidGlobError { .. }
            | Self::EmptyGlobError { .. }
            | Self::TransformError { .. }
            | Self::TaskPanickedError { .. } => ErrorCategory::Task,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 檔案系統錯誤多半重試即可
            Self::IoError(_) | Self::FileOperationError { .. } => ErrorSeverity::Medium,
            Self::ZipError(_)
            | Self::SerializationError(_)
            | Self::InvalidGlobError { .. }
            | Self::EmptyGlobError { .. }
            | Self::TransformError { .. } => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownTaskError { .. }
            | Self::WatchError(_)
            | Self::TaskPanickedError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::FileOperationError { path, .. } => {
                format!("Could not read or write '{}'", path)
            }
            Self::EmptyGlobError { task, pattern } => {
                format!("Nothing to copy for task '{}' ({} matched no files)", task, pattern)
            }
            Self::UnknownTaskError { name } => format!("There is no task named '{}'", name),
            Self::TransformError { path, .. } => format!("Could not transform '{}'", path),
            Self::ZipError(_) => "Could not write the bundle archive".to_string(),
            Self::WatchError(_) => "Could not watch the source directory".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check bundle.toml (or the file passed with --config) and the task names it defines"
            }
            ErrorCategory::FileSystem => {
                "Check that the source files exist and the build directory is writable"
            }
            ErrorCategory::Archive => "Check free disk space and permissions on the build directory",
            ErrorCategory::Watch => {
                "Check the watch pattern and the platform's file watch limits (e.g. inotify max_user_watches)"
            }
            ErrorCategory::Task => match self {
                Self::EmptyGlobError { .. } => {
                    "Add matching source files or set allow_empty = true for the task"
                }
                _ => "Check the task's src pattern and the contents of the matched files",
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
