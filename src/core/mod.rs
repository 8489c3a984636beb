pub mod archive;
pub mod engine;
pub mod glob;
pub mod task;
pub mod transform;
pub mod watch;

pub use crate::domain::model::{AssetTask, BuildReport, TaskReport, Transform};
pub use crate::domain::ports::Storage;
pub use crate::utils::error::Result;
