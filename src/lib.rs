pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Action, CliArgs};

pub use adapters::LocalStorage;
pub use config::BundleConfig;
pub use crate::core::{engine::BundleEngine, watch::AssetWatcher};
pub use utils::error::{BundleError, Result};
