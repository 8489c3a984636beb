// Adapters layer: concrete storage backends.

pub mod storage;

#[cfg(test)]
pub mod memory;

pub use storage::LocalStorage;
