use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory storage for unit tests.
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_files(files: &[(&str, &str)]) -> Self {
        let storage = Self::new();
        for (path, content) in files {
            storage.put(path, content.as_bytes()).await;
        }
        storage
    }

    pub async fn put(&self, path: &str, data: &[u8]) {
        self.files.lock().await.insert(path.to_string(), data.to_vec());
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }
}

fn under(dir: &str, path: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    dir.is_empty() || dir == "." || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            BundleError::file_operation(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            )
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let files = self.files.lock().await;
        Ok(files.keys().filter(|p| under(dir, p)).cloned().collect())
    }

    async fn remove_dir_all(&self, dir: &str) -> Result<()> {
        let mut files = self.files.lock().await;
        files.retain(|p, _| !under(dir, p));
        Ok(())
    }
}
