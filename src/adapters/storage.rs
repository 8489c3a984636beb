use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Joins two `/`-separated relative paths, treating `""` and `"."` as the root.
pub fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else if name.is_empty() || name == "." {
        dir.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        if path.is_empty() || path == "." {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.full_path(path))
            .await
            .map_err(|e| BundleError::file_operation(path, e))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BundleError::file_operation(parent.display().to_string(), e))?;
        }

        tokio::fs::write(&full_path, data)
            .await
            .map_err(|e| BundleError::file_operation(path, e))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.trim_end_matches('/').to_string()];

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(self.full_path(&current)).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::NotADirectory => {
                    continue
                }
                Err(e) => return Err(BundleError::file_operation(current, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| BundleError::file_operation(current.clone(), e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::warn!("Skipping non UTF-8 file name in {}", current);
                    continue;
                };
                let relative = join_relative(&current, &name);

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| BundleError::file_operation(relative.clone(), e))?;

                // Symlinked directories are not descended into; symlinked files are kept.
                if file_type.is_dir() {
                    pending.push(relative);
                } else if file_type.is_file() {
                    files.push(relative);
                } else if file_type.is_symlink() {
                    match tokio::fs::metadata(entry.path()).await {
                        Ok(target) if target.is_file() => files.push(relative),
                        Ok(_) => tracing::debug!("Not following directory link {}", relative),
                        Err(e) => tracing::warn!("Skipping broken link {}: {}", relative, e),
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn remove_dir_all(&self, dir: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.full_path(dir)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BundleError::file_operation(dir, e)),
        }
    }
}
