use crate::utils::error::Result;

/// Filesystem seam. Every path is relative to the storage root and uses `/`
/// as separator.
pub trait Storage: Clone + Send + Sync + 'static {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// All regular files below `dir`, recursively, sorted. Symlinked
    /// directories are not descended into. A missing directory yields an
    /// empty list.
    fn list_files(&self, dir: &str) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Remove `dir` and everything below it. A missing directory is not an error.
    fn remove_dir_all(&self, dir: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
