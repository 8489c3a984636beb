use crate::domain::model::ArchiveReport;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::BTreeSet;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

fn entry_name<'a>(staging_dir: &str, path: &'a str) -> &'a str {
    let staging_dir = staging_dir.trim_end_matches('/');
    if staging_dir.is_empty() || staging_dir == "." {
        return path;
    }
    path.strip_prefix(staging_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

fn dir_options() -> SimpleFileOptions {
    SimpleFileOptions::default().unix_permissions(0o755)
}

/// Packs every file under `staging_dir` into a zip written at `archive_path`.
/// Entry names are relative to the staging directory; each directory gets its
/// own entry ahead of its contents.
pub async fn package<S: Storage>(storage: &S, staging_dir: &str, archive_path: &str) -> Result<ArchiveReport> {
    let staged = storage.list_files(staging_dir).await?;

    let mut entries = Vec::with_capacity(staged.len());
    for path in &staged {
        if path == archive_path {
            continue;
        }
        let data = storage.read_file(path).await?;
        entries.push((entry_name(staging_dir, path).to_string(), data));
    }

    let mut seen_dirs = BTreeSet::new();

    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        for (name, data) in &entries {
            let mut prefix = String::new();
            let segments: Vec<&str> = name.split('/').collect();
            for segment in &segments[..segments.len() - 1] {
                prefix.push_str(segment);
                prefix.push('/');
                if seen_dirs.insert(prefix.clone()) {
                    zip.add_directory::<_, ()>(prefix.as_str(), dir_options())?;
                }
            }

            zip.start_file::<_, ()>(name.as_str(), file_options())?;
            zip.write_all(data)?;
        }

        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), archive_path);
    storage.write_file(archive_path, &zip_data).await?;

    Ok(ArchiveReport {
        path: archive_path.to_string(),
        files: entries.len(),
        directories: seen_dirs.len(),
        bytes: zip_data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MockStorage;
    use std::io::Read;

    fn entry_names(data: Vec<u8>) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_package_staging_tree() {
        let storage = MockStorage::with_files(&[
            ("build/ui-bundle/css/site.css", "body{margin:0}"),
            ("build/ui-bundle/js/app.js", "console.log(1)"),
            ("build/ui-bundle/layouts/docs/page.hbs", "<main/>"),
            ("src/js/app.js", "console.log(1)"),
        ])
        .await;

        let report = package(&storage, "build/ui-bundle", "build/ui-bundle.zip").await.unwrap();
        assert_eq!(report.files, 3);
        assert_eq!(report.directories, 4);

        let data = storage.get_file("build/ui-bundle.zip").await.unwrap();
        assert_eq!(report.bytes, data.len() as u64);

        let names = entry_names(data.clone());
        assert_eq!(
            names,
            vec![
                "css/",
                "css/site.css",
                "js/",
                "js/app.js",
                "layouts/",
                "layouts/docs/",
                "layouts/docs/page.hbs",
            ]
        );

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        let mut css = String::new();
        archive.by_name("css/site.css").unwrap().read_to_string(&mut css).unwrap();
        assert_eq!(css, "body{margin:0}");
    }

    #[tokio::test]
    async fn test_empty_staging_gives_valid_empty_archive() {
        let storage = MockStorage::new();

        let report = package(&storage, "build/ui-bundle", "build/ui-bundle.zip").await.unwrap();
        assert_eq!(report.files, 0);

        let data = storage.get_file("build/ui-bundle.zip").await.unwrap();
        assert!(entry_names(data).is_empty());
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("build/ui-bundle", "build/ui-bundle/css/a.css"), "css/a.css");
        assert_eq!(entry_name("build/ui-bundle/", "build/ui-bundle/a.css"), "a.css");
        assert_eq!(entry_name(".", "a.css"), "a.css");
    }
}
