use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use ui_bundle::{AssetWatcher, BundleConfig, BundleEngine, LocalStorage};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_watch_rebuilds_on_source_change() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();

    write(&root, "src/css/site.css", "body { margin: 0; }");
    write(&root, "src/js/app.js", "console.log(1);");
    write(&root, "src/layouts/default.hbs", "<html/>");
    write(&root, "src/partials/header.hbs", "<header/>");
    write(&root, "src/helpers/eq.js", "module.exports = 1;");

    let mut config = BundleConfig::default();
    config.project.root = root.to_str().unwrap().to_string();
    config.watch.debounce_ms = 50;

    let engine = BundleEngine::new(LocalStorage::new(config.root()), config).unwrap();
    let watcher = AssetWatcher::new(engine, &root).unwrap();

    let editor_root = root.clone();
    let editor = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        write(&editor_root, "src/js/app.js", "console.log(2);");
    });

    let rebuilds = watcher
        .run_until(tokio::time::sleep(Duration::from_secs(3)))
        .await
        .unwrap();
    editor.await.unwrap();

    assert!(rebuilds >= 1);
    assert_eq!(
        std::fs::read_to_string(root.join("build/ui-bundle/js/app.js")).unwrap(),
        "console.log(2);"
    );
    assert!(root.join("build/ui-bundle.zip").exists());
}
