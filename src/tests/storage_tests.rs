use crate::metrics::Metrics;
use crate::storage::{generate_filename, image_extension, is_valid_filename, ImageStore};

#[test]
fn extension_allow_list() {
    assert_eq!(image_extension("cat.png").as_deref(), Some("png"));
    assert_eq!(image_extension("cat.jpg").as_deref(), Some("jpg"));
    assert_eq!(image_extension("holiday.photo.JPEG").as_deref(), Some("jpeg"));
    assert_eq!(image_extension("cat.gif"), None);
    assert_eq!(image_extension("cat.png.exe"), None);
    assert_eq!(image_extension("noext"), None);
    assert_eq!(image_extension(""), None);
}

#[test]
fn generated_names_keep_extension_and_differ() {
    let a = generate_filename("jpg");
    let b = generate_filename("jpg");
    assert!(a.ends_with(".jpg"));
    assert_ne!(a, b);
    assert!(is_valid_filename(&a));
}

#[test]
fn rejects_non_flat_filenames() {
    assert!(is_valid_filename("abc.png"));
    assert!(!is_valid_filename(""));
    assert!(!is_valid_filename(".."));
    assert!(!is_valid_filename(".hidden.png"));
    assert!(!is_valid_filename("../etc/passwd"));
    assert!(!is_valid_filename("dir/file.png"));
    assert!(!is_valid_filename("dir\\file.png"));
    assert!(!is_valid_filename("nul\0.png"));
}

#[tokio::test]
async fn save_exists_remove() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new();
    let store = ImageStore::new(dir.path(), metrics.clone());

    store.save("a.png", b"png-bytes").await.unwrap();
    assert!(store.exists("a.png").await);
    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"png-bytes");

    store.remove("a.png").await.unwrap();
    assert!(!store.exists("a.png").await);

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.images_stored, 1);
    assert_eq!(snapshot.images_removed, 1);
}

#[tokio::test]
async fn save_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path(), Metrics::new());

    store.save("a.png", b"first").await.unwrap();
    assert!(store.save("a.png", b"second").await.is_err());
    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"first");
}

#[tokio::test]
async fn save_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path().join("images"), Metrics::new());
    store.ensure_dir().await.unwrap();

    let err = store.save("../escape.png", b"x").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(!dir.path().join("escape.png").exists());
}

#[tokio::test]
async fn best_effort_removal_counts_failures() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new();
    let store = ImageStore::new(dir.path(), metrics.clone());

    store.remove_best_effort("missing.png", "test").await;
    store.remove_best_effort("", "test").await;

    assert_eq!(metrics.get_snapshot().image_cleanup_failures, 1);
}

#[tokio::test]
async fn committed_stage_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new();
    let store = ImageStore::new(dir.path(), metrics.clone());

    let pending = store.stage("kept.jpg", b"jpeg").await.unwrap();
    assert_eq!(pending.filename(), "kept.jpg");
    assert_eq!(pending.commit(), "kept.jpg");

    tokio::task::yield_now().await;
    assert!(store.exists("kept.jpg").await);
    assert_eq!(metrics.get_snapshot().uploads_abandoned, 0);
}

#[tokio::test]
async fn discarded_stage_is_removed_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new();
    let store = ImageStore::new(dir.path(), metrics.clone());

    let pending = store.stage("failed.jpg", b"jpeg").await.unwrap();
    pending.discard("insert failed").await;

    assert!(!store.exists("failed.jpg").await);
    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.images_removed, 1);
    assert_eq!(snapshot.uploads_abandoned, 0);
}

#[tokio::test]
async fn dropped_stage_is_removed_in_background() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new();
    let store = ImageStore::new(dir.path(), metrics.clone());

    let pending = store.stage("abandoned.jpg", b"jpeg").await.unwrap();
    drop(pending);
    assert_eq!(metrics.get_snapshot().uploads_abandoned, 1);

    for _ in 0..100 {
        if !store.exists("abandoned.jpg").await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(!store.exists("abandoned.jpg").await);
}
