// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Once;

use localfs::{DRIVER_NAME, LocalDirectory, LocalDriver, ROOT_KEY};
use serde_json::json;
use tempfile::TempDir;
use wfs::memory::{self, MemoryDriver};
use wfs::{Dir, ErrorKind, FileType, INODE_MIME, OpenOptions, Registry};

static INSTALL: Once = Once::new();

fn setup() {
    INSTALL.call_once(|| {
        Registry::builder()
            .driver(LocalDriver)
            .driver(MemoryDriver)
            .install()
            .expect("install registry");
    });
}

fn db_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_string()
}

async fn mount_root(path: &str) -> Dir {
    setup();
    LocalDirectory::mount(None, path, ROOT_KEY).await.unwrap()
}

fn count_rows(path: &str) -> (i64, i64) {
    let conn = duckdb::Connection::open(Path::new(path)).unwrap();
    let info: i64 = conn
        .query_row("SELECT count(*) FROM file_info", [], |r| r.get(0))
        .unwrap();
    let data: i64 = conn
        .query_row("SELECT count(*) FROM file_data", [], |r| r.get(0))
        .unwrap();
    (info, data)
}

#[tokio::test]
async fn test_files_persist_across_mounts() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "fs.duckdb");

    {
        let root = mount_root(&path).await;
        root.open("docs", OpenOptions::create().directory()).await.unwrap();
        root.open(
            "docs/readme.md",
            OpenOptions::create().data("# hello").mime_type("text/markdown"),
        )
        .await
        .unwrap();
    }

    let root = mount_root(&path).await;
    let docs = root.children().get("docs").cloned().unwrap();
    assert_eq!(docs.entry_type, FileType::Directory);
    assert_eq!(docs.mime_type, INODE_MIME);

    let file = root
        .open("docs/readme.md", OpenOptions::new())
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.mime_type(), "text/markdown");
    assert_eq!(file.read_to_string().await.unwrap(), "# hello");

    let dir = root.open("docs", OpenOptions::new()).await.unwrap().into_dir().unwrap();
    let info = dir.children().get("readme.md").cloned().unwrap();
    assert_eq!(info.size, Some(7));
    assert_eq!(info.mime_type, "text/markdown");
}

#[tokio::test]
async fn test_mount_info_and_root_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "info.duckdb");
    let root = mount_root(&path).await;
    assert_eq!(root.entry_type(), FileType::Directory);
    assert_eq!(root.mime_type(), INODE_MIME);
    assert_eq!(root.mount_info(), vec![json!(path), json!(ROOT_KEY)]);
    assert!(root.children().is_empty());
}

#[tokio::test]
async fn test_writes_persist() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "write.duckdb");

    {
        let root = mount_root(&path).await;
        let file = root
            .open("counts", OpenOptions::create())
            .await
            .unwrap()
            .into_file()
            .unwrap();
        let size = file.write(&[10i32, 20, 30], 0, None).await.unwrap();
        assert_eq!(size, 3);
        file.write(&[25i32], 1, Some(1)).await.unwrap();
    }

    let root = mount_root(&path).await;
    let file = root.open("counts", OpenOptions::new()).await.unwrap().into_file().unwrap();
    let mut values = [0i32; 3];
    assert_eq!(file.read(&mut values, 0, None).await.unwrap(), 3);
    assert_eq!(values, [10, 25, 30]);
    assert_eq!(root.children().get("counts").unwrap().size, Some(12));
}

#[tokio::test]
async fn test_created_time_is_kept() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "times.duckdb");
    let root = mount_root(&path).await;
    let when = wfs::parse_time("2020-01-02T03:04:05.678Z").unwrap();
    root.open("old", OpenOptions::create().created_time(when).modified_time(when))
        .await
        .unwrap();
    let info = root.children().get("old").cloned().unwrap();
    assert_eq!(info.created_time, when);
    assert_eq!(info.modified_time, when);
}

#[tokio::test]
async fn test_remove_deletes_subtree_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "remove.duckdb");

    {
        let root = mount_root(&path).await;
        root.open("a", OpenOptions::create().directory()).await.unwrap();
        root.open("a/b", OpenOptions::create().directory()).await.unwrap();
        root.open("a/b/c.txt", OpenOptions::create().data("c")).await.unwrap();
        root.open("a/d.txt", OpenOptions::create().data("d")).await.unwrap();

        root.remove("a").await.unwrap();
        assert!(root.children().is_empty());
    }

    assert_eq!(count_rows(&path), (1, 1));
}

#[tokio::test]
async fn test_sync_sees_changes_from_other_handles() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "sync.duckdb");
    let root = mount_root(&path).await;
    root.open("shared", OpenOptions::create().directory()).await.unwrap();

    let first = root.open("shared", OpenOptions::new()).await.unwrap().into_dir().unwrap();
    let second = root.open("shared", OpenOptions::new()).await.unwrap().into_dir().unwrap();

    first.open("new.txt", OpenOptions::create()).await.unwrap();
    assert!(!second.children().contains_key("new.txt"));

    second.sync().await.unwrap();
    assert!(second.children().contains_key("new.txt"));
}

#[tokio::test]
async fn test_local_inside_local() {
    let tmp = tempfile::tempdir().unwrap();
    let outer = db_path(&tmp, "outer.duckdb");
    let inner = db_path(&tmp, "inner.duckdb");

    {
        let root = mount_root(&outer).await;
        let mounted = root.mount("other", DRIVER_NAME, vec![json!(inner)]).await.unwrap();
        assert_eq!(mounted.entry_type(), FileType::Mount);
        mounted.open("hello.txt", OpenOptions::create().data("from inner")).await.unwrap();

        let info = root.children().get("other").cloned().unwrap();
        assert_eq!(info.entry_type, FileType::Mount);
        assert_eq!(info.driver.as_deref(), Some(DRIVER_NAME));
        assert_eq!(info.mime_type, INODE_MIME);
    }

    let root = mount_root(&outer).await;
    let reopened = root.open("other", OpenOptions::new()).await.unwrap();
    assert_eq!(reopened.entry_type(), FileType::Mount);
    let file = root
        .open("other/hello.txt", OpenOptions::new())
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "from inner");

    // `..` from inside the mount leads back to the outer store.
    let back = reopened
        .into_dir()
        .unwrap()
        .open("..", OpenOptions::new())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    assert!(back.same_node(&root));
}

#[tokio::test]
async fn test_remove_mount_point_leaves_target() {
    let tmp = tempfile::tempdir().unwrap();
    let outer = db_path(&tmp, "unlink-outer.duckdb");
    let inner = db_path(&tmp, "unlink-inner.duckdb");

    let root = mount_root(&outer).await;
    let mounted = root.mount("other", DRIVER_NAME, vec![json!(inner)]).await.unwrap();
    mounted.open("kept.txt", OpenOptions::create()).await.unwrap();

    root.remove("other").await.unwrap();
    assert!(root.children().is_empty());

    let standalone = mount_root(&inner).await;
    assert!(standalone.children().contains_key("kept.txt"));
}

#[tokio::test]
async fn test_memory_inside_local() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "mixed.duckdb");
    let volume = format!("local-test-{}", std::process::id());

    let root = mount_root(&path).await;
    let mounted = root
        .mount("scratch", memory::DRIVER_NAME, vec![json!(volume)])
        .await
        .unwrap();
    mounted.open("tmp.txt", OpenOptions::create().data("scratch")).await.unwrap();

    let info = root.children().get("scratch").cloned().unwrap();
    assert_eq!(info.mime_type, memory::MEMORY_MIME);
    assert_eq!(info.driver.as_deref(), Some(memory::DRIVER_NAME));

    let file = root
        .open("scratch/tmp.txt", OpenOptions::new())
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "scratch");
}

#[tokio::test]
async fn test_mount_errors() {
    setup();
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "errors.duckdb");

    let err = LocalDirectory::mount(None, &path, 99).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);

    let err = wfs::registry::mount(DRIVER_NAME, None, &[json!(5)]).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));

    let dir = wfs::registry::mount(DRIVER_NAME, None, &[json!(path), json!(ROOT_KEY)])
        .await
        .unwrap();
    assert_eq!(dir.entry_type(), FileType::Mount);
}

#[tokio::test]
async fn test_read_only_view() {
    let tmp = tempfile::tempdir().unwrap();
    let path = db_path(&tmp, "ro.duckdb");
    let root = mount_root(&path).await;
    root.open("f", OpenOptions::create().data("fixed")).await.unwrap();

    let file = root
        .open("f", OpenOptions::new().read_only(true))
        .await
        .unwrap()
        .into_file()
        .unwrap();
    let err = file.write("changed", 0, None).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PermissionDenied(_)));
    assert_eq!(file.read_to_string().await.unwrap(), "fixed");
}
