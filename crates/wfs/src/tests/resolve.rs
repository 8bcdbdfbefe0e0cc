// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde_json::json;

use super::{new_root, volume_name};
use crate::entry::{Entry, FileType, TEXT_PLAIN};
use crate::error::ErrorKind;
use crate::memory::{self, MemoryDirectory};
use crate::options::OpenOptions;

#[tokio::test]
async fn test_create_then_open_file() {
    let root = new_root();

    let created = root
        .open("notes.txt", OpenOptions::create().data("hello"))
        .await
        .unwrap();
    assert_eq!(created.entry_type(), FileType::File);

    let file = root.open("notes.txt", OpenOptions::new()).await.unwrap().into_file().unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "hello");
    assert_eq!(file.mime_type(), TEXT_PLAIN);

    let children = root.children();
    let info = children.get("notes.txt").unwrap();
    assert_eq!(info.entry_type, FileType::File);
    assert_eq!(info.size, Some(5));
}

#[tokio::test]
async fn test_open_missing_is_not_found() {
    let root = new_root();
    let err = root.open("nothing", OpenOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert_eq!(err.filename(), Some("nothing"));
    assert_eq!(err.path(), Some("nothing"));
    assert_eq!(err.remaining(), Some(""));
}

#[tokio::test]
async fn test_create_existing_is_name_conflict() {
    let root = new_root();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    root.open("a/f", OpenOptions::create()).await.unwrap();

    let err = root.open("a/f", OpenOptions::create()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NameConflict);
    assert_eq!(err.filename(), Some("f"));
    assert_eq!(err.path(), Some("a/f"));
    assert_eq!(err.remaining(), Some(""));
    assert!(err.directory().unwrap().same_node(&a));
}

#[tokio::test]
async fn test_empty_and_dot_components_are_skipped() {
    let root = new_root();
    let b = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap()
        .open("b", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    b.open("c.txt", OpenOptions::create().data("same")).await.unwrap();

    for path in ["a/b", "a//./b", "./a/./b/", "a/b/."] {
        let dir = root.open(path, OpenOptions::new()).await.unwrap().into_dir().unwrap();
        assert!(dir.same_node(&b), "{path}");
    }
    let file = root
        .open("a//./b/c.txt", OpenOptions::new())
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "same");
}

#[tokio::test]
async fn test_error_annotation_keeps_innermost_context() {
    let root = new_root();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();

    let err = root.open("a/b/c", OpenOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert_eq!(err.filename(), Some("b"));
    assert_eq!(err.path(), Some("a/b"));
    assert_eq!(err.remaining(), Some("c"));
    assert!(err.directory().unwrap().same_node(&a));
}

#[tokio::test]
async fn test_missing_intermediate_is_not_created() {
    let root = new_root();
    let err = root
        .open("x/y", OpenOptions::create().data("data"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert!(!root.children().contains_key("x"));
}

#[tokio::test]
async fn test_file_intermediate_is_not_a_directory() {
    let root = new_root();
    root.open("f", OpenOptions::create()).await.unwrap();
    let err = root.open("f/g", OpenOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotADirectory);
    assert_eq!(err.path(), Some("f"));
    assert_eq!(err.remaining(), Some("g"));
}

#[tokio::test]
async fn test_parent_refs() {
    let root = new_root();
    root.open("top.txt", OpenOptions::create()).await.unwrap();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();

    let up = root.open("..", OpenOptions::new()).await.unwrap().into_dir().unwrap();
    assert!(up.same_node(&root));

    let back = root.open("a/..", OpenOptions::new()).await.unwrap().into_dir().unwrap();
    assert!(back.same_node(&root));

    let file = a.open("../top.txt", OpenOptions::new()).await.unwrap();
    assert_eq!(file.entry_type(), FileType::File);
}

#[tokio::test]
async fn test_absolute_path_starts_at_root() {
    let root = new_root();
    root.open("top.txt", OpenOptions::create().data("top")).await.unwrap();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    let b = a
        .open("b", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();

    assert!(b.root().same_node(&root));
    let file = b.open("/top.txt", OpenOptions::new()).await.unwrap().into_file().unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "top");
}

#[tokio::test]
async fn test_empty_path_returns_self() {
    let root = new_root();
    for path in ["", ".", "./", "//"] {
        let dir = root.open(path, OpenOptions::new()).await.unwrap().into_dir().unwrap();
        assert!(dir.same_node(&root));
    }
}

#[tokio::test]
async fn test_directory_defaults() {
    let root = new_root();
    let dir = root
        .open("d", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    assert_eq!(dir.entry_type(), FileType::Directory);
    assert_eq!(dir.mime_type(), memory::MEMORY_MIME);
    assert!(dir.parent().unwrap().same_node(&root));
}

#[tokio::test]
async fn test_open_mount_type_is_rejected() {
    let root = new_root();
    let err = root
        .open("m", OpenOptions::create().file_type(FileType::Mount))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
}

#[tokio::test]
async fn test_pending_data_is_joined_in_order() {
    let root = new_root();
    let file = root
        .open(
            "joined",
            OpenOptions::create()
                .data("one ")
                .pending_data(async { Ok(Bytes::from_static(b"two ")) })
                .data("three"),
        )
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "one two three");
}

#[tokio::test]
async fn test_on_error_runs_once_at_outer_level() {
    let root = new_root();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = calls.clone();
    let fallback = root.clone();
    let entry = root
        .open(
            "a/b/c",
            OpenOptions::new().on_error(move |err| {
                seen.lock().unwrap().push(err.path().unwrap_or_default().to_string());
                Ok(Entry::Directory(fallback.clone()))
            }),
        )
        .await
        .unwrap();
    assert!(entry.as_dir().unwrap().same_node(&root));
    assert_eq!(*calls.lock().unwrap(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_on_create_fires_only_on_creation() {
    let root = new_root();
    let created = Arc::new(Mutex::new(Vec::new()));
    let seen = created.clone();
    root.on_create(move |entry, name| {
        seen.lock().unwrap().push((name.to_string(), entry.entry_type()));
    });

    root.open("f", OpenOptions::create()).await.unwrap();
    root.open("f", OpenOptions::new()).await.unwrap();
    root.open("d", OpenOptions::create().directory()).await.unwrap();

    assert_eq!(
        *created.lock().unwrap(),
        vec![
            ("f".to_string(), FileType::File),
            ("d".to_string(), FileType::Directory)
        ]
    );
}

#[tokio::test]
async fn test_remove() {
    let root = new_root();
    let removed = Arc::new(Mutex::new(Vec::new()));
    let seen = removed.clone();
    root.on_remove(move |name| seen.lock().unwrap().push(name.to_string()));

    root.open("f", OpenOptions::create()).await.unwrap();
    root.remove("f").await.unwrap();

    assert!(!root.children().contains_key("f"));
    assert_eq!(*removed.lock().unwrap(), vec!["f".to_string()]);
    let err = root.open("f", OpenOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
}

#[tokio::test]
async fn test_remove_nested_and_errors() {
    let root = new_root();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    a.open("b", OpenOptions::create()).await.unwrap();

    root.remove("a/b").await.unwrap();
    assert!(a.children().is_empty());

    let err = root.remove("a/missing").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert_eq!(err.path(), Some("a/missing"));

    let err = root.remove("").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::RootTarget("remove"));

    root.remove("a").await.unwrap();
    assert!(root.children().is_empty());
}

#[tokio::test]
async fn test_mount_and_reopen() {
    let root = new_root();
    let volume = volume_name();
    let mounted = root
        .mount("m", memory::DRIVER_NAME, vec![json!(volume)])
        .await
        .unwrap();
    assert_eq!(mounted.entry_type(), FileType::Mount);
    assert!(mounted.parent().unwrap().same_node(&root));

    mounted
        .open("inside.txt", OpenOptions::create().data("mounted"))
        .await
        .unwrap();

    let info = root.children().get("m").cloned().unwrap();
    assert_eq!(info.entry_type, FileType::Mount);
    assert_eq!(info.driver.as_deref(), Some(memory::DRIVER_NAME));
    assert_eq!(info.mime_type, memory::MEMORY_MIME);

    let reopened = root.open("m", OpenOptions::new()).await.unwrap();
    assert_eq!(reopened.entry_type(), FileType::Mount);

    let file = root
        .open("m/inside.txt", OpenOptions::new())
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(file.read_to_string().await.unwrap(), "mounted");

    let standalone = MemoryDirectory::mount(None, &volume, 0).unwrap();
    assert!(standalone.children().contains_key("inside.txt"));
    assert_eq!(standalone.entry_type(), FileType::Directory);
}

#[tokio::test]
async fn test_mount_errors() {
    let root = new_root();
    root.open("taken", OpenOptions::create()).await.unwrap();

    let err = root
        .mount("taken", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NameConflict);

    let err = root.mount("x", "nosuchdriver", vec![]).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownDriver("nosuchdriver".to_string()));

    let err = root
        .mount("", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::RootTarget("mount"));

    let err = root
        .mount("missing/m", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
}

#[tokio::test]
async fn test_mount_through_intermediate_fires_on_create() {
    let root = new_root();
    let a = root
        .open("a", OpenOptions::create().directory())
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    let created = Arc::new(Mutex::new(Vec::new()));
    let seen = created.clone();
    a.on_create(move |entry, name| seen.lock().unwrap().push((name.to_string(), entry.entry_type())));

    // The hook belongs to `a`, so resolve through it directly.
    a.mount("m", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap();
    root.mount("a/n", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap();

    assert_eq!(*created.lock().unwrap(), vec![("m".to_string(), FileType::Mount)]);
    assert!(a.children().contains_key("n"));
}

#[tokio::test]
async fn test_remove_mount_point_keeps_mounted_content() {
    let root = new_root();
    let volume = volume_name();
    let mounted = root
        .mount("m", memory::DRIVER_NAME, vec![json!(volume)])
        .await
        .unwrap();
    mounted.open("kept", OpenOptions::create()).await.unwrap();

    root.remove("m").await.unwrap();
    assert!(!root.children().contains_key("m"));

    let standalone = MemoryDirectory::mount(None, &volume, 0).unwrap();
    assert!(standalone.children().contains_key("kept"));
}

#[tokio::test]
async fn test_read_only_directory() {
    let root = new_root();
    root.open("d", OpenOptions::create().directory()).await.unwrap();
    root.open("d/f", OpenOptions::create().data("x")).await.unwrap();

    let ro = root
        .open("d", OpenOptions::new().read_only(true))
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    assert!(ro.is_read_only());

    let err = ro.open("g", OpenOptions::create()).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PermissionDenied(_)));

    let err = ro.remove("f").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PermissionDenied(_)));

    let err = ro
        .mount("m", memory::DRIVER_NAME, vec![json!(volume_name())])
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PermissionDenied(_)));

    let file = ro.open("f", OpenOptions::new()).await.unwrap().into_file().unwrap();
    assert!(file.is_read_only());
    let err = file.write("y", 0, None).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PermissionDenied(_)));

    // The shared directory itself is still writable.
    root.open("d/g", OpenOptions::create()).await.unwrap();
}

#[tokio::test]
async fn test_copy_and_move_are_unimplemented() {
    let root = new_root();
    root.open("f", OpenOptions::create()).await.unwrap();
    let err = root.copy("f", "g").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Unimplemented("copy"));
    let err = root.move_entry("f", "g").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Unimplemented("move"));
}
