// セッションストアテスト: ファイルシステム / メモリ

use ink_scrub::error::InkScrubError;
use ink_scrub::session::snapshot::JobSnapshot;
use ink_scrub::session::{
    FsSessionStore, MemorySessionStore, SessionStore, file_key, page_key, state_key,
};

fn exercise_round_trip(store: &dyn SessionStore) {
    assert_eq!(store.get("file-abc").expect("get"), None);

    store.set("file-abc", b"%PDF-1.7").expect("set");
    assert_eq!(
        store.get("file-abc").expect("get"),
        Some(b"%PDF-1.7".to_vec())
    );

    // 上書き
    store.set("file-abc", b"%PDF-2.0").expect("overwrite");
    assert_eq!(
        store.get("file-abc").expect("get"),
        Some(b"%PDF-2.0".to_vec())
    );

    store.delete("file-abc").expect("delete");
    assert_eq!(store.get("file-abc").expect("get"), None);
    // 存在しないキーの削除はエラーにならない
    store.delete("file-abc").expect("delete missing");
}

fn exercise_namespaces(store: &dyn SessionStore) {
    store.set(&file_key("doc1"), b"pdf").expect("set");
    store.set(&page_key("doc1", 0), b"png0").expect("set");
    store.set(&page_key("doc1", 12), b"png12").expect("set");
    store.set(&state_key("doc1"), b"{}").expect("set");
    store.set(&state_key("doc2"), b"{}").expect("set");

    assert_eq!(store.list_ids().expect("list"), vec!["doc1", "doc2"]);
    assert_eq!(store.keys().expect("keys").len(), 5);

    store.clear().expect("clear");
    assert!(store.keys().expect("keys").is_empty());
    assert!(store.list_ids().expect("list").is_empty());
}

// ============================================================
// 1. キー
// ============================================================

#[test]
fn test_key_layout() {
    assert_eq!(file_key("abc"), "file-abc");
    assert_eq!(page_key("abc", 3), "file-abc.p3");
    assert_eq!(state_key("abc"), "state-abc");
}

#[test]
fn test_invalid_keys_are_rejected() {
    let store = MemorySessionStore::new();
    for key in ["", "../escape", "a/b", ".hidden", "space key"] {
        assert!(
            matches!(store.set(key, b"x"), Err(InkScrubError::PersistenceError(_))),
            "key {key:?} should be rejected"
        );
    }
}

// ============================================================
// 2. MemorySessionStore
// ============================================================

#[test]
fn test_memory_store_round_trip() {
    let store = MemorySessionStore::new();
    exercise_round_trip(&store);
    assert!(store.is_empty());
}

#[test]
fn test_memory_store_namespaces() {
    exercise_namespaces(&MemorySessionStore::new());
}

// ============================================================
// 3. FsSessionStore
// ============================================================

#[test]
fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FsSessionStore::open(dir.path().join("state")).expect("open store");
    exercise_round_trip(&store);
}

#[test]
fn test_fs_store_namespaces() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FsSessionStore::open(dir.path()).expect("open store");
    exercise_namespaces(&store);
}

#[test]
fn test_fs_store_persists_across_instances() {
    let dir = tempfile::tempdir().expect("create temp dir");
    {
        let store = FsSessionStore::open(dir.path()).expect("open store");
        store.set("state-doc", b"{\"a\":1}").expect("set");
    }
    let reopened = FsSessionStore::open(dir.path()).expect("reopen store");
    assert_eq!(
        reopened.get("state-doc").expect("get"),
        Some(b"{\"a\":1}".to_vec())
    );
}

#[test]
fn test_fs_store_leaves_no_temp_files() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FsSessionStore::open(dir.path()).expect("open store");
    store.set("file-x", b"data").expect("set");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["file-x"]);
}

#[test]
fn test_fs_store_ignores_foreign_files_in_keys() {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join(".DS_Store"), b"junk").expect("write");
    let store = FsSessionStore::open(dir.path()).expect("open store");
    store.set("state-a", b"{}").expect("set");
    assert_eq!(store.keys().expect("keys"), vec!["state-a"]);
}

// ============================================================
// 4. スナップショット
// ============================================================

#[test]
fn test_snapshot_rejects_unknown_version() {
    let json = br#"{"version":99,"id":"a","name":"a.pdf","status":"done",
                    "completed":0,"total":0,"pages":[]}"#;
    assert!(matches!(
        JobSnapshot::from_json(json),
        Err(InkScrubError::PersistenceError(_))
    ));
}

#[test]
fn test_snapshot_rejects_garbage() {
    assert!(JobSnapshot::from_json(b"not json").is_err());
}
