//! End-to-end tests driving every built-in backend through its URI scheme.

use quill::{new_store, register_builtin_stores, DocumentStore, Error};

fn backends(dir: &std::path::Path) -> Vec<(&'static str, Box<dyn DocumentStore>)> {
    register_builtin_stores();
    vec![
        ("memory", new_store("memory:").unwrap()),
        (
            "file",
            new_store(&format!("file://{}/pages", dir.display())).unwrap(),
        ),
        (
            "sqlite",
            new_store(&format!("sqlite://{}/wiki.db", dir.display())).unwrap(),
        ),
    ]
}

#[test]
fn every_backend_round_trips_a_document() {
    let dir = tempfile::tempdir().unwrap();
    for (scheme, store) in backends(dir.path()) {
        store.update("/Front Page", "welcome!").unwrap();
        let doc = store.get("/Front Page").unwrap();
        assert_eq!(doc.name, "/Front Page", "{scheme}");
        assert_eq!(doc.content, "welcome!", "{scheme}");
    }
}

#[test]
fn every_backend_agrees_on_descendant_listing() {
    let dir = tempfile::tempdir().unwrap();
    for (scheme, store) in backends(dir.path()) {
        store.update("/a/b", "x").unwrap();
        store.update("/a/b/c", "x").unwrap();
        store.update("/ab", "x").unwrap();
        store.update("/a/a", "x").unwrap();

        let listed = store.get_descendants("/a").unwrap();
        assert_eq!(listed, vec!["/a/a", "/a/b", "/a/b/c"], "{scheme}");
    }
}

#[test]
fn every_backend_rejects_invalid_names() {
    let dir = tempfile::tempdir().unwrap();
    for (scheme, store) in backends(dir.path()) {
        let err = store.update("no/leading/slash", "x").unwrap_err();
        assert!(err.is_invalid_name(), "{scheme}: {err}");
    }
}

#[test]
fn unknown_schemes_are_rejected() {
    register_builtin_stores();
    match new_store("carrier-pigeon:coop") {
        Err(Error::UnknownScheme { scheme }) => assert_eq!(scheme, "carrier-pigeon"),
        Err(other) => panic!("expected UnknownScheme, got {other}"),
        Ok(_) => panic!("expected UnknownScheme, got a store"),
    }
}

#[test]
fn malformed_uris_are_rejected() {
    register_builtin_stores();
    assert!(matches!(new_store("not a uri"), Err(Error::Uri { .. })));
}
