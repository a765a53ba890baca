use docweave::{
    application::store::{StoreError, SymbolStore},
    domain::{
        comment::Comment,
        symbols::{SymbolAttrs, SymbolKind, TypeToken},
    },
    infra::records::JsonRecordStore,
};
use tempfile::tempdir;

fn open(dir: &std::path::Path) -> SymbolStore {
    SymbolStore::setup(Box::new(JsonRecordStore::new(dir)), Vec::new()).expect("store opens")
}

fn button_attrs() -> SymbolAttrs {
    SymbolAttrs {
        display_name: Some("GtkButton".to_string()),
        filename: Some("gtkbutton.h".to_string()),
        lineno: Some(42),
        type_tokens: vec![TypeToken::text("struct "), TypeToken::link("GtkWidget")],
        hierarchy: vec!["GObject".to_string(), "GtkWidget".to_string()],
        aliases: vec!["Button".to_string()],
        ..SymbolAttrs::named("GtkButton")
    }
}

#[test]
fn persisted_symbols_survive_a_reopen() {
    let dir = tempdir().expect("store dir");

    let mut store = open(dir.path());
    assert!(!store.is_incremental());
    store
        .add_comment(Comment {
            name: "GtkButton".to_string(),
            description: "A clickable widget.".to_string(),
            ..Comment::default()
        })
        .expect("comment");
    store
        .get_or_create_symbol(SymbolKind::Class, button_attrs())
        .expect("symbol");
    store.persist().expect("persisted");
    store.finalize().expect("finalized");

    let mut reopened = open(dir.path());
    assert!(reopened.is_incremental());

    let id = reopened
        .get_symbol("GtkButton")
        .expect("lookup")
        .expect("symbol was persisted");
    let symbol = reopened.symbol(id);
    assert_eq!(symbol.kind, SymbolKind::Class);
    assert_eq!(symbol.attrs, button_attrs());
    assert_eq!(
        reopened.symbol_comment(id).description,
        "A clickable widget."
    );
}

#[test]
fn aliases_resolve_after_a_reopen() {
    let dir = tempdir().expect("store dir");
    let mut store = open(dir.path());
    store
        .get_or_create_symbol(SymbolKind::Class, button_attrs())
        .expect("symbol");
    store.persist().expect("persisted");
    store.finalize().expect("finalized");

    let mut reopened = open(dir.path());
    let by_alias = reopened.get_symbol("Button").expect("lookup");
    let by_name = reopened.get_symbol("GtkButton").expect("lookup");

    assert!(by_alias.is_some());
    assert_eq!(by_alias, by_name);
    assert!(reopened.get_comment("Button").expect("lookup").is_some());
}

#[test]
fn flushed_but_uncommitted_records_are_not_durable() {
    let dir = tempdir().expect("store dir");
    let mut store = open(dir.path());
    store
        .get_or_create_symbol(SymbolKind::Class, button_attrs())
        .expect("symbol");
    store.flush().expect("flushed");
    store.finalize().expect("finalized");

    let mut reopened = open(dir.path());
    assert!(!reopened.is_incremental());
    assert_eq!(reopened.get_symbol("GtkButton").expect("lookup"), None);
}

#[test]
fn finalize_is_idempotent_and_persist_after_it_is_ignored() {
    let dir = tempdir().expect("store dir");
    let mut store = open(dir.path());
    store.finalize().expect("finalized");
    store.finalize().expect("second finalize is a no-op");
    store.persist().expect("persist after finalize is ignored");
}

#[test]
fn a_corrupt_snapshot_makes_the_store_unavailable() {
    let dir = tempdir().expect("store dir");
    let path = JsonRecordStore::new(dir.path()).snapshot_path();
    std::fs::write(&path, "{ truncated").expect("write");

    let err = SymbolStore::setup(Box::new(JsonRecordStore::new(dir.path())), Vec::new())
        .expect_err("corrupt snapshot");
    assert!(matches!(err, StoreError::Unavailable(_)));
}
