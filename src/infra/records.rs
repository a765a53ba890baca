//! Record store engines backing the symbol store.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use crate::{
    application::records::{RecordBatch, RecordStore, RecordStoreError, SymbolRecord},
    domain::comment::Comment,
};

const SNAPSHOT_FILE: &str = "docweave-store.json";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    version: u32,
    persisted_at: Option<String>,
    symbols: BTreeMap<String, SymbolRecord>,
    comments: BTreeMap<String, Comment>,
    aliases: BTreeMap<String, String>,
}

impl Snapshot {
    fn apply(&mut self, batch: RecordBatch) {
        for record in batch.symbols {
            self.symbols.insert(record.unique_name.clone(), record);
        }
        for comment in batch.comments {
            self.comments.insert(comment.name.clone(), comment);
        }
        self.aliases.extend(batch.aliases);
    }

    fn merge(&mut self, staged: Snapshot) {
        self.symbols.extend(staged.symbols);
        self.comments.extend(staged.comments);
        self.aliases.extend(staged.aliases);
    }
}

/// Two-layer view: staged writes shadow the committed snapshot.
#[derive(Debug, Default)]
struct Layers {
    committed: Snapshot,
    staged: Snapshot,
}

impl Layers {
    fn symbol(&self, unique_name: &str) -> Option<SymbolRecord> {
        self.staged
            .symbols
            .get(unique_name)
            .or_else(|| self.committed.symbols.get(unique_name))
            .cloned()
    }

    fn comment(&self, name: &str) -> Option<Comment> {
        self.staged
            .comments
            .get(name)
            .or_else(|| self.committed.comments.get(name))
            .cloned()
    }

    fn alias(&self, alias: &str) -> Option<String> {
        self.staged
            .aliases
            .get(alias)
            .or_else(|| self.committed.aliases.get(alias))
            .cloned()
    }

    fn promote(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        self.committed.merge(staged);
    }
}

/// Process-local engine. Clones share the same records, which lets a test
/// simulate a second run against the checkpoint of the first.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Rc<RefCell<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    layers: Layers,
    checkpointed: bool,
    open: bool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), RecordStoreError> {
        if self.inner.borrow().open {
            Ok(())
        } else {
            Err(RecordStoreError::Closed)
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn has_checkpoint(&self) -> bool {
        self.inner.borrow().checkpointed
    }

    fn open(&mut self) -> Result<(), RecordStoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.layers.staged = Snapshot::default();
        inner.open = true;
        Ok(())
    }

    fn load_symbol(&self, unique_name: &str) -> Result<Option<SymbolRecord>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.inner.borrow().layers.symbol(unique_name))
    }

    fn load_comment(&self, name: &str) -> Result<Option<Comment>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.inner.borrow().layers.comment(name))
    }

    fn load_alias(&self, alias: &str) -> Result<Option<String>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.inner.borrow().layers.alias(alias))
    }

    fn stage(&mut self, batch: RecordBatch) -> Result<(), RecordStoreError> {
        self.ensure_open()?;
        self.inner.borrow_mut().layers.staged.apply(batch);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RecordStoreError> {
        self.ensure_open()?;
        let mut inner = self.inner.borrow_mut();
        inner.layers.promote();
        inner.checkpointed = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordStoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.layers.staged = Snapshot::default();
        inner.open = false;
        Ok(())
    }
}

/// Durable engine: a single JSON snapshot inside the store directory,
/// replaced atomically on every commit.
#[derive(Debug)]
pub struct JsonRecordStore {
    root: PathBuf,
    layers: Layers,
    checkpointed: bool,
    open: bool,
}

impl JsonRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layers: Layers::default(),
            checkpointed: false,
            open: false,
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    fn ensure_open(&self) -> Result<(), RecordStoreError> {
        if self.open {
            Ok(())
        } else {
            Err(RecordStoreError::Closed)
        }
    }

    fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, RecordStoreError> {
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(path)?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(RecordStoreError::corrupt)?;

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                path = %path.display(),
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "discarding store snapshot with unsupported version"
            );
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    fn write_snapshot(&self) -> Result<(), RecordStoreError> {
        let mut snapshot = self.layers.committed.clone();
        snapshot.version = SNAPSHOT_VERSION;
        snapshot.persisted_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();

        let file = NamedTempFile::new_in(&self.root)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot).map_err(RecordStoreError::corrupt)?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|err| RecordStoreError::Io(err.into_error()))?;
        file.persist(self.snapshot_path())
            .map_err(|err| RecordStoreError::Io(err.error))?;
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn has_checkpoint(&self) -> bool {
        self.checkpointed
    }

    fn open(&mut self) -> Result<(), RecordStoreError> {
        fs::create_dir_all(&self.root).map_err(|err| {
            RecordStoreError::unavailable(self.root.display().to_string(), err)
        })?;

        let path = self.snapshot_path();
        let snapshot = Self::read_snapshot(&path)
            .map_err(|err| RecordStoreError::unavailable(path.display().to_string(), err))?;

        self.checkpointed = snapshot.is_some();
        self.layers = Layers {
            committed: snapshot.unwrap_or_default(),
            staged: Snapshot::default(),
        };
        self.open = true;
        debug!(
            path = %path.display(),
            checkpointed = self.checkpointed,
            symbols = self.layers.committed.symbols.len(),
            "opened json record store"
        );
        Ok(())
    }

    fn load_symbol(&self, unique_name: &str) -> Result<Option<SymbolRecord>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.layers.symbol(unique_name))
    }

    fn load_comment(&self, name: &str) -> Result<Option<Comment>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.layers.comment(name))
    }

    fn load_alias(&self, alias: &str) -> Result<Option<String>, RecordStoreError> {
        self.ensure_open()?;
        Ok(self.layers.alias(alias))
    }

    fn stage(&mut self, batch: RecordBatch) -> Result<(), RecordStoreError> {
        self.ensure_open()?;
        self.layers.staged.apply(batch);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RecordStoreError> {
        self.ensure_open()?;
        self.layers.promote();
        self.write_snapshot()?;
        self.checkpointed = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordStoreError> {
        self.layers = Layers::default();
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::symbols::{SymbolAttrs, SymbolKind};

    fn record(name: &str) -> SymbolRecord {
        SymbolRecord {
            unique_name: name.to_string(),
            kind: SymbolKind::Function,
            attrs: SymbolAttrs::named(name),
            comment: name.to_string(),
            link: None,
            fingerprint: "abc".to_string(),
        }
    }

    #[test]
    fn staged_records_are_visible_before_commit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonRecordStore::new(dir.path());
        store.open().expect("open");

        store
            .stage(RecordBatch {
                symbols: vec![record("f")],
                ..RecordBatch::default()
            })
            .expect("stage");

        assert!(store.load_symbol("f").expect("load").is_some());
        assert!(!store.snapshot_path().exists());
    }

    #[test]
    fn commit_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut store = JsonRecordStore::new(dir.path());
            store.open().expect("open");
            assert!(!store.has_checkpoint());
            store
                .stage(RecordBatch {
                    symbols: vec![record("f")],
                    comments: vec![Comment::empty("f")],
                    aliases: vec![("g".to_string(), "f".to_string())],
                })
                .expect("stage");
            store.commit().expect("commit");
            store.close().expect("close");
        }

        let mut store = JsonRecordStore::new(dir.path());
        store.open().expect("reopen");
        assert!(store.has_checkpoint());
        assert_eq!(store.load_symbol("f").expect("load"), Some(record("f")));
        assert_eq!(store.load_alias("g").expect("alias").as_deref(), Some("f"));
    }

    #[test]
    fn corrupt_snapshot_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(SNAPSHOT_FILE), b"{ not json").expect("write");

        let mut store = JsonRecordStore::new(dir.path());
        let err = store.open().expect_err("corrupt");
        assert!(matches!(err, RecordStoreError::Unavailable { .. }));
    }

    #[test]
    fn closed_store_rejects_reads() {
        let mut store = MemoryRecordStore::new();
        store.open().expect("open");
        store.close().expect("close");
        assert!(matches!(
            store.load_symbol("f"),
            Err(RecordStoreError::Closed)
        ));
    }
}
