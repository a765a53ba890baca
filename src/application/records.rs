//! Record store traits describing persistence adapters for the symbol store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::{
    comment::Comment,
    links::Link,
    symbols::{SymbolAttrs, SymbolKind},
};

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("record store at `{location}` is unavailable: {reason}")]
    Unavailable { location: String, reason: String },
    #[error("record store is corrupt: {reason}")]
    Corrupt { reason: String },
    #[error("record store is closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordStoreError {
    pub fn unavailable(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn corrupt(reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            reason: reason.to_string(),
        }
    }
}

/// Persisted form of a symbol, keyed by `unique_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub unique_name: String,
    pub kind: SymbolKind,
    pub attrs: SymbolAttrs,
    /// Name of the comment record this symbol owns.
    pub comment: String,
    pub link: Option<Link>,
    pub fingerprint: String,
}

impl SymbolRecord {
    /// SHA-256 over the kind, attributes, comment and link, hex encoded.
    pub fn fingerprint_of(
        kind: SymbolKind,
        attrs: &SymbolAttrs,
        comment: &Comment,
        link: Option<&Link>,
    ) -> Result<String, RecordStoreError> {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(serde_json::to_vec(attrs).map_err(RecordStoreError::corrupt)?);
        hasher.update([0]);
        hasher.update(serde_json::to_vec(comment).map_err(RecordStoreError::corrupt)?);
        hasher.update([0]);
        hasher.update(serde_json::to_vec(&link).map_err(RecordStoreError::corrupt)?);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Writes accumulated since the last flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    pub symbols: Vec<SymbolRecord>,
    pub comments: Vec<Comment>,
    pub aliases: Vec<(String, String)>,
}

impl RecordBatch {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.comments.is_empty() && self.aliases.is_empty()
    }
}

/// Logical contract of the backing store.
///
/// `stage` makes a batch visible to later loads without making it durable;
/// `commit` makes everything staged durable; `close` releases resources.
pub trait RecordStore {
    /// Whether a previous run left a durable checkpoint behind.
    fn has_checkpoint(&self) -> bool;

    fn open(&mut self) -> Result<(), RecordStoreError>;

    fn load_symbol(&self, unique_name: &str) -> Result<Option<SymbolRecord>, RecordStoreError>;

    fn load_comment(&self, name: &str) -> Result<Option<Comment>, RecordStoreError>;

    /// Resolve an alias to the unique name it stands for.
    fn load_alias(&self, alias: &str) -> Result<Option<String>, RecordStoreError>;

    fn stage(&mut self, batch: RecordBatch) -> Result<(), RecordStoreError>;

    fn commit(&mut self) -> Result<(), RecordStoreError>;

    fn close(&mut self) -> Result<(), RecordStoreError>;
}
