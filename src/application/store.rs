//! Symbol store: the identity source of truth for symbols and comments.
//!
//! Entities live in arenas and are addressed by handles, so every caller that
//! asks for the same `unique_name` during a process lifetime receives the same
//! [`SymbolId`]. A pluggable [`RecordStore`] backs the arenas across runs; when
//! it already holds a checkpoint the store runs in incremental mode and
//! rehydrates entities lazily instead of rebuilding them.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    application::{
        diagnostics::DiagnosticCode,
        observers::{StoreEvent, StoreObserver},
        records::{RecordBatch, RecordStore, RecordStoreError, SymbolRecord},
    },
    domain::{
        comment::{Comment, CommentId},
        error::DomainError,
        links::{Link, LinkId},
        symbols::{Symbol, SymbolAttrs, SymbolId, SymbolKind},
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("symbol store unavailable: {0}")]
    Unavailable(#[source] RecordStoreError),
    #[error("symbol `{name}` registered as {existing} and as {incoming} in the same run")]
    KindCollision {
        name: String,
        existing: SymbolKind,
        incoming: SymbolKind,
    },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Record(#[from] RecordStoreError),
}

impl StoreError {
    pub fn code(&self) -> Option<DiagnosticCode> {
        match self {
            StoreError::Unavailable(_) => Some(DiagnosticCode::STORE_UNAVAILABLE),
            StoreError::KindCollision { .. } => Some(DiagnosticCode::KIND_COLLISION),
            StoreError::Domain(_) | StoreError::Record(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Open,
    Finalized,
}

pub struct SymbolStore {
    backend: Box<dyn RecordStore>,
    state: StoreState,
    incremental: bool,
    symbols: Vec<Symbol>,
    comments: Vec<Comment>,
    links: Vec<Link>,
    symbol_index: HashMap<String, SymbolId>,
    comment_index: HashMap<String, CommentId>,
    aliases: HashMap<String, String>,
    /// Symbols passed through `get_or_create_symbol` during this run.
    touched: HashSet<SymbolId>,
    /// Fingerprints as last staged or loaded, used to skip unchanged records.
    fingerprints: HashMap<SymbolId, String>,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl std::fmt::Debug for SymbolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolStore")
            .field("state", &self.state)
            .field("incremental", &self.incremental)
            .field("symbols", &self.symbols.len())
            .field("comments", &self.comments.len())
            .field("links", &self.links.len())
            .finish_non_exhaustive()
    }
}

impl SymbolStore {
    /// Open the backing store. Incremental mode is enabled when it already
    /// holds a checkpoint; an unavailable backend aborts the run.
    pub fn setup(
        mut backend: Box<dyn RecordStore>,
        observers: Vec<Box<dyn StoreObserver>>,
    ) -> Result<Self, StoreError> {
        backend.open().map_err(StoreError::Unavailable)?;
        let incremental = backend.has_checkpoint();
        info!(incremental, "symbol store ready");

        Ok(Self {
            backend,
            state: StoreState::Open,
            incremental,
            symbols: Vec::new(),
            comments: Vec::new(),
            links: Vec::new(),
            symbol_index: HashMap::new(),
            comment_index: HashMap::new(),
            aliases: HashMap::new(),
            touched: HashSet::new(),
            fingerprints: HashMap::new(),
            observers,
        })
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Register a comment under its name.
    ///
    /// In incremental mode a symbol carrying the same name has its existing
    /// comment overwritten in place.
    pub fn add_comment(&mut self, comment: Comment) -> Result<CommentId, StoreError> {
        let name = comment.name.clone();

        if !self.incremental {
            let id = self.register_comment(comment);
            self.emit(StoreEvent::CommentAdded { name });
            return Ok(id);
        }

        let id = match self.get_symbol(&name)? {
            Some(symbol) => {
                let id = self.symbols[symbol.0].comment;
                self.comments[id.0].update_from(comment);
                self.comment_index.insert(name.clone(), id);
                id
            }
            None => self.register_comment(comment),
        };
        self.emit(StoreEvent::CommentUpdated { name });
        Ok(id)
    }

    /// The registered comment of that name, else the comment owned by the
    /// symbol of that name.
    pub fn get_comment(&mut self, name: &str) -> Result<Option<&Comment>, StoreError> {
        if let Some(&id) = self.comment_index.get(name) {
            return Ok(Some(&self.comments[id.0]));
        }

        if let Some(symbol) = self.get_symbol(name)? {
            let id = self.symbols[symbol.0].comment;
            return Ok(Some(&self.comments[id.0]));
        }

        if self.incremental
            && let Some(comment) = self.backend.load_comment(name)?
        {
            let id = self.register_comment(comment);
            return Ok(Some(&self.comments[id.0]));
        }

        Ok(None)
    }

    /// Return the symbol for `attrs`' identity, creating it when unknown.
    ///
    /// Existing symbols are mutated in place so their handle stays valid. A
    /// second registration under a different kind within the same run is a
    /// [`StoreError::KindCollision`].
    pub fn get_or_create_symbol(
        &mut self,
        kind: SymbolKind,
        mut attrs: SymbolAttrs,
    ) -> Result<SymbolId, StoreError> {
        let unique_name = attrs.identity()?.to_string();
        attrs.unique_name = Some(unique_name.clone());

        let existing = match self.symbol_index.get(&unique_name) {
            Some(&id) => Some(id),
            None if self.incremental => self.load_symbol(&unique_name)?,
            None => None,
        };

        let id = match existing {
            Some(id) => {
                let symbol = &mut self.symbols[id.0];
                if symbol.kind != kind && self.touched.contains(&id) {
                    return Err(StoreError::KindCollision {
                        name: unique_name,
                        existing: symbol.kind,
                        incoming: kind,
                    });
                }
                symbol.kind = kind;
                symbol.attrs = attrs;
                id
            }
            None => {
                let comment = match self.comment_index.get(&unique_name) {
                    Some(&comment) => comment,
                    None => self.register_comment(Comment::empty(unique_name.clone())),
                };
                let id = SymbolId(self.symbols.len());
                self.symbols.push(Symbol {
                    unique_name: unique_name.clone(),
                    kind,
                    comment,
                    link: None,
                    attrs,
                    skip: false,
                    formatted_doc: None,
                    detailed_description: None,
                });
                self.symbol_index.insert(unique_name.clone(), id);
                id
            }
        };

        self.touched.insert(id);
        self.index_aliases(id);

        if self.incremental {
            self.emit(StoreEvent::SymbolUpdated { unique_name });
        }

        Ok(id)
    }

    /// Memory-first lookup falling back to the backing store; hits are
    /// cached for constant-time access afterwards. Aliases resolve to the
    /// symbol they name.
    pub fn get_symbol(&mut self, name: &str) -> Result<Option<SymbolId>, StoreError> {
        if let Some(&id) = self.symbol_index.get(name) {
            return Ok(Some(id));
        }

        if let Some(target) = self.aliases.get(name).cloned() {
            if let Some(&id) = self.symbol_index.get(&target) {
                return Ok(Some(id));
            }
            if self.incremental {
                return self.load_symbol(&target);
            }
            return Ok(None);
        }

        if !self.incremental {
            return Ok(None);
        }

        if let Some(id) = self.load_symbol(name)? {
            return Ok(Some(id));
        }

        match self.backend.load_alias(name)? {
            Some(target) => {
                self.aliases.insert(name.to_string(), target.clone());
                match self.symbol_index.get(&target) {
                    Some(&id) => Ok(Some(id)),
                    None => self.load_symbol(&target),
                }
            }
            None => Ok(None),
        }
    }

    /// Lookup restricted to symbols already in memory.
    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_index.get(name).copied().or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.symbol_index.get(target).copied())
        })
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn comment(&self, id: CommentId) -> &Comment {
        &self.comments[id.0]
    }

    pub fn comment_mut(&mut self, id: CommentId) -> &mut Comment {
        &mut self.comments[id.0]
    }

    /// Comment owned by a symbol.
    pub fn symbol_comment(&self, id: SymbolId) -> &Comment {
        self.comment(self.symbol(id).comment)
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0]
    }

    /// Allocate a link in the arena.
    pub fn add_link(&mut self, link: Link) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(link);
        id
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Hand each child the matching slice of its parent's comment:
    /// parameters take `params[name]`, return items the `returns` tag, and
    /// fields `params[name]` unless they already carry documentation.
    pub fn update_children_comments(&mut self, id: SymbolId) -> Result<(), StoreError> {
        let parent = self.symbol_comment(id).clone();
        let children = self.symbols[id.0].attrs.children.clone();

        for child_name in children {
            let Some(child) = self.get_symbol(&child_name)? else {
                continue;
            };
            let (kind, key, comment) = {
                let symbol = &self.symbols[child.0];
                (symbol.kind, symbol.display_name().to_string(), symbol.comment)
            };
            let target = &mut self.comments[comment.0];

            match kind {
                SymbolKind::Parameter => {
                    target.description = parent.params.get(&key).cloned().unwrap_or_default();
                }
                SymbolKind::ReturnItem => {
                    target.description = parent.returns().unwrap_or_default().to_string();
                }
                SymbolKind::Field if target.is_empty() => {
                    if let Some(text) = parent.params.get(&key) {
                        target.description = text.clone();
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Make pending writes visible to later reads without committing them.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.state != StoreState::Open {
            debug!(state = ?self.state, "flush ignored");
            return Ok(());
        }

        let (batch, staged) = self.pending_batch()?;
        if batch.is_empty() {
            return Ok(());
        }

        debug!(
            symbols = batch.symbols.len(),
            comments = batch.comments.len(),
            "staging store records"
        );
        self.backend.stage(batch)?;
        self.fingerprints.extend(staged);
        Ok(())
    }

    /// Stage and durably commit everything known to the store.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        if self.state != StoreState::Open {
            debug!(state = ?self.state, "persist ignored");
            return Ok(());
        }

        self.flush()?;
        self.backend.commit()?;
        info!(symbols = self.symbols.len(), "symbol store persisted");
        Ok(())
    }

    /// Release the backing store. Repeated calls are no-ops.
    pub fn finalize(&mut self) -> Result<(), StoreError> {
        if self.state == StoreState::Finalized {
            debug!("finalize ignored");
            return Ok(());
        }

        self.backend.close()?;
        self.state = StoreState::Finalized;
        Ok(())
    }

    fn register_comment(&mut self, comment: Comment) -> CommentId {
        if let Some(&id) = self.comment_index.get(&comment.name) {
            self.comments[id.0].update_from(comment);
            return id;
        }

        let id = CommentId(self.comments.len());
        self.comment_index.insert(comment.name.clone(), id);
        self.comments.push(comment);
        id
    }

    fn load_symbol(&mut self, unique_name: &str) -> Result<Option<SymbolId>, StoreError> {
        let Some(record) = self.backend.load_symbol(unique_name)? else {
            return Ok(None);
        };

        let comment = match self.comment_index.get(&record.comment) {
            Some(&id) => id,
            None => {
                let loaded = self
                    .backend
                    .load_comment(&record.comment)?
                    .unwrap_or_else(|| Comment::empty(record.comment.clone()));
                self.register_comment(loaded)
            }
        };
        let link = record.link.map(|link| self.add_link(link));

        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            unique_name: record.unique_name.clone(),
            kind: record.kind,
            comment,
            link,
            attrs: record.attrs,
            skip: false,
            formatted_doc: None,
            detailed_description: None,
        });
        self.symbol_index.insert(record.unique_name, id);
        self.fingerprints.insert(id, record.fingerprint);
        self.index_aliases(id);

        debug!(unique_name, "rehydrated symbol from backing store");
        Ok(Some(id))
    }

    fn index_aliases(&mut self, id: SymbolId) {
        let symbol = &self.symbols[id.0];
        for alias in &symbol.attrs.aliases {
            self.aliases
                .insert(alias.clone(), symbol.unique_name.clone());
        }
    }

    fn pending_batch(&self) -> Result<(RecordBatch, Vec<(SymbolId, String)>), StoreError> {
        let mut batch = RecordBatch::default();
        let mut staged = Vec::new();

        for (index, symbol) in self.symbols.iter().enumerate() {
            let id = SymbolId(index);
            let comment = self.comment(symbol.comment);
            let link = symbol.link.map(|link| self.link(link).clone());
            let fingerprint =
                SymbolRecord::fingerprint_of(symbol.kind, &symbol.attrs, comment, link.as_ref())?;

            if self.fingerprints.get(&id) == Some(&fingerprint) {
                continue;
            }

            batch.comments.push(comment.clone());
            for alias in &symbol.attrs.aliases {
                batch
                    .aliases
                    .push((alias.clone(), symbol.unique_name.clone()));
            }
            batch.symbols.push(SymbolRecord {
                unique_name: symbol.unique_name.clone(),
                kind: symbol.kind,
                attrs: symbol.attrs.clone(),
                comment: comment.name.clone(),
                link,
                fingerprint: fingerprint.clone(),
            });
            staged.push((id, fingerprint));
        }

        Ok((batch, staged))
    }

    fn emit(&mut self, event: StoreEvent) {
        for observer in self.observers.iter_mut() {
            observer.notify(&event);
        }
    }
}
