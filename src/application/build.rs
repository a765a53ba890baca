//! One documentation build: ingest a manifest, resolve every page's links,
//! render each page and hand the markup to a [`PageWriter`].
//!
//! All pages are resolved before the first one renders, so cross-page
//! references see their final destinations regardless of page order.

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        diagnostics::{Diagnostic, DiagnosticCode, DiagnosticError, DiagnosticSink},
        links::{LinkResolver, PageRelativizer},
        render::{
            Formatter, PostProcessOptions, RenderContext, RenderError, post_process,
            validate_images,
        },
        store::{StoreError, SymbolStore},
    },
    domain::{
        comment::Comment,
        error::DomainError,
        links::Link,
        pages::Page,
        symbols::{SymbolAttrs, SymbolId, SymbolKind, TypeToken},
    },
};

/// Everything an extractor hands to a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub comments: Vec<Comment>,
    pub symbols: Vec<ManifestSymbol>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSymbol {
    pub kind: SymbolKind,
    /// Name of a comment to adopt when it differs from the symbol's own.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub attrs: SymbolAttrs,
}

impl ManifestSymbol {
    pub fn new(kind: SymbolKind, attrs: SymbolAttrs) -> Self {
        Self {
            kind,
            comment: None,
            attrs,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid page: {0}")]
    Page(#[source] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),
    #[error("failed to write page `{reference}`: {source}")]
    Output {
        reference: String,
        #[source]
        source: io::Error,
    },
}

/// Destination of rendered pages.
pub trait PageWriter {
    /// Write `markup` to `reference`, a path relative to the output root,
    /// and return where it landed.
    fn write_page(&mut self, reference: &str, markup: &str) -> io::Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub source_file: String,
    pub reference: String,
    pub path: PathBuf,
    /// Diagnostics reported while this page rendered.
    pub diagnostics: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: Vec<PageReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub incremental: bool,
}

pub struct DocBuild {
    store: SymbolStore,
    resolver: LinkResolver,
    formatter: Formatter,
    diagnostics: DiagnosticSink,
    writer: Box<dyn PageWriter>,
    post: PostProcessOptions,
}

impl DocBuild {
    pub fn new(
        store: SymbolStore,
        resolver: LinkResolver,
        formatter: Formatter,
        diagnostics: DiagnosticSink,
        writer: Box<dyn PageWriter>,
    ) -> Self {
        Self {
            store,
            resolver,
            formatter,
            diagnostics,
            writer,
            post: PostProcessOptions::default(),
        }
    }

    pub fn with_post_processing(mut self, options: PostProcessOptions) -> Self {
        self.post = options;
        self
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// Run the build to completion. The store is finalized on every path;
    /// it is only persisted when every page rendered.
    #[instrument(skip_all, fields(pages = manifest.pages.len()))]
    pub fn run(&mut self, manifest: Manifest) -> Result<BuildReport, BuildError> {
        let outcome = self.execute(manifest);
        let finalized = self.store.finalize();
        let report = outcome?;
        finalized?;

        info!(
            pages = report.pages.len(),
            diagnostics = report.diagnostics.len(),
            incremental = report.incremental,
            "build finished"
        );
        Ok(report)
    }

    fn execute(&mut self, manifest: Manifest) -> Result<BuildReport, BuildError> {
        let Manifest {
            comments,
            symbols,
            pages,
        } = manifest;

        self.ingest(comments, symbols)?;

        let mut resolved = Vec::with_capacity(pages.len());
        for page in pages {
            page.validate().map_err(BuildError::Page)?;
            let symbols = self.resolve_page(&page)?;
            resolved.push((page, symbols));
        }
        self.store.flush()?;

        let mut reports = Vec::with_capacity(resolved.len());
        for (mut page, symbols) in resolved {
            reports.push(self.render_page(&mut page, &symbols)?);
        }

        self.store.persist()?;

        Ok(BuildReport {
            pages: reports,
            diagnostics: self.diagnostics.journal().to_vec(),
            incremental: self.store.is_incremental(),
        })
    }

    fn ingest(
        &mut self,
        comments: Vec<Comment>,
        symbols: Vec<ManifestSymbol>,
    ) -> Result<(), BuildError> {
        let (comment_count, symbol_count) = (comments.len(), symbols.len());

        for comment in comments {
            self.store.add_comment(comment)?;
        }

        for entry in symbols {
            let ManifestSymbol {
                kind,
                comment,
                attrs,
            } = entry;

            let id = match self.store.get_or_create_symbol(kind, attrs) {
                Ok(id) => id,
                Err(err) => return Err(self.store_failure(err)),
            };
            self.store.symbol_mut(id).reset_render_state();

            let own_name = self.store.symbol(id).unique_name.clone();
            if let Some(name) = comment.filter(|name| *name != own_name) {
                self.adopt_comment(id, &name)?;
            }
        }

        info!(
            comments = comment_count,
            symbols = symbol_count,
            "manifest ingested"
        );
        Ok(())
    }

    fn adopt_comment(&mut self, id: SymbolId, name: &str) -> Result<(), BuildError> {
        let Some(source) = self.store.get_comment(name)?.cloned() else {
            debug!(comment = name, "named comment not found");
            return Ok(());
        };
        let target = self.store.symbol(id).comment;
        self.store.comment_mut(target).update_from(source);
        Ok(())
    }

    /// Journal a store failure carrying a code before propagating it.
    fn store_failure(&mut self, err: StoreError) -> BuildError {
        if let Some(code) = err.code()
            && let Err(fatal) = self.diagnostics.report(Diagnostic::new(code, err.to_string()))
        {
            debug!(error = %fatal, "store failure journaled");
        }
        BuildError::Store(err)
    }

    /// Register the page link and a link for every symbol the page shows.
    fn resolve_page(&mut self, page: &Page) -> Result<Vec<SymbolId>, BuildError> {
        let reference = page.reference();
        self.resolver.upsert(
            &mut self.store,
            Link::new(
                page.link_id(),
                Some(reference.clone()),
                Some(page.display_title()),
            ),
            true,
        )?;

        let mut listed = Vec::with_capacity(page.symbols.len());
        for name in &page.symbols {
            let Some(id) = self.store.get_symbol(name)? else {
                warn!(page = %page.source_file, symbol = %name, "page lists an unknown symbol");
                self.diagnostics.report(
                    Diagnostic::new(
                        DiagnosticCode::UNKNOWN_SYMBOL,
                        format!("page lists unknown symbol `{name}`"),
                    )
                    .in_file(page.source_file.clone()),
                )?;
                continue;
            };
            self.link_symbol_tree(id, &reference)?;
            listed.push(id);
        }
        Ok(listed)
    }

    fn link_symbol_tree(&mut self, root: SymbolId, reference: &str) -> Result<(), BuildError> {
        let mut pending = vec![root];
        let mut seen = HashSet::new();

        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            self.store.update_children_comments(id)?;

            let (name, title, targets, children) = {
                let symbol = self.store.symbol(id);
                let targets: Vec<String> = symbol
                    .attrs
                    .type_tokens
                    .iter()
                    .filter_map(|token| match token {
                        TypeToken::Link { id } => Some(id.clone()),
                        TypeToken::Text { .. } => None,
                    })
                    .collect();
                (
                    symbol.unique_name.clone(),
                    symbol.display_name().to_string(),
                    targets,
                    symbol.children().to_vec(),
                )
            };

            let link = self.resolver.upsert(
                &mut self.store,
                Link::new(name.clone(), Some(format!("{reference}#{name}")), Some(title)),
                true,
            )?;
            self.store.symbol_mut(id).link = Some(link);

            for target in targets {
                self.resolver
                    .upsert(&mut self.store, Link::new(target, None, None), false)?;
            }

            for child in children {
                if let Some(child) = self.store.get_symbol(&child)? {
                    pending.push(child);
                }
            }
        }
        Ok(())
    }

    /// Forget markup left by an earlier page. Links inside it were made
    /// relative to that page's location.
    fn clear_render_state(&mut self, roots: &[SymbolId]) {
        let mut pending = roots.to_vec();
        let mut seen = HashSet::new();

        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            self.store.symbol_mut(id).reset_render_state();
            let children = self.store.symbol(id).children().to_vec();
            pending.extend(
                children
                    .iter()
                    .filter_map(|child| self.store.find_symbol(child)),
            );
        }
    }

    fn render_page(
        &mut self,
        page: &mut Page,
        symbols: &[SymbolId],
    ) -> Result<PageReport, BuildError> {
        let reference = page.reference();
        self.diagnostics.checkpoint();
        self.resolver
            .set_relativizer(Some(Box::new(PageRelativizer::new(&reference))));

        let result = self.render_page_inner(page, symbols, &reference);
        self.resolver.set_relativizer(None);
        result
    }

    fn render_page_inner(
        &mut self,
        page: &mut Page,
        symbols: &[SymbolId],
        reference: &str,
    ) -> Result<PageReport, BuildError> {
        self.clear_render_state(symbols);
        let mut cx = RenderContext {
            store: &mut self.store,
            resolver: &mut self.resolver,
            diagnostics: &mut self.diagnostics,
        };

        for &id in symbols {
            self.formatter.format_symbol(&mut cx, id)?;
        }
        let rendered = self.formatter.format_page(&mut cx, page, symbols)?;
        let processed = post_process(
            &rendered.markup,
            &page.source_file,
            self.post,
            cx.diagnostics,
        )?;

        let path = self
            .writer
            .write_page(reference, &processed.html)
            .map_err(|source| BuildError::Output {
                reference: reference.to_string(),
                source,
            })?;
        page.detailed_description = Some(processed.html);

        validate_images(
            &processed.images,
            &path,
            &page.source_file,
            &mut self.diagnostics,
        )?;
        self.formatter.notify_page_written(page, &path);
        counter!("docweave_pages_written_total").increment(1);

        info!(page = %page.source_file, path = %path.display(), "page written");
        Ok(PageReport {
            source_file: page.source_file.clone(),
            reference: reference.to_string(),
            path,
            diagnostics: self.diagnostics.since_checkpoint().len(),
        })
    }
}

impl std::fmt::Debug for DocBuild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocBuild")
            .field("formatter", &self.formatter)
            .field("post", &self.post)
            .finish_non_exhaustive()
    }
}

/// Writes pages into memory. Useful when the caller wants the markup
/// rather than files.
#[derive(Debug, Clone, Default)]
pub struct MemoryPageWriter {
    pages: std::rc::Rc<std::cell::RefCell<Vec<(String, String)>>>,
}

impl MemoryPageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages written so far as `(reference, markup)`, in write order.
    pub fn pages(&self) -> Vec<(String, String)> {
        self.pages.borrow().clone()
    }

    pub fn page(&self, reference: &str) -> Option<String> {
        self.pages
            .borrow()
            .iter()
            .find(|(written, _)| written == reference)
            .map(|(_, markup)| markup.clone())
    }
}

impl PageWriter for MemoryPageWriter {
    fn write_page(&mut self, reference: &str, markup: &str) -> io::Result<PathBuf> {
        self.pages
            .borrow_mut()
            .push((reference.to_string(), markup.to_string()));
        Ok(Path::new(reference).to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::{
            diagnostics::{DiagnosticPolicy, Policy},
            render::{AskamaTemplates, FormatterConfig, MarkdownDocstrings},
        },
        infra::records::MemoryRecordStore,
    };

    fn build_with(policy: DiagnosticPolicy) -> (DocBuild, MemoryPageWriter) {
        let store =
            SymbolStore::setup(Box::new(MemoryRecordStore::new()), Vec::new()).expect("store");
        let formatter = Formatter::new(
            FormatterConfig::default(),
            Box::new(AskamaTemplates),
            Box::new(MarkdownDocstrings::default()),
        );
        let writer = MemoryPageWriter::new();
        let build = DocBuild::new(
            store,
            LinkResolver::new(),
            formatter,
            DiagnosticSink::new(policy),
            Box::new(writer.clone()),
        );
        (build, writer)
    }

    fn comment(name: &str, description: &str) -> Comment {
        Comment {
            name: name.to_string(),
            description: description.to_string(),
            ..Comment::default()
        }
    }

    fn widget_manifest() -> Manifest {
        let mut widget = Page::new("widgets.md");
        widget.symbols = vec!["GtkWidget".to_string()];
        let mut index = Page::new("index.md");
        index.title = Some("Overview".to_string());
        index.description = Some("Start with [GtkWidget].".to_string());

        Manifest {
            comments: vec![comment("GtkWidget", "The base class.")],
            symbols: vec![ManifestSymbol::new(
                SymbolKind::Struct,
                SymbolAttrs::named("GtkWidget"),
            )],
            pages: vec![index, widget],
        }
    }

    #[test]
    fn pages_link_to_symbols_on_later_pages() {
        let (mut build, writer) = build_with(DiagnosticPolicy::default());
        let report = build.run(widget_manifest()).expect("build");

        assert_eq!(report.pages.len(), 2);
        assert!(!report.incremental);
        let index = writer.page("index.html").expect("index page");
        assert!(index.contains(r#"<a href="widgets.html#GtkWidget">GtkWidget</a>"#));
        let widgets = writer.page("widgets.html").expect("widgets page");
        assert!(widgets.contains("The base class."));
    }

    #[test]
    fn unknown_page_symbols_are_reported_and_skipped() {
        let (mut build, writer) = build_with(DiagnosticPolicy::default());
        let mut manifest = widget_manifest();
        manifest.pages[1].symbols.push("GtkMissing".to_string());

        let report = build.run(manifest).expect("build");

        assert_eq!(
            build.diagnostics().count(DiagnosticCode::UNKNOWN_SYMBOL),
            1
        );
        assert_eq!(report.diagnostics.len(), 1);
        assert!(writer.page("widgets.html").is_some());
    }

    #[test]
    fn fatal_policy_stops_the_build_and_finalizes_the_store() {
        let mut policy = DiagnosticPolicy::default();
        policy
            .overrides
            .insert("page.unknown-symbol".to_string(), Policy::Fatal);
        let (mut build, writer) = build_with(policy);
        let mut manifest = widget_manifest();
        manifest.pages[1].symbols.push("GtkMissing".to_string());

        let err = build.run(manifest).expect_err("fatal");

        assert!(matches!(err, BuildError::Diagnostic(_)));
        assert!(writer.pages().is_empty());
        assert_eq!(
            build.store().state(),
            crate::application::store::StoreState::Finalized
        );
    }

    #[test]
    fn kind_collisions_are_journaled() {
        let (mut build, _writer) = build_with(DiagnosticPolicy::default());
        let mut manifest = widget_manifest();
        manifest.symbols.push(ManifestSymbol::new(
            SymbolKind::Function,
            SymbolAttrs::named("GtkWidget"),
        ));

        let err = build.run(manifest).expect_err("collision");

        assert!(matches!(
            err,
            BuildError::Store(StoreError::KindCollision { .. })
        ));
        assert_eq!(build.diagnostics().count(DiagnosticCode::KIND_COLLISION), 1);
    }

    #[test]
    fn symbols_adopt_a_differently_named_comment() {
        let (mut build, writer) = build_with(DiagnosticPolicy::default());
        let mut manifest = widget_manifest();
        manifest.comments.push(comment("gtk_widget_doc", "Shared text."));
        manifest.symbols[0].comment = Some("gtk_widget_doc".to_string());

        build.run(manifest).expect("build");

        let widgets = writer.page("widgets.html").expect("widgets page");
        assert!(widgets.contains("Shared text."));
    }

    #[test]
    fn invalid_pages_fail_before_rendering() {
        let (mut build, writer) = build_with(DiagnosticPolicy::default());
        let mut manifest = widget_manifest();
        manifest.pages[0].output_dir = Some("../escape".to_string());

        let err = build.run(manifest).expect_err("invalid");

        assert!(matches!(err, BuildError::Page(_)));
        assert!(writer.pages().is_empty());
    }

    #[test]
    fn manifest_symbols_read_flattened_attributes() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "symbols": [
                    {"kind": "function", "unique_name": "gtk_init", "comment": "init"}
                ],
                "pages": [{"source_file": "core.md", "symbols": ["gtk_init"]}]
            }"#,
        )
        .expect("manifest");

        assert_eq!(manifest.symbols[0].kind, SymbolKind::Function);
        assert_eq!(
            manifest.symbols[0].attrs.unique_name.as_deref(),
            Some("gtk_init")
        );
        assert_eq!(manifest.symbols[0].comment.as_deref(), Some("init"));
        assert_eq!(manifest.pages[0].symbols, vec!["gtk_init".to_string()]);
    }
}
