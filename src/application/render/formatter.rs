//! Symbol and page formatting.
//!
//! Every symbol kind maps to one renderer below; the match in
//! [`Formatter::render_symbol`] is exhaustive so a new kind cannot be added
//! without deciding how it renders. Output is memoized on the symbol as its
//! `detailed_description`.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::{
    application::{
        diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink},
        links::LinkResolver,
        observers::{Flow, FormattingObserver, formatting_symbol_flow},
        render::{
            RenderError, escape_html,
            docstring::{DocstringError, DocstringFormatter, LinkScope, ResolvedLink},
            templates::TemplateRenderer,
        },
        store::SymbolStore,
    },
    domain::{
        pages::Page,
        symbols::{SymbolId, SymbolKind, TypeToken},
    },
    presentation::views::{
        AliasView, CallablePrototypeView, CallableView, ClassView, ConstantView, EnumMemberView,
        EnumView, FieldDetailView, HierarchyView, InterfaceView, LinkView, MemberListView,
        MultiReturnValueView, PageView, ParameterDetailView, ParentSectionView,
        PropertyPrototypeView, PropertyView, RawCodeView, ReturnItemView, StructView,
        SymbolSectionView, TagView, View,
    },
};

/// Order in which kinds are listed on a page.
pub const SYMBOL_ORDER: [SymbolKind; 13] = [
    SymbolKind::Interface,
    SymbolKind::Class,
    SymbolKind::Function,
    SymbolKind::FunctionMacro,
    SymbolKind::Signal,
    SymbolKind::Property,
    SymbolKind::Struct,
    SymbolKind::VFunction,
    SymbolKind::Enum,
    SymbolKind::Constant,
    SymbolKind::ExportedVariable,
    SymbolKind::Alias,
    SymbolKind::Callback,
];

const ANCHOR_SCRIPTS: [&str; 2] = ["css.escape.js", "anchors.js"];
const ASSETS_PATH: &str = "assets";
const OTHER_SYMBOLS: &str = "Other symbols";

/// Formatting options fixed for the lifetime of a [`Formatter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatterConfig {
    pub add_anchors: bool,
    pub order_by_parent: bool,
    /// Extra theme scripts, by file name below `assets/js`.
    pub scripts: Vec<String>,
    /// Extra theme stylesheets, by file name below `assets/css`.
    pub stylesheets: Vec<String>,
}

/// Mutable state a formatting call works against.
pub struct RenderContext<'a> {
    pub store: &'a mut SymbolStore,
    pub resolver: &'a mut LinkResolver,
    pub diagnostics: &'a mut DiagnosticSink,
}

impl RenderContext<'_> {
    fn links(&mut self) -> LinkScope<'_> {
        LinkScope::new(self.store, self.resolver)
    }

    fn resolve(&mut self, name: &str) -> Result<ResolvedLink, RenderError> {
        Ok(self.links().resolve(name)?.unwrap_or_else(|| ResolvedLink {
            title: name.to_string(),
            destination: None,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub markup: String,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
}

struct CallableStyle<'a> {
    callable_type: &'a str,
    is_pointer: bool,
    raw_prototype: bool,
}

pub struct Formatter {
    config: FormatterConfig,
    templates: Box<dyn TemplateRenderer>,
    docstrings: Box<dyn DocstringFormatter>,
    observers: Vec<Box<dyn FormattingObserver>>,
    in_progress: HashSet<SymbolId>,
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Formatter {
    pub fn new(
        config: FormatterConfig,
        templates: Box<dyn TemplateRenderer>,
        docstrings: Box<dyn DocstringFormatter>,
    ) -> Self {
        Self {
            config,
            templates,
            docstrings,
            observers: Vec::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn FormattingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn notify_page_written(&mut self, page: &Page, path: &std::path::Path) {
        for observer in self.observers.iter_mut() {
            observer.page_written(page, path);
        }
    }

    /// Format one symbol, its children first.
    ///
    /// Returns `None` when an observer vetoed the symbol, which is then
    /// flagged `skip`. Repeated calls return the memoized markup.
    pub fn format_symbol(
        &mut self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<Option<String>, RenderError> {
        let symbol = cx.store.symbol(id);
        if let Some(done) = &symbol.detailed_description {
            return Ok(Some(done.clone()));
        }
        if symbol.skip || !self.in_progress.insert(id) {
            return Ok(None);
        }

        let result = self.format_symbol_uncached(cx, id);
        self.in_progress.remove(&id);
        result
    }

    fn format_symbol_uncached(
        &mut self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<Option<String>, RenderError> {
        let children = cx.store.symbol(id).children().to_vec();
        for name in children {
            if let Some(child) = cx.store.get_symbol(&name)? {
                self.format_symbol(cx, child)?;
            }
        }

        if formatting_symbol_flow(&mut self.observers, cx.store.symbol(id)) == Flow::Skip {
            let symbol = cx.store.symbol_mut(id);
            debug!(unique_name = %symbol.unique_name, "symbol vetoed by observer");
            symbol.skip = true;
            return Ok(None);
        }

        let (text, name, filename, lineno) = {
            let symbol = cx.store.symbol(id);
            let comment = cx.store.comment(symbol.comment);
            (
                comment.description.clone(),
                symbol.unique_name.clone(),
                comment.filename.clone().or_else(|| symbol.attrs.filename.clone()),
                comment.lineno.or(symbol.attrs.lineno),
            )
        };
        let doc = self.format_text(cx, &text, &name, filename.as_deref(), lineno)?;
        cx.store.symbol_mut(id).formatted_doc = Some(doc);

        let markup = self.render_symbol(cx, id)?;
        cx.store.symbol_mut(id).detailed_description = Some(markup.clone());
        Ok(Some(markup))
    }

    /// Assemble a page from already formatted symbols.
    #[instrument(level = "debug", skip_all, fields(page = %page.source_file))]
    pub fn format_page(
        &mut self,
        cx: &mut RenderContext<'_>,
        page: &Page,
        symbols: &[SymbolId],
    ) -> Result<RenderedPage, RenderError> {
        for observer in self.observers.iter_mut() {
            observer.formatting_page(page);
        }

        let description = match page.description.as_deref() {
            Some(text) if !text.trim().is_empty() => Some(self.format_text(
                cx,
                text,
                &page.source_file,
                Some(&page.source_file),
                None,
            )?),
            _ => None,
        };

        let (symbols_details, sections_details) =
            if page.order_by_parent || self.config.order_by_parent {
                (Vec::new(), self.sections_by_parent(cx, symbols))
            } else {
                (self.sections_by_kind(cx, symbols, None), Vec::new())
            };

        let mut scripts = self.config.scripts.clone();
        if self.config.add_anchors {
            scripts.extend(ANCHOR_SCRIPTS.iter().map(|script| script.to_string()));
        }
        let stylesheets = self.config.stylesheets.clone();

        let source_file = std::path::Path::new(&page.source_file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&page.source_file)
            .to_string();

        let markup = self.render(
            cx,
            View::Page(PageView {
                title: page.display_title(),
                description,
                source_file,
                assets_path: ASSETS_PATH.to_string(),
                scripts: scripts.clone(),
                stylesheets: stylesheets.clone(),
                symbols_details,
                sections_details,
            }),
        )?;

        Ok(RenderedPage {
            markup,
            scripts,
            stylesheets,
        })
    }

    /// Render type tokens, placing a space between a link and the text that
    /// follows it.
    pub fn format_type_tokens(
        &self,
        cx: &mut RenderContext<'_>,
        tokens: &[TypeToken],
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut link_before = false;

        for token in tokens {
            let text = match token {
                TypeToken::Link { id } => {
                    let resolved = cx.resolve(id)?;
                    if let Some(href) = resolved.destination {
                        out.push_str(&self.render(
                            cx,
                            View::Link(LinkView {
                                href: Some(href),
                                title: resolved.title,
                            }),
                        )?);
                        link_before = true;
                        continue;
                    }
                    resolved.title
                }
                TypeToken::Text { text } => text.clone(),
            };

            if link_before {
                out.push(' ');
            }
            out.push_str(&escape_html(&text));
            link_before = false;
        }

        Ok(out)
    }

    fn render(&self, cx: &mut RenderContext<'_>, view: View) -> Result<String, RenderError> {
        match self.templates.render(&view) {
            Err(RenderError::MissingTemplate { name }) => {
                cx.diagnostics.report(Diagnostic::new(
                    DiagnosticCode::MISSING_TEMPLATE,
                    format!("template `{name}` is not available"),
                ))?;
                Err(RenderError::MissingTemplate { name })
            }
            other => other,
        }
    }

    fn format_text(
        &self,
        cx: &mut RenderContext<'_>,
        text: &str,
        owner: &str,
        filename: Option<&str>,
        lineno: Option<u32>,
    ) -> Result<String, RenderError> {
        let mut links = cx.links();
        match self.docstrings.format(text, &mut links) {
            Ok(markup) => Ok(markup),
            Err(DocstringError::Store(err)) => Err(err.into()),
            Err(err) => {
                let mut diagnostic = Diagnostic::new(
                    DiagnosticCode::DOCSTRING_FAILED,
                    format!("documentation of `{owner}` could not be formatted: {err}"),
                )
                .at_line(lineno);
                if let Some(filename) = filename {
                    diagnostic = diagnostic.in_file(filename);
                }
                cx.diagnostics.report(diagnostic)?;

                if text.trim().is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("<p>{}</p>", escape_html(text)))
                }
            }
        }
    }

    fn render_symbol(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        match cx.store.symbol(id).kind {
            SymbolKind::Function => self.format_callable(
                cx,
                id,
                CallableStyle {
                    callable_type: "method",
                    is_pointer: false,
                    raw_prototype: false,
                },
            ),
            SymbolKind::Callback => self.format_callable(
                cx,
                id,
                CallableStyle {
                    callable_type: "callback",
                    is_pointer: true,
                    raw_prototype: false,
                },
            ),
            SymbolKind::VFunction => self.format_callable(
                cx,
                id,
                CallableStyle {
                    callable_type: "virtual method",
                    is_pointer: false,
                    raw_prototype: false,
                },
            ),
            SymbolKind::Signal => self.format_callable(
                cx,
                id,
                CallableStyle {
                    callable_type: "signal",
                    is_pointer: false,
                    raw_prototype: false,
                },
            ),
            SymbolKind::FunctionMacro => self.format_callable(
                cx,
                id,
                CallableStyle {
                    callable_type: "function macro",
                    is_pointer: false,
                    raw_prototype: true,
                },
            ),
            SymbolKind::Constant | SymbolKind::ExportedVariable => self.format_constant(cx, id),
            SymbolKind::Alias => self.format_alias(cx, id),
            SymbolKind::Struct => self.format_struct(cx, id),
            SymbolKind::Enum => self.format_enum(cx, id),
            // Members are rendered by their enum.
            SymbolKind::EnumMember => Ok(String::new()),
            SymbolKind::Parameter => self.format_parameter(cx, id),
            SymbolKind::ReturnItem => self.format_return_item(cx, id),
            SymbolKind::Field => self.format_field(cx, id),
            SymbolKind::Property => self.format_property(cx, id),
            SymbolKind::Class => self.format_class(cx, id),
            SymbolKind::Interface => self.format_interface(cx, id),
        }
    }

    fn format_callable(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
        style: CallableStyle<'_>,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let parameters = self.children_of(cx, id, SymbolKind::Parameter)?;
        let returns = self.children_of(cx, id, SymbolKind::ReturnItem)?;

        let mut title = self.symbol_title(cx, id);
        if symbol.kind == SymbolKind::Signal {
            title = format!("{}_callback", title.replace('-', "_"));
        }

        let prototype = match symbol.attrs.raw_text.as_deref() {
            Some(raw) if style.raw_prototype => {
                self.render(cx, View::RawCode(RawCodeView { code: raw.to_string() }))?
            }
            _ => {
                let mut prototype_parameters = Vec::with_capacity(parameters.len());
                for &parameter in &parameters {
                    prototype_parameters.push(self.format_linked_symbol(cx, parameter)?);
                }
                let return_value = match returns.first() {
                    Some(&item) => {
                        let tokens = cx.store.symbol(item).attrs.type_tokens.clone();
                        Some(self.format_type_tokens(cx, &tokens)?).filter(|t| !t.is_empty())
                    }
                    None => None,
                };
                self.render(
                    cx,
                    View::CallablePrototype(CallablePrototypeView {
                        return_value,
                        name: title.clone(),
                        parameters: prototype_parameters,
                        is_pointer: style.is_pointer || symbol.attrs.is_function_pointer,
                    }),
                )?
            }
        };

        let parameter_details = self.details_of(cx, &parameters);
        let return_details = self.details_of(cx, &returns);
        let return_value = if return_details.is_empty() {
            None
        } else {
            Some(self.render(
                cx,
                View::MultiReturnValue(MultiReturnValueView {
                    items: return_details,
                }),
            )?)
        };

        let tags = cx
            .store
            .comment(symbol.comment)
            .display_tags()
            .map(|tag| TagView {
                name: tag.name.clone(),
                value: tag
                    .value
                    .clone()
                    .or_else(|| tag.description.clone())
                    .unwrap_or_default(),
            })
            .collect();

        self.render(
            cx,
            View::Callable(CallableView {
                anchor: symbol.unique_name.clone(),
                title,
                callable_type: style.callable_type.to_string(),
                prototype,
                doc: symbol.formatted_doc.unwrap_or_default(),
                parameters: parameter_details,
                return_value,
                tags,
            }),
        )
    }

    fn format_constant(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let definition = match symbol.attrs.raw_text.or(symbol.attrs.value) {
            Some(code) => Some(self.render(cx, View::RawCode(RawCodeView { code }))?),
            None => None,
        };
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Constant(ConstantView {
                anchor: symbol.unique_name,
                title,
                type_name: symbol.kind.type_name().to_string(),
                doc: symbol.formatted_doc.unwrap_or_default(),
                definition,
            }),
        )
    }

    fn format_alias(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let aliased_type = self.format_type_tokens(cx, &symbol.attrs.type_tokens)?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Alias(AliasView {
                anchor: symbol.unique_name,
                title,
                doc: symbol.formatted_doc.unwrap_or_default(),
                aliased_type,
            }),
        )
    }

    fn format_struct(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let raw_code = self.raw_code(cx, symbol.attrs.raw_text.as_deref())?;
        let fields = self.children_of(cx, id, SymbolKind::Field)?;
        let details = self.details_of(cx, &fields);
        let members_list = self.member_list(cx, "Fields", details)?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Struct(StructView {
                anchor: symbol.unique_name,
                title,
                type_name: symbol.kind.type_name().to_string(),
                doc: symbol.formatted_doc.unwrap_or_default(),
                raw_code,
                members_list,
            }),
        )
    }

    fn format_enum(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let raw_code = self.raw_code(cx, symbol.attrs.raw_text.as_deref())?;

        let mut details = Vec::new();
        for member in self.children_of(cx, id, SymbolKind::EnumMember)? {
            if cx.store.symbol(member).skip {
                continue;
            }
            let link = self.symbol_link(cx, member)?;
            let (anchor, value, detail) = {
                let member = cx.store.symbol(member);
                (
                    member.unique_name.clone(),
                    member.attrs.value.clone(),
                    member.formatted_doc.clone().unwrap_or_default(),
                )
            };
            let markup = self.render(
                cx,
                View::EnumMember(EnumMemberView {
                    anchor,
                    link,
                    value,
                    detail,
                }),
            )?;
            cx.store.symbol_mut(member).detailed_description = Some(markup.clone());
            details.push(markup);
        }

        let members_list = self.member_list(cx, "Members", details)?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Enum(EnumView {
                anchor: symbol.unique_name,
                title,
                doc: symbol.formatted_doc.unwrap_or_default(),
                raw_code,
                members_list,
            }),
        )
    }

    fn format_parameter(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id);
        let view = ParameterDetailView {
            name: symbol.display_name().to_string(),
            detail: symbol.formatted_doc.clone().unwrap_or_default(),
        };
        self.render(cx, View::ParameterDetail(view))
    }

    fn format_return_item(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let formatted_link = self.format_type_tokens(cx, &symbol.attrs.type_tokens)?;
        self.render(
            cx,
            View::ReturnItem(ReturnItemView {
                formatted_link,
                detail: symbol.formatted_doc.unwrap_or_default(),
            }),
        )
    }

    fn format_field(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let name = self.format_linked_symbol(cx, id)?;
        let symbol = cx.store.symbol(id);
        let view = FieldDetailView {
            anchor: symbol.unique_name.clone(),
            name,
            detail: symbol.formatted_doc.clone().unwrap_or_default(),
        };
        self.render(cx, View::FieldDetail(view))
    }

    fn format_property(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let property_type = self.format_type_tokens(cx, &symbol.attrs.type_tokens)?;
        let prototype = self.render(
            cx,
            View::PropertyPrototype(PropertyPrototypeView {
                property_name: symbol.display_name().to_string(),
                property_type,
            }),
        )?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Property(PropertyView {
                anchor: symbol.unique_name,
                title,
                prototype,
                doc: symbol.formatted_doc.unwrap_or_default(),
                flags: symbol.attrs.flags,
            }),
        )
    }

    fn format_class(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let hierarchy = self.format_hierarchy(cx, &symbol.attrs.hierarchy, &symbol.attrs.derived)?;
        let raw_code = self.raw_code(cx, symbol.attrs.raw_text.as_deref())?;
        let fields = self.children_of(cx, id, SymbolKind::Field)?;
        let details = self.details_of(cx, &fields);
        let members_list = self.member_list(cx, "Members", details)?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Class(ClassView {
                anchor: symbol.unique_name,
                title,
                doc: symbol.formatted_doc.unwrap_or_default(),
                hierarchy,
                raw_code,
                members_list,
            }),
        )
    }

    fn format_interface(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let symbol = cx.store.symbol(id).clone();
        let hierarchy = self.format_hierarchy(cx, &symbol.attrs.hierarchy, &symbol.attrs.derived)?;
        let title = self.symbol_title(cx, id);

        self.render(
            cx,
            View::Interface(InterfaceView {
                anchor: symbol.unique_name,
                title,
                doc: symbol.formatted_doc.unwrap_or_default(),
                hierarchy,
            }),
        )
    }

    fn format_hierarchy(
        &self,
        cx: &mut RenderContext<'_>,
        ancestors: &[String],
        derived: &[String],
    ) -> Result<Option<String>, RenderError> {
        if ancestors.is_empty() && derived.is_empty() {
            return Ok(None);
        }

        let mut hierarchy = Vec::with_capacity(ancestors.len());
        for name in ancestors {
            hierarchy.push(self.format_named_link(cx, name)?);
        }
        let mut children = Vec::with_capacity(derived.len());
        for name in derived {
            children.push(self.format_named_link(cx, name)?);
        }

        Ok(Some(self.render(
            cx,
            View::Hierarchy(HierarchyView {
                hierarchy,
                children,
            }),
        )?))
    }

    fn format_named_link(
        &self,
        cx: &mut RenderContext<'_>,
        name: &str,
    ) -> Result<String, RenderError> {
        let resolved = cx.resolve(name)?;
        self.render(
            cx,
            View::Link(LinkView {
                href: resolved.destination,
                title: resolved.title,
            }),
        )
    }

    /// Type tokens followed by the symbol's name, as used in prototypes and
    /// field lists.
    fn format_linked_symbol(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
    ) -> Result<String, RenderError> {
        let (tokens, name, pointer) = {
            let symbol = cx.store.symbol(id);
            (
                symbol.attrs.type_tokens.clone(),
                symbol.display_name().to_string(),
                symbol.attrs.is_function_pointer,
            )
        };
        let mut out = self.format_type_tokens(cx, &tokens)?;
        if !out.is_empty() && !out.ends_with(['*', ' ']) {
            out.push(' ');
        }
        if pointer {
            out.push_str(&format!("(*{})", escape_html(&name)));
        } else {
            out.push_str(&escape_html(&name));
        }
        Ok(out)
    }

    fn symbol_title(&self, cx: &RenderContext<'_>, id: SymbolId) -> String {
        let symbol = cx.store.symbol(id);
        symbol
            .link
            .and_then(|link| cx.resolver.title(cx.store.link(link)))
            .unwrap_or_else(|| symbol.display_name().to_string())
    }

    fn symbol_link(&self, cx: &mut RenderContext<'_>, id: SymbolId) -> Result<String, RenderError> {
        let title = self.symbol_title(cx, id);
        let href = cx
            .store
            .symbol(id)
            .link
            .and_then(|link| cx.resolver.destination(cx.store.link(link)));
        self.render(cx, View::Link(LinkView { href, title }))
    }

    fn raw_code(
        &self,
        cx: &mut RenderContext<'_>,
        raw: Option<&str>,
    ) -> Result<Option<String>, RenderError> {
        match raw.filter(|code| !code.trim().is_empty()) {
            Some(code) => Ok(Some(self.render(
                cx,
                View::RawCode(RawCodeView {
                    code: code.to_string(),
                }),
            )?)),
            None => Ok(None),
        }
    }

    fn member_list(
        &self,
        cx: &mut RenderContext<'_>,
        designation: &str,
        members: Vec<String>,
    ) -> Result<Option<String>, RenderError> {
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.render(
            cx,
            View::MemberList(MemberListView {
                designation: designation.to_string(),
                members,
            }),
        )?))
    }

    fn children_of(
        &self,
        cx: &mut RenderContext<'_>,
        id: SymbolId,
        kind: SymbolKind,
    ) -> Result<Vec<SymbolId>, RenderError> {
        let names = cx.store.symbol(id).children().to_vec();
        let mut children = Vec::new();
        for name in names {
            if let Some(child) = cx.store.get_symbol(&name)?
                && cx.store.symbol(child).kind == kind
            {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn details_of(&self, cx: &RenderContext<'_>, ids: &[SymbolId]) -> Vec<String> {
        ids.iter()
            .map(|&id| cx.store.symbol(id))
            .filter(|symbol| !symbol.skip)
            .filter_map(|symbol| symbol.detailed_description.clone())
            .filter(|markup| !markup.is_empty())
            .collect()
    }

    fn sections_by_kind(
        &self,
        cx: &RenderContext<'_>,
        symbols: &[SymbolId],
        parent: Option<&str>,
    ) -> Vec<SymbolSectionView> {
        SYMBOL_ORDER
            .iter()
            .filter_map(|&kind| {
                let listed: Vec<SymbolId> = symbols
                    .iter()
                    .copied()
                    .filter(|&id| cx.store.symbol(id).kind == kind)
                    .collect();
                let descriptions = self.details_of(cx, &listed);
                if descriptions.is_empty() {
                    return None;
                }

                let is_parent_itself = listed.len() == 1
                    && parent.is_some_and(|parent| cx.store.symbol(listed[0]).unique_name == parent);
                Some(SymbolSectionView {
                    name: (!is_parent_itself).then(|| kind.plural_name().to_string()),
                    descriptions,
                })
            })
            .collect()
    }

    fn sections_by_parent(
        &self,
        cx: &RenderContext<'_>,
        symbols: &[SymbolId],
    ) -> Vec<ParentSectionView> {
        let parents: HashSet<&str> = symbols
            .iter()
            .filter_map(|&id| cx.store.symbol(id).attrs.parent_name.as_deref())
            .collect();

        let mut groups: Vec<(Option<String>, Vec<SymbolId>)> = Vec::new();
        for &id in symbols {
            let symbol = cx.store.symbol(id);
            let key = symbol.attrs.parent_name.clone().or_else(|| {
                parents
                    .contains(symbol.unique_name.as_str())
                    .then(|| symbol.unique_name.clone())
            });
            match groups.iter_mut().find(|(parent, _)| *parent == key) {
                Some((_, members)) => members.push(id),
                None => groups.push((key, vec![id])),
            }
        }
        groups.sort_by_key(|(parent, _)| parent.is_none());

        groups
            .into_iter()
            .filter_map(|(parent, members)| {
                let details = self.sections_by_kind(cx, &members, parent.as_deref());
                (!details.is_empty()).then(|| ParentSectionView {
                    name: parent.unwrap_or_else(|| OTHER_SYMBOLS.to_string()),
                    details,
                })
            })
            .collect()
    }
}
