//! Docstring formatting.
//!
//! Comment text is markdown. Bare references such as `[GtkWidget]` are looked
//! up through the link resolver and rewritten into inline links before the
//! text reaches comrak.

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;
use thiserror::Error;

use crate::application::{
    links::LinkResolver,
    store::{StoreError, SymbolStore},
};

#[derive(Debug, Error)]
pub enum DocstringError {
    #[error("docstring rejected: {message}")]
    Rejected { message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Title and destination of a resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub title: String,
    pub destination: Option<String>,
}

/// Gives docstring formatters access to link resolution for one call.
pub struct LinkScope<'a> {
    store: &'a mut SymbolStore,
    resolver: &'a mut LinkResolver,
}

impl<'a> LinkScope<'a> {
    pub fn new(store: &'a mut SymbolStore, resolver: &'a mut LinkResolver) -> Self {
        Self { store, resolver }
    }

    /// Resolve `name`, falling back to `name` itself as the title.
    pub fn resolve(&mut self, name: &str) -> Result<Option<ResolvedLink>, StoreError> {
        let Some(named) = self.resolver.get_named_link(self.store, name)? else {
            return Ok(None);
        };
        let link = self.resolver.link(self.store, &named);
        Ok(Some(ResolvedLink {
            title: self
                .resolver
                .title(link)
                .unwrap_or_else(|| name.to_string()),
            destination: self.resolver.destination(link),
        }))
    }
}

/// Converts one comment's text to markup.
pub trait DocstringFormatter {
    fn format(&self, text: &str, links: &mut LinkScope<'_>) -> Result<String, DocstringError>;
}

/// Comrak-backed formatter, optionally sanitising its output with ammonia.
pub struct MarkdownDocstrings {
    options: Options<'static>,
    sanitizer: Option<AmmoniaBuilder<'static>>,
}

impl MarkdownDocstrings {
    pub fn new(sanitize: bool) -> Self {
        Self {
            options: default_options(),
            sanitizer: sanitize.then(docstring_sanitizer),
        }
    }

    fn link_references(
        &self,
        text: &str,
        links: &mut LinkScope<'_>,
    ) -> Result<String, DocstringError> {
        let mut out = String::with_capacity(text.len());
        let mut fenced = false;

        for line in text.split_inclusive('\n') {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                fenced = !fenced;
                out.push_str(line);
                continue;
            }
            if fenced || line.starts_with("    ") || line.starts_with('\t') {
                out.push_str(line);
                continue;
            }
            rewrite_line(line, links, &mut out)?;
        }

        Ok(out)
    }
}

impl Default for MarkdownDocstrings {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DocstringFormatter for MarkdownDocstrings {
    fn format(&self, text: &str, links: &mut LinkScope<'_>) -> Result<String, DocstringError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let linked = self.link_references(text, links)?;
        let html = comrak::markdown_to_html(&linked, &self.options);

        Ok(match &self.sanitizer {
            Some(builder) => builder.clean(&html).to_string(),
            None => html,
        })
    }
}

fn rewrite_line(
    line: &str,
    links: &mut LinkScope<'_>,
    out: &mut String,
) -> Result<(), DocstringError> {
    let bytes = line.as_bytes();
    let mut index = 0;
    let mut copied = 0;
    let mut in_code = false;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => {
                index += 2;
                continue;
            }
            b'`' => in_code = !in_code,
            b'[' if !in_code && (index == 0 || bytes[index - 1] != b'!') => {
                if let Some(end) = line[index + 1..].find(']') {
                    let name = &line[index + 1..index + 1 + end];
                    let close = index + 2 + end;
                    let follows = line[close..].chars().next();

                    if is_reference_name(name)
                        && !matches!(follows, Some('(' | '[' | ':'))
                        && let Some(resolved) = links.resolve(name)?
                    {
                        out.push_str(&line[copied..index]);
                        push_markdown_link(out, &resolved);
                        index = close;
                        copied = close;
                        continue;
                    }
                }
            }
            _ => {}
        }
        index += 1;
    }

    out.push_str(&line[copied..]);
    Ok(())
}

fn is_reference_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | ':' | '.' | '-' | '#' | '/'))
}

fn push_markdown_link(out: &mut String, link: &ResolvedLink) {
    let title = escape_markdown(&link.title);
    match &link.destination {
        Some(destination) => {
            out.push('[');
            out.push_str(&title);
            out.push_str("](<");
            out.push_str(destination);
            out.push_str(">)");
        }
        None => out.push_str(&title),
    }
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.description_lists = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    options
}

fn docstring_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.add_generic_attributes(&["class", "id"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.link_rel(None);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            links::Link,
            symbols::{SymbolAttrs, SymbolKind},
        },
        infra::records::MemoryRecordStore,
    };

    fn linked_store() -> (SymbolStore, LinkResolver) {
        let mut store =
            SymbolStore::setup(Box::new(MemoryRecordStore::new()), Vec::new()).expect("store");
        let mut resolver = LinkResolver::new();
        let symbol = store
            .get_or_create_symbol(SymbolKind::Struct, SymbolAttrs::named("GtkWidget"))
            .expect("symbol");
        let link = resolver
            .upsert(
                &mut store,
                Link::new(
                    "GtkWidget",
                    Some("widgets.html#GtkWidget".to_string()),
                    Some("GtkWidget".to_string()),
                ),
                true,
            )
            .expect("link");
        store.symbol_mut(symbol).link = Some(link);
        (store, resolver)
    }

    fn format(formatter: &MarkdownDocstrings, text: &str) -> String {
        let (mut store, mut resolver) = linked_store();
        let mut scope = LinkScope::new(&mut store, &mut resolver);
        formatter.format(text, &mut scope).expect("formatted")
    }

    #[test]
    fn bare_references_become_links() {
        let html = format(&MarkdownDocstrings::default(), "Draws a [GtkWidget].");
        insta::assert_snapshot!(html.trim(), @r#"<p>Draws a <a href="widgets.html#GtkWidget">GtkWidget</a>.</p>"#);
    }

    #[test]
    fn code_and_explicit_links_are_left_alone() {
        let html = format(
            &MarkdownDocstrings::default(),
            "Use `[GtkWidget]` or [the docs](https://example.org).\n\n```\n[GtkWidget]\n```\n",
        );
        assert!(html.contains("<code>[GtkWidget]</code>"));
        assert!(html.contains(r#"<a href="https://example.org">the docs</a>"#));
        assert!(!html.contains("widgets.html"));
    }

    #[test]
    fn unresolved_references_stay_literal() {
        let html = format(&MarkdownDocstrings::default(), "See [Nothing].");
        assert_eq!(html.trim(), "<p>See [Nothing].</p>");
    }

    #[test]
    fn empty_text_renders_nothing() {
        assert_eq!(format(&MarkdownDocstrings::default(), "  \n"), "");
    }

    #[test]
    fn sanitizer_strips_scripts_but_keeps_ids() {
        let html = format(
            &MarkdownDocstrings::new(true),
            "<p id=\"intro\">Hi</p><script>alert(1)</script>",
        );
        assert!(html.contains(r#"id="intro""#));
        assert!(!html.contains("script"));
    }
}
