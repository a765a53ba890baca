//! Whole-page HTML post-processing.
//!
//! The page is read twice with `lol_html`. The first pass records every
//! element that carries an id, every `h1`-`h5`, `img` and `a`, together with
//! its text. The edits are planned on that record: heading numbers, derived
//! ids, and text for empty local links. The second pass applies them in
//! document order.

use std::{cell::RefCell, collections::HashMap, path::Path, rc::Rc};

use lol_html::{RewriteStrSettings, doc_text, element, html_content::ContentType, rewrite_str};
use url::Url;

use crate::{
    application::{
        diagnostics::{Diagnostic, DiagnosticCode, DiagnosticError, DiagnosticSink},
        render::RenderError,
    },
    domain::slug::AnchorRegistry,
};

const MAX_HEADING_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostProcessOptions {
    pub number_headings: bool,
}

/// An image found on the page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub src: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostProcessed {
    pub html: String,
    pub images: Vec<ProcessedImage>,
}

#[derive(Debug, Clone, Default)]
struct ScannedElement {
    tag: String,
    id: Option<String>,
    href: Option<String>,
    src: Option<String>,
    alt: Option<String>,
    text: String,
    child_elements: usize,
}

impl ScannedElement {
    fn heading_level(&self) -> Option<u8> {
        let level = self.tag.strip_prefix('h')?.parse::<u8>().ok()?;
        (1..=MAX_HEADING_LEVEL).contains(&level).then_some(level)
    }

    fn label(&self) -> String {
        let raw = if self.tag == "img" {
            self.alt.as_deref().unwrap_or_default()
        } else {
            self.text.as_str()
        };
        collapse_whitespace(&decode_entities(raw))
    }

    fn is_empty_local_link(&self) -> bool {
        self.tag == "a"
            && self.child_elements == 0
            && self.text.trim().is_empty()
            && self.href.as_deref().is_some_and(|href| href.starts_with('#'))
    }
}

#[derive(Debug, Default)]
struct Scan {
    elements: Vec<ScannedElement>,
    open: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
struct Edit {
    id: Option<String>,
    prefix: Option<String>,
    content: Option<String>,
}

/// Run the post-processing passes over one rendered page.
///
/// Dangling local links are reported as `bad-local-link`; a fatal policy for
/// that code aborts processing.
pub fn post_process(
    html: &str,
    source_file: &str,
    options: PostProcessOptions,
    diagnostics: &mut DiagnosticSink,
) -> Result<PostProcessed, RenderError> {
    let elements = scan(html)?;
    let edits = plan(&elements, source_file, options, diagnostics)?;
    let html = apply(html, edits)?;

    let images = elements
        .into_iter()
        .filter(|element| element.tag == "img")
        .map(|element| ProcessedImage { src: element.src })
        .collect();

    Ok(PostProcessed { html, images })
}

/// Check image sources of a written page against the filesystem.
///
/// Sources carrying a URL scheme are not checked; relative ones resolve
/// against the directory of `page_path`.
pub fn validate_images(
    images: &[ProcessedImage],
    page_path: &Path,
    source_file: &str,
    diagnostics: &mut DiagnosticSink,
) -> Result<(), DiagnosticError> {
    let page_dir = page_path.parent().unwrap_or_else(|| Path::new("."));

    for image in images {
        let Some(src) = image.src.as_deref().filter(|src| !src.trim().is_empty()) else {
            diagnostics.report(
                Diagnostic::new(DiagnosticCode::NO_IMAGE_SRC, "image has no src attribute")
                    .in_file(source_file),
            )?;
            continue;
        };

        if Url::parse(src).is_ok() {
            continue;
        }

        let path = src.split(['#', '?']).next().unwrap_or(src);
        if !page_dir.join(path).exists() {
            diagnostics.report(
                Diagnostic::new(
                    DiagnosticCode::BAD_IMAGE_SRC,
                    format!("image source `{src}` does not exist"),
                )
                .in_file(source_file),
            )?;
        }
    }

    Ok(())
}

fn is_tracked(tag: &str, has_id: bool) -> bool {
    has_id || matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "img" | "a")
}

fn scan(html: &str) -> Result<Vec<ScannedElement>, RenderError> {
    let state = Rc::new(RefCell::new(Scan::default()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let state = Rc::clone(&state);
                move |el| {
                    let tag = el.tag_name();
                    let id = el.get_attribute("id");
                    let tracked = is_tracked(&tag, id.is_some());

                    let index = {
                        let mut guard = state.borrow_mut();
                        let scan = &mut *guard;
                        for &open in &scan.open {
                            scan.elements[open].child_elements += 1;
                        }
                        if !tracked {
                            return Ok(());
                        }
                        scan.elements.push(ScannedElement {
                            id,
                            href: el.get_attribute("href"),
                            src: el.get_attribute("src"),
                            alt: el.get_attribute("alt"),
                            tag,
                            ..ScannedElement::default()
                        });
                        scan.elements.len() - 1
                    };

                    // Void elements have no end tag and never hold text.
                    if let Some(handlers) = el.end_tag_handlers() {
                        state.borrow_mut().open.push(index);
                        let state = Rc::clone(&state);
                        let on_end: lol_html::EndTagHandler<'static> =
                            Box::new(move |_end: &mut lol_html::html_content::EndTag<'_>| {
                                state.borrow_mut().open.retain(|&open| open != index);
                                Ok(())
                            });
                        handlers.push(on_end);
                    }
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!({
                let state = Rc::clone(&state);
                move |chunk| {
                    let text = chunk.as_str();
                    if text.is_empty() {
                        return Ok(());
                    }
                    let mut guard = state.borrow_mut();
                    let scan = &mut *guard;
                    for &open in &scan.open {
                        scan.elements[open].text.push_str(text);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    Ok(Rc::try_unwrap(state)
        .map(|cell| cell.into_inner().elements)
        .unwrap_or_else(|rc| rc.borrow().elements.clone()))
}

/// First level from `h1` to `h5` with at least two headings.
fn numbering_base(elements: &[ScannedElement]) -> Option<u8> {
    let mut counts = [0usize; MAX_HEADING_LEVEL as usize + 1];
    for level in elements.iter().filter_map(ScannedElement::heading_level) {
        counts[level as usize] += 1;
    }
    (1..=MAX_HEADING_LEVEL).find(|&level| counts[level as usize] >= 2)
}

fn plan(
    elements: &[ScannedElement],
    source_file: &str,
    options: PostProcessOptions,
    diagnostics: &mut DiagnosticSink,
) -> Result<Vec<Edit>, RenderError> {
    let mut registry = AnchorRegistry::new();
    let mut targets: HashMap<String, String> = HashMap::new();

    for element in elements {
        if let Some(id) = &element.id {
            registry.reserve(id.clone());
            targets
                .entry(id.clone())
                .or_insert_with(|| element.label());
        }
    }

    let base = if options.number_headings {
        numbering_base(elements)
    } else {
        None
    };
    let mut counters = [0u32; MAX_HEADING_LEVEL as usize + 1];
    let mut previous: Option<u8> = None;
    let mut edits = Vec::with_capacity(elements.len());

    for element in elements {
        let mut edit = Edit::default();
        let level = element.heading_level();
        let mut number = None;

        if let (Some(base), Some(level)) = (base, level)
            && level >= base
        {
            if previous.is_some_and(|prev| level <= prev) {
                for deeper in level + 1..=MAX_HEADING_LEVEL {
                    counters[deeper as usize] = 0;
                }
            }
            counters[level as usize] += 1;
            previous = Some(level);

            number = Some(
                (base..=level)
                    .map(|l| counters[l as usize].to_string())
                    .collect::<Vec<_>>()
                    .join("."),
            );
        }

        // Elements that already carry an id, or have no text, keep their content.
        if element.id.is_none() && (level.is_some() || element.tag == "img") {
            let label = element.label();
            if label.is_empty() {
                edits.push(edit);
                continue;
            }
            edit.prefix = number.map(|number| format!("{number} "));
            if let Ok(id) = registry.claim(&label) {
                targets.entry(id.clone()).or_insert(label);
                edit.id = Some(id);
            }
        }

        edits.push(edit);
    }

    for (element, edit) in elements.iter().zip(edits.iter_mut()) {
        if !element.is_empty_local_link() {
            continue;
        }
        let Some(href) = element.href.as_deref() else {
            continue;
        };
        let target = &href[1..];

        edit.content = Some(match targets.get(target) {
            Some(text) => text.clone(),
            None => {
                diagnostics.report(
                    Diagnostic::new(
                        DiagnosticCode::BAD_LOCAL_LINK,
                        format!("empty link to `{href}` has no target on the page"),
                    )
                    .in_file(source_file),
                )?;
                format!("FIXME broken link to {href}")
            }
        });
    }

    Ok(edits)
}

fn apply(html: &str, edits: Vec<Edit>) -> Result<String, RenderError> {
    if edits.iter().all(|edit| {
        edit.id.is_none() && edit.prefix.is_none() && edit.content.is_none()
    }) {
        return Ok(html.to_string());
    }

    let edits = Rc::new(edits);
    let cursor = Rc::new(RefCell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let edits = Rc::clone(&edits);
                let cursor = Rc::clone(&cursor);
                move |el| {
                    if !is_tracked(&el.tag_name(), el.has_attribute("id")) {
                        return Ok(());
                    }
                    let index = {
                        let mut cursor = cursor.borrow_mut();
                        let index = *cursor;
                        *cursor += 1;
                        index
                    };
                    let Some(edit) = edits.get(index) else {
                        return Ok(());
                    };

                    if let Some(id) = &edit.id {
                        el.set_attribute("id", id)?;
                    }
                    if let Some(prefix) = &edit.prefix {
                        el.prepend(prefix, ContentType::Text);
                    }
                    if let Some(content) = &edit.content {
                        el.set_inner_content(content, ContentType::Text);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the character references that can appear in rendered text.
fn decode_entities(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let tail = &rest[start..];
        let entity = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));

        match entity {
            Some((ch, end)) => {
                decoded.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &tail[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::diagnostics::{DiagnosticPolicy, Policy};

    fn run(html: &str, number_headings: bool) -> (PostProcessed, DiagnosticSink) {
        let mut sink = DiagnosticSink::default();
        let processed = post_process(
            html,
            "page.md",
            PostProcessOptions { number_headings },
            &mut sink,
        )
        .expect("post-processed");
        (processed, sink)
    }

    #[test]
    fn duplicate_headings_get_suffixed_ids() {
        let (processed, _) = run("<h2>Example</h2><h2>Example</h2>", false);
        insta::assert_snapshot!(
            processed.html,
            @r#"<h2 id="example">Example</h2><h2 id="example1">Example</h2>"#
        );
    }

    #[test]
    fn existing_ids_are_kept_and_reserved() {
        let (processed, _) = run(
            r#"<div id="example">x</div><h2 id="custom">Custom</h2><h3>Example</h3>"#,
            false,
        );
        assert!(processed.html.contains(r#"<h2 id="custom">Custom</h2>"#));
        assert!(processed.html.contains(r#"<h3 id="example1">Example</h3>"#));
    }

    #[test]
    fn headings_are_numbered_from_the_first_repeated_level() {
        let (processed, _) = run(
            "<h1>Title</h1><h2>Alpha</h2><h2>Beta</h2><h3>Gamma</h3><h2>Delta</h2>",
            true,
        );
        insta::assert_snapshot!(
            processed.html,
            @r#"<h1 id="title">Title</h1><h2 id="alpha">1 Alpha</h2><h2 id="beta">2 Beta</h2><h3 id="gamma">2.1 Gamma</h3><h2 id="delta">3 Delta</h2>"#
        );
    }

    #[test]
    fn headings_with_ids_advance_counters_without_a_prefix() {
        let (processed, _) = run(r#"<h2 id="keep">Kept</h2><h2>Fresh</h2><h2></h2>"#, true);
        insta::assert_snapshot!(
            processed.html,
            @r#"<h2 id="keep">Kept</h2><h2 id="fresh">2 Fresh</h2><h2></h2>"#
        );
    }

    #[test]
    fn deeper_counters_reset_when_climbing_back() {
        let (processed, _) = run(
            "<h2>A</h2><h3>A1</h3><h3>A2</h3><h2>B</h2><h3>B1</h3>",
            true,
        );
        assert!(processed.html.contains(">1.2 A2<"));
        assert!(processed.html.contains(">2.1 B1<"));
    }

    #[test]
    fn numbering_needs_a_repeated_level() {
        let (processed, _) = run("<h1>Only</h1><h2>One</h2>", true);
        assert!(!processed.html.contains("1 Only"));
        assert!(!processed.html.contains("1 One"));
    }

    #[test]
    fn empty_local_link_takes_target_text() {
        let (processed, sink) = run(
            r##"<h2 id="intro">Introduction  to <em>it</em></h2><p><a href="#intro"></a></p>"##,
            false,
        );
        assert!(
            processed
                .html
                .contains(r##"<a href="#intro">Introduction to it</a>"##)
        );
        assert!(sink.journal().is_empty());
    }

    #[test]
    fn dangling_local_link_gets_placeholder_and_warning() {
        let (processed, sink) = run(r##"<p><a href="#foo"></a></p>"##, false);

        assert!(processed.html.contains("FIXME broken link to #foo"));
        assert_eq!(sink.count(DiagnosticCode::BAD_LOCAL_LINK), 1);
    }

    #[test]
    fn links_with_content_are_untouched() {
        let (processed, sink) = run(
            r##"<a href="#foo">Foo</a><a href="#bar"><img src="x.png" alt=""></a>"##,
            false,
        );
        assert!(processed.html.contains(r##"<a href="#foo">Foo</a>"##));
        assert_eq!(sink.count(DiagnosticCode::BAD_LOCAL_LINK), 0);
    }

    #[test]
    fn fatal_link_policy_aborts() {
        let mut policy = DiagnosticPolicy::default();
        policy
            .overrides
            .insert(DiagnosticCode::BAD_LOCAL_LINK.to_string(), Policy::Fatal);
        let mut sink = DiagnosticSink::new(policy);

        let err = post_process(
            r##"<a href="#nowhere"></a>"##,
            "page.md",
            PostProcessOptions::default(),
            &mut sink,
        )
        .expect_err("fatal");
        assert!(matches!(err, RenderError::Diagnostic(_)));
    }

    #[test]
    fn images_get_ids_from_alt_text_and_are_collected() {
        let (processed, _) = run(
            r#"<img alt="Project &amp; Logo" src="logo.png"><img>"#,
            false,
        );
        assert!(processed.html.contains(r#"id="project-logo""#));
        assert_eq!(
            processed.images,
            vec![
                ProcessedImage {
                    src: Some("logo.png".to_string())
                },
                ProcessedImage { src: None },
            ]
        );
    }

    #[test]
    fn image_sources_are_checked_relative_to_the_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("present.png"), b"png").expect("write");
        let page = dir.path().join("index.html");

        let images = [
            ProcessedImage {
                src: Some("present.png".to_string()),
            },
            ProcessedImage {
                src: Some("missing.png".to_string()),
            },
            ProcessedImage {
                src: Some("https://example.org/remote.png".to_string()),
            },
            ProcessedImage { src: None },
        ];

        let mut sink = DiagnosticSink::default();
        validate_images(&images, &page, "index.md", &mut sink).expect("non-fatal");

        assert_eq!(sink.count(DiagnosticCode::BAD_IMAGE_SRC), 1);
        assert_eq!(sink.count(DiagnosticCode::NO_IMAGE_SRC), 1);
    }

    #[test]
    fn entities_are_decoded_for_labels() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &bogus"), "a <b> AB &bogus");
    }
}
