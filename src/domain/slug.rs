//! Deterministic anchor ids derived from visible text.
//!
//! ASCII slugification (`slug` crate) is combined with Chinese
//! transliteration (`pinyin` crate) so headings like “基线对齐” still yield a
//! usable `ji-xian-dui-qi` anchor instead of an empty one.

use std::collections::HashSet;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Page-wide id registry.
///
/// Every id already present on the page is reserved up front; new anchors
/// derived from duplicate text receive a numeric suffix starting at `1`
/// (`example`, `example1`, `example2`).
#[derive(Default, Debug)]
pub struct AnchorRegistry {
    taken: HashSet<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self {
            taken: HashSet::new(),
        }
    }

    /// Mark an id as used without deriving it.
    pub fn reserve(&mut self, id: impl Into<String>) {
        self.taken.insert(id.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Derive an unused id for `text` and register it.
    pub fn claim(&mut self, text: &str) -> Result<String, SlugError> {
        let base = derive_slug(text)?;
        let mut candidate = base.clone();
        let mut index = 1usize;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}{index}");
            index += 1;
        }
        self.taken.insert(candidate.clone());
        Ok(candidate)
    }
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}
