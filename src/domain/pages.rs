//! Output units aggregating a set of symbols.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// One output page, as described by the ingestion manifest.
///
/// Pages hold symbol names only; the symbols themselves stay in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub source_file: String,
    pub title: Option<String>,
    /// Markdown rendered above the symbol listing.
    pub description: Option<String>,
    pub symbols: Vec<String>,
    /// Directory below the output root the page is written to.
    pub output_dir: Option<String>,
    pub order_by_parent: bool,
    #[serde(skip)]
    pub detailed_description: Option<String>,
}

impl Page {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.source_file.trim().is_empty() {
            return Err(DomainError::validation("page source file is empty"));
        }
        if self
            .output_dir
            .as_deref()
            .is_some_and(|dir| Path::new(dir).is_absolute() || dir.split('/').any(|c| c == ".."))
        {
            return Err(DomainError::validation(format!(
                "page `{}` must use a relative output directory",
                self.source_file
            )));
        }
        Ok(())
    }

    /// Output-root relative path of the rendered page.
    pub fn reference(&self) -> String {
        let file = format!("{}.html", self.link_id_stem());
        match self.output_dir.as_deref().map(|dir| dir.trim_matches('/')) {
            Some(dir) if !dir.is_empty() => format!("{dir}/{file}"),
            _ => file,
        }
    }

    /// Key under which the page registers its own link.
    pub fn link_id(&self) -> &str {
        &self.source_file
    }

    /// Title shown in the page heading and in links pointing at the page.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        self.stem().replace('-', " ")
    }

    fn stem(&self) -> &str {
        Path::new(&self.source_file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.source_file)
    }

    fn link_id_stem(&self) -> String {
        sanitize_stem(self.stem())
    }
}

/// Collapse every run of non-word characters into a single `-`.
pub fn sanitize_stem(stem: &str) -> String {
    let mut output = String::with_capacity(stem.len());
    let mut in_gap = false;
    for ch in stem.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            output.push(ch);
            in_gap = false;
        } else if !in_gap {
            output.push('-');
            in_gap = true;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_sanitizes_stem() {
        let page = Page::new("docs/getting started.md");
        assert_eq!(page.reference(), "getting-started.html");
        assert_eq!(page.display_title(), "getting started");
    }

    #[test]
    fn reference_honours_output_dir() {
        let mut page = Page::new("gtk-window.md");
        page.output_dir = Some("api/".to_string());
        assert_eq!(page.reference(), "api/gtk-window.html");
        assert_eq!(page.display_title(), "gtk window");
    }

    #[test]
    fn validate_rejects_escaping_dirs() {
        let mut page = Page::new("index.md");
        page.output_dir = Some("../outside".to_string());
        assert!(page.validate().is_err());
        assert!(Page::new("  ").validate().is_err());
    }
}
