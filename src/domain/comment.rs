use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable handle of a comment inside the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(pub(crate) usize);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub name: String,
    pub argument: Option<String>,
}

/// A named tag attached to a comment, such as `since` or `returns`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub annotations: Vec<Annotation>,
}

/// Documentation text tied to zero or one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub name: String,
    pub title: Option<String>,
    pub description: String,
    pub short_description: Option<String>,
    pub tags: BTreeMap<String, Tag>,
    pub params: BTreeMap<String, String>,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub endlineno: Option<u32>,
    pub raw_text: String,
}

impl Comment {
    /// Placeholder comment synthesized for symbols ingested without one.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
            && self
                .short_description
                .as_deref()
                .is_none_or(|text| text.trim().is_empty())
    }

    /// Overwrite every field except the name in place.
    pub fn update_from(&mut self, incoming: Comment) {
        let name = std::mem::take(&mut self.name);
        *self = incoming;
        self.name = name;
    }

    /// Text of the `returns` tag, if any.
    pub fn returns(&self) -> Option<&str> {
        self.tags
            .get("returns")
            .and_then(|tag| tag.description.as_deref().or(tag.value.as_deref()))
    }

    /// Tags rendered alongside a symbol, excluding those consumed elsewhere.
    pub fn display_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags
            .values()
            .filter(|tag| !matches!(tag.name.as_str(), "returns" | "topic"))
    }
}
