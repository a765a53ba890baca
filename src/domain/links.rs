use serde::{Deserialize, Serialize};

/// Stable handle of a link inside the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) usize);

/// A named cross-reference.
///
/// `reference` is either an absolute URL or a path relative to the output
/// root, optionally carrying a `#fragment`. The stored `title` is only a
/// fallback: the resolver consults title providers on every access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub title: Option<String>,
}

impl Link {
    pub fn new(
        id: impl Into<String>,
        reference: Option<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            reference: reference.filter(|value| !value.is_empty()),
            title: title.filter(|value| !value.is_empty()),
        }
    }

    /// A link whose destination is the identifier itself.
    pub fn passthrough(target: &str) -> Self {
        Self {
            id: target.to_string(),
            reference: Some(target.to_string()),
            title: None,
        }
    }
}
