//! Documented code entities and the attribute bag ingestion fills in.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{comment::CommentId, error::DomainError, links::LinkId};

/// Stable handle of a symbol inside the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) usize);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Closed set of symbol kinds the formatter knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Callback,
    FunctionMacro,
    Constant,
    ExportedVariable,
    Alias,
    Struct,
    Enum,
    EnumMember,
    Parameter,
    ReturnItem,
    Field,
    Signal,
    #[serde(rename = "vfunction")]
    VFunction,
    Property,
    Class,
    Interface,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 17] = [
        SymbolKind::Function,
        SymbolKind::Callback,
        SymbolKind::FunctionMacro,
        SymbolKind::Constant,
        SymbolKind::ExportedVariable,
        SymbolKind::Alias,
        SymbolKind::Struct,
        SymbolKind::Enum,
        SymbolKind::EnumMember,
        SymbolKind::Parameter,
        SymbolKind::ReturnItem,
        SymbolKind::Field,
        SymbolKind::Signal,
        SymbolKind::VFunction,
        SymbolKind::Property,
        SymbolKind::Class,
        SymbolKind::Interface,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Callback => "callback",
            SymbolKind::FunctionMacro => "function_macro",
            SymbolKind::Constant => "constant",
            SymbolKind::ExportedVariable => "exported_variable",
            SymbolKind::Alias => "alias",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::Parameter => "parameter",
            SymbolKind::ReturnItem => "return_item",
            SymbolKind::Field => "field",
            SymbolKind::Signal => "signal",
            SymbolKind::VFunction => "vfunction",
            SymbolKind::Property => "property",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
        }
    }

    /// Human readable name shown next to a rendered symbol.
    pub fn type_name(self) -> &'static str {
        match self {
            SymbolKind::Function => "Function",
            SymbolKind::Callback => "Callback",
            SymbolKind::FunctionMacro => "Function macro",
            SymbolKind::Constant => "Constant",
            SymbolKind::ExportedVariable => "Exported variable",
            SymbolKind::Alias => "Alias",
            SymbolKind::Struct => "Structure",
            SymbolKind::Enum => "Enumeration",
            SymbolKind::EnumMember => "Enumeration member",
            SymbolKind::Parameter => "Parameter",
            SymbolKind::ReturnItem => "Return value",
            SymbolKind::Field => "Field",
            SymbolKind::Signal => "Signal",
            SymbolKind::VFunction => "Virtual method",
            SymbolKind::Property => "Property",
            SymbolKind::Class => "Class",
            SymbolKind::Interface => "Interface",
        }
    }

    /// Section heading used when a page lists every symbol of this kind.
    pub fn plural_name(self) -> &'static str {
        match self {
            SymbolKind::Function => "Functions",
            SymbolKind::Callback => "Callbacks",
            SymbolKind::FunctionMacro => "Function macros",
            SymbolKind::Constant => "Constants",
            SymbolKind::ExportedVariable => "Exported variables",
            SymbolKind::Alias => "Aliases",
            SymbolKind::Struct => "Structures",
            SymbolKind::Enum => "Enumerations",
            SymbolKind::EnumMember => "Enumeration members",
            SymbolKind::Parameter => "Parameters",
            SymbolKind::ReturnItem => "Return values",
            SymbolKind::Field => "Fields",
            SymbolKind::Signal => "Signals",
            SymbolKind::VFunction => "Virtual methods",
            SymbolKind::Property => "Properties",
            SymbolKind::Class => "Classes",
            SymbolKind::Interface => "Interfaces",
        }
    }

    /// Kinds whose children are rendered inline by their parent rather than
    /// listed on a page of their own.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Parameter
                | SymbolKind::ReturnItem
                | SymbolKind::Field
                | SymbolKind::EnumMember
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        SymbolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::unknown_kind(value))
    }
}

/// A piece of a rendered type: either literal text or a cross-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token", rename_all = "snake_case")]
pub enum TypeToken {
    Text { text: String },
    Link { id: String },
}

impl TypeToken {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn link(id: impl Into<String>) -> Self {
        Self::Link { id: id.into() }
    }
}

/// Every attribute ingestion may set on a symbol.
///
/// `unique_name` falls back to `display_name` when absent; at least one of
/// them must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolAttrs {
    pub unique_name: Option<String>,
    pub display_name: Option<String>,
    pub parent_name: Option<String>,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub type_tokens: Vec<TypeToken>,
    pub raw_text: Option<String>,
    pub value: Option<String>,
    pub flags: Vec<String>,
    pub is_function_pointer: bool,
    /// Ancestors, root first.
    pub hierarchy: Vec<String>,
    /// Direct descendants of a class or interface.
    pub derived: Vec<String>,
    /// Owned member symbols by unique name, in declaration order.
    pub children: Vec<String>,
    pub aliases: Vec<String>,
}

impl SymbolAttrs {
    pub fn named(unique_name: impl Into<String>) -> Self {
        Self {
            unique_name: Some(unique_name.into()),
            ..Self::default()
        }
    }

    /// Identity key: `unique_name`, else `display_name`.
    pub fn identity(&self) -> Result<&str, DomainError> {
        fn usable(name: &Option<String>) -> Option<&str> {
            name.as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
        }
        usable(&self.unique_name)
            .or_else(|| usable(&self.display_name))
            .ok_or_else(|| DomainError::validation("symbol has neither a unique nor a display name"))
    }
}

/// A documented code entity owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub unique_name: String,
    pub kind: SymbolKind,
    pub comment: CommentId,
    pub link: Option<LinkId>,
    pub attrs: SymbolAttrs,
    /// Set when a formatting observer vetoed the symbol for this run.
    pub skip: bool,
    pub formatted_doc: Option<String>,
    pub detailed_description: Option<String>,
}

impl Symbol {
    pub fn display_name(&self) -> &str {
        self.attrs
            .display_name
            .as_deref()
            .unwrap_or(&self.unique_name)
    }

    pub fn children(&self) -> &[String] {
        &self.attrs.children
    }

    /// Drop per-run render output so the next build starts clean.
    pub fn reset_render_state(&mut self) {
        self.skip = false;
        self.formatted_doc = None;
        self.detailed_description = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_from_hyphenated_names() {
        assert_eq!(
            "function-macro".parse::<SymbolKind>().expect("kind"),
            SymbolKind::FunctionMacro
        );
        assert_eq!(
            "VFunction".parse::<SymbolKind>().expect("kind"),
            SymbolKind::VFunction
        );
        assert!("module".parse::<SymbolKind>().is_err());
    }

    #[test]
    fn identity_falls_back_to_display_name() {
        let attrs = SymbolAttrs {
            display_name: Some("gtk_init".to_string()),
            ..SymbolAttrs::default()
        };
        assert_eq!(attrs.identity().expect("identity"), "gtk_init");

        let blank_unique = SymbolAttrs {
            unique_name: Some("  ".to_string()),
            display_name: Some(" gtk_main ".to_string()),
            ..SymbolAttrs::default()
        };
        assert_eq!(blank_unique.identity().expect("identity"), "gtk_main");

        let empty = SymbolAttrs::default();
        assert!(empty.identity().is_err());
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&SymbolKind::VFunction).expect("json");
        assert_eq!(json, "\"vfunction\"");
        let kind: SymbolKind = serde_json::from_str("\"enum_member\"").expect("kind");
        assert_eq!(kind, SymbolKind::EnumMember);
    }
}
