//! Askama views for every fragment the formatter emits.
//!
//! Fields holding already-rendered markup are marked in the templates with
//! `|safe`; everything else is escaped by askama.

use askama::Template;

#[derive(Template, Debug, Clone)]
#[template(path = "link.html")]
pub struct LinkView {
    pub href: Option<String>,
    pub title: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "inline_code.html")]
pub struct InlineCodeView {
    pub code: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "raw_code.html")]
pub struct RawCodeView {
    pub code: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "callable_prototype.html")]
pub struct CallablePrototypeView {
    pub return_value: Option<String>,
    pub name: String,
    pub parameters: Vec<String>,
    pub is_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagView {
    pub name: String,
    pub value: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "callable.html")]
pub struct CallableView {
    pub anchor: String,
    pub title: String,
    pub callable_type: String,
    pub prototype: String,
    pub doc: String,
    pub parameters: Vec<String>,
    pub return_value: Option<String>,
    pub tags: Vec<TagView>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "parameter_detail.html")]
pub struct ParameterDetailView {
    pub name: String,
    pub detail: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "return_item.html")]
pub struct ReturnItemView {
    pub formatted_link: String,
    pub detail: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "multi_return_value.html")]
pub struct MultiReturnValueView {
    pub items: Vec<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "field_detail.html")]
pub struct FieldDetailView {
    pub anchor: String,
    pub name: String,
    pub detail: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "member_list.html")]
pub struct MemberListView {
    pub designation: String,
    pub members: Vec<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "struct.html")]
pub struct StructView {
    pub anchor: String,
    pub title: String,
    pub type_name: String,
    pub doc: String,
    pub raw_code: Option<String>,
    pub members_list: Option<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "enum.html")]
pub struct EnumView {
    pub anchor: String,
    pub title: String,
    pub doc: String,
    pub raw_code: Option<String>,
    pub members_list: Option<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "enum_member.html")]
pub struct EnumMemberView {
    pub anchor: String,
    pub link: String,
    pub value: Option<String>,
    pub detail: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "property_prototype.html")]
pub struct PropertyPrototypeView {
    pub property_name: String,
    pub property_type: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "property.html")]
pub struct PropertyView {
    pub anchor: String,
    pub title: String,
    pub prototype: String,
    pub doc: String,
    pub flags: Vec<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "hierarchy.html")]
pub struct HierarchyView {
    pub hierarchy: Vec<String>,
    pub children: Vec<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "class.html")]
pub struct ClassView {
    pub anchor: String,
    pub title: String,
    pub doc: String,
    pub hierarchy: Option<String>,
    pub raw_code: Option<String>,
    pub members_list: Option<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "interface.html")]
pub struct InterfaceView {
    pub anchor: String,
    pub title: String,
    pub doc: String,
    pub hierarchy: Option<String>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "alias.html")]
pub struct AliasView {
    pub anchor: String,
    pub title: String,
    pub doc: String,
    pub aliased_type: String,
}

#[derive(Template, Debug, Clone)]
#[template(path = "constant.html")]
pub struct ConstantView {
    pub anchor: String,
    pub title: String,
    pub type_name: String,
    pub doc: String,
    pub definition: Option<String>,
}

/// A titled listing of rendered symbol descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSectionView {
    pub name: Option<String>,
    pub descriptions: Vec<String>,
}

/// Symbols sharing a parent, used when a page orders by parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSectionView {
    pub name: String,
    pub details: Vec<SymbolSectionView>,
}

#[derive(Template, Debug, Clone)]
#[template(path = "page.html")]
pub struct PageView {
    pub title: String,
    pub description: Option<String>,
    pub source_file: String,
    pub assets_path: String,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
    pub symbols_details: Vec<SymbolSectionView>,
    pub sections_details: Vec<ParentSectionView>,
}

/// Every template the formatter can ask for.
#[derive(Debug, Clone)]
pub enum View {
    Link(LinkView),
    InlineCode(InlineCodeView),
    RawCode(RawCodeView),
    CallablePrototype(CallablePrototypeView),
    Callable(CallableView),
    ParameterDetail(ParameterDetailView),
    ReturnItem(ReturnItemView),
    MultiReturnValue(MultiReturnValueView),
    FieldDetail(FieldDetailView),
    MemberList(MemberListView),
    Struct(StructView),
    Enum(EnumView),
    EnumMember(EnumMemberView),
    PropertyPrototype(PropertyPrototypeView),
    Property(PropertyView),
    Hierarchy(HierarchyView),
    Class(ClassView),
    Interface(InterfaceView),
    Alias(AliasView),
    Constant(ConstantView),
    Page(PageView),
}

impl View {
    /// Template file name, as a theme would override it.
    pub fn name(&self) -> &'static str {
        match self {
            View::Link(_) => "link.html",
            View::InlineCode(_) => "inline_code.html",
            View::RawCode(_) => "raw_code.html",
            View::CallablePrototype(_) => "callable_prototype.html",
            View::Callable(_) => "callable.html",
            View::ParameterDetail(_) => "parameter_detail.html",
            View::ReturnItem(_) => "return_item.html",
            View::MultiReturnValue(_) => "multi_return_value.html",
            View::FieldDetail(_) => "field_detail.html",
            View::MemberList(_) => "member_list.html",
            View::Struct(_) => "struct.html",
            View::Enum(_) => "enum.html",
            View::EnumMember(_) => "enum_member.html",
            View::PropertyPrototype(_) => "property_prototype.html",
            View::Property(_) => "property.html",
            View::Hierarchy(_) => "hierarchy.html",
            View::Class(_) => "class.html",
            View::Interface(_) => "interface.html",
            View::Alias(_) => "alias.html",
            View::Constant(_) => "constant.html",
            View::Page(_) => "page.html",
        }
    }

    pub fn render(&self) -> askama::Result<String> {
        match self {
            View::Link(view) => view.render(),
            View::InlineCode(view) => view.render(),
            View::RawCode(view) => view.render(),
            View::CallablePrototype(view) => view.render(),
            View::Callable(view) => view.render(),
            View::ParameterDetail(view) => view.render(),
            View::ReturnItem(view) => view.render(),
            View::MultiReturnValue(view) => view.render(),
            View::FieldDetail(view) => view.render(),
            View::MemberList(view) => view.render(),
            View::Struct(view) => view.render(),
            View::Enum(view) => view.render(),
            View::EnumMember(view) => view.render(),
            View::PropertyPrototype(view) => view.render(),
            View::Property(view) => view.render(),
            View::Hierarchy(view) => view.render(),
            View::Class(view) => view.render(),
            View::Interface(view) => view.render(),
            View::Alias(view) => view.render(),
            View::Constant(view) => view.render(),
            View::Page(view) => view.render(),
        }
    }
}
