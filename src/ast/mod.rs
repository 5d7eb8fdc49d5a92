//! C3 data model: the AST node variants named in spec.md §3, modeled as a
//! tagged sum (spec.md §9: "sum types over inheritance") rather than the
//! reference C++ implementation's virtual `BaseNode` hierarchy
//! (`examples/original_source/CHTL/CHTLNode/*.h`).

pub mod arena;

pub use arena::{Arena, NodeId};

use crate::expr::Expr;
use crate::position::SourcePosition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Str(String),
    Unquoted(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeValue::Str(s) | AttributeValue::Unquoted(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Silent,
    Generator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Style,
    Element,
    Var,
}

impl TemplateKind {
    pub fn from_at_identifier(at_ident: &str) -> Option<Self> {
        match at_ident {
            "@Style" => Some(TemplateKind::Style),
            "@Element" => Some(TemplateKind::Element),
            "@Var" => Some(TemplateKind::Var),
            _ => None,
        }
    }
}

/// One entry of an embedded style block.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleItem {
    /// `name: expr;` directly inside the block.
    Property { name: String, value: Expr },
    /// `.sel { ... }`, `#sel { ... }`, or `&sel { ... }`.
    Rule { selector: String, body: Vec<StyleItem> },
    /// `@Style Name;` or `@Style Name { ...specialization... }` — a
    /// `Usage` node (kind = Style) living in the arena.
    Usage(NodeId),
}

/// An override/deletion/insertion applied to a custom at its use site
/// (spec.md §4.4 "Specialization at use site").
#[derive(Debug, Clone, PartialEq)]
pub enum SpecEdit {
    Override { name: String, value: Expr },
    DeleteProperty(String),
    DeleteChild(String),
    InsertAfter { anchor: String, children: Vec<NodeId> },
    InsertBefore { anchor: String, children: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSubject {
    Chtl,
    CJmod,
    Style,
    JavaScript,
    Config,
}

/// Body shape of a `TemplateDef`/`CustomDef`, which depends on `kind`
/// (spec.md §3 invariants).
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBody {
    Style(Vec<StyleItem>),
    Element(Vec<NodeId>),
    Var(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<NodeId>,
        style: Option<NodeId>,
        script: Option<NodeId>,
        position: SourcePosition,
    },
    Text {
        content: String,
        position: SourcePosition,
    },
    Comment {
        content: String,
        kind: CommentKind,
        position: SourcePosition,
    },
    Style {
        items: Vec<StyleItem>,
        position: SourcePosition,
    },
    Script {
        content: String,
        position: SourcePosition,
    },
    TemplateDef {
        kind: TemplateKind,
        name: String,
        namespace: Option<String>,
        base: Vec<String>,
        body: TemplateBody,
        position: SourcePosition,
    },
    CustomDef {
        kind: TemplateKind,
        name: String,
        namespace: Option<String>,
        base: Vec<String>,
        body: TemplateBody,
        /// Properties declared with no value; every use site must supply
        /// them (spec.md §3 invariants).
        valueless: Vec<String>,
        position: SourcePosition,
    },
    Usage {
        kind: TemplateKind,
        name: String,
        namespace: Option<String>,
        edits: Vec<SpecEdit>,
        position: SourcePosition,
    },
    Origin {
        type_tag: String,
        content: String,
        position: SourcePosition,
    },
    Import {
        subject: ImportSubject,
        path: String,
        alias: Option<String>,
        position: SourcePosition,
    },
    NamespaceDecl {
        name: String,
        children: Vec<NodeId>,
        position: SourcePosition,
    },
    ConfigBlock {
        settings: Vec<(String, String)>,
        position: SourcePosition,
    },
}

impl Node {
    pub fn position(&self) -> SourcePosition {
        match self {
            Node::Element { position, .. }
            | Node::Text { position, .. }
            | Node::Comment { position, .. }
            | Node::Style { position, .. }
            | Node::Script { position, .. }
            | Node::TemplateDef { position, .. }
            | Node::CustomDef { position, .. }
            | Node::Usage { position, .. }
            | Node::Origin { position, .. }
            | Node::Import { position, .. }
            | Node::NamespaceDecl { position, .. }
            | Node::ConfigBlock { position, .. } => *position,
        }
    }
}
