//! C6: the code generator. Walks the AST, producing coordinated HTML/CSS/JS
//! output (spec.md §4.5). Template/custom expansion, derived class/id
//! collection, and `&`-rewriting live in [`style`]; void-element/escaping
//! rules live in [`html`].
//!
//! Grounded on `Generator.cpp`'s `visit(ElementNode*)` /
//! `visit(StyleBlockNode*)` shape in
//! `examples/original_source/CHTL/CHTL/CHTLGenerator/Generator.cpp`,
//! generalized per spec.md §4.5 (insertion-order class dedup instead of the
//! original's alphabetizing `std::set`; the full derived-class/id set rather
//! than only the first matching rule).

pub mod html;
pub mod style;

use crate::ast::{Arena, CommentKind, Node, NodeId, SpecEdit, TemplateBody, TemplateKind};
use crate::chtljs;
use crate::config::Configuration;
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::plugin::PluginRegistry;
use crate::symbols::SymbolEnvironment;
use html::{escape_attr, escape_text, indent, is_void_element};
use style::ElementFacts;

/// Everything the generator needs from a completed parse, in one borrow.
pub struct Generator<'a> {
    pub arena: &'a Arena,
    pub symbols: &'a SymbolEnvironment,
    pub config: &'a Configuration,
    pub plugins: &'a PluginRegistry,
}

/// Accumulated output of a full generation pass (spec.md §4.5 Contract).
#[derive(Debug, Default, Clone)]
pub struct GeneratedOutput {
    pub html: String,
    pub css: String,
    pub js: String,
}

/// One entry of the CSS stream, in document/rule-discovery order: either a
/// rule assembled from a style pre-pass, or raw content from an
/// `[Origin] @Style { ... }` block (spec.md §4.5 "Origin blocks").
pub(crate) enum CssChunk {
    Rule(String, Vec<(String, String)>),
    Raw(String),
}

impl<'a> Generator<'a> {
    pub fn new(arena: &'a Arena, symbols: &'a SymbolEnvironment, config: &'a Configuration, plugins: &'a PluginRegistry) -> Self {
        Self { arena, symbols, config, plugins }
    }

    /// Renders every top-level node, routing each into the right output
    /// stream. `Import`/`TemplateDef`/`CustomDef`/`ConfigBlock` nodes are
    /// already fully consumed at parse/merge time and contribute nothing
    /// here.
    pub fn generate(&self, top_level: &[NodeId], diagnostics: &mut Diagnostics) -> GeneratedOutput {
        let mut out = GeneratedOutput::default();
        let mut css_rules = Vec::new();
        for &id in top_level {
            self.render_top_level(id, 0, &mut out.html, &mut css_rules, &mut out.js, diagnostics);
        }
        for chunk in css_rules {
            match chunk {
                CssChunk::Rule(selector, props) => {
                    out.css.push_str(&render_css_rule(&selector, &props));
                    out.css.push('\n');
                }
                CssChunk::Raw(content) => {
                    out.css.push_str(&content);
                    out.css.push('\n');
                }
            }
        }
        out
    }

    fn render_top_level(
        &self,
        id: NodeId,
        depth: usize,
        html_out: &mut String,
        css_rules: &mut Vec<CssChunk>,
        js_out: &mut String,
        diagnostics: &mut Diagnostics,
    ) {
        match self.arena.get(id) {
            Node::Element { .. } => self.render_element(id, depth, html_out, css_rules, js_out, diagnostics),
            Node::Comment { content, kind: CommentKind::Generator, .. } => {
                html_out.push_str(&indent(depth));
                html_out.push_str("<!--");
                html_out.push_str(content);
                html_out.push_str("-->\n");
            }
            Node::Comment { kind: CommentKind::Silent, .. } => {}
            Node::Origin { type_tag, content, position } => {
                self.route_origin(type_tag, content, *position, html_out, css_rules, js_out, diagnostics);
            }
            Node::NamespaceDecl { children, .. } => {
                for &child in children {
                    self.render_top_level(child, depth, html_out, css_rules, js_out, diagnostics);
                }
            }
            Node::Import { .. } | Node::TemplateDef { .. } | Node::CustomDef { .. } | Node::ConfigBlock { .. } => {}
            Node::Usage { kind: TemplateKind::Element, .. } => {
                if let Some(children) = self.resolve_element_usage(id, diagnostics) {
                    for child in children {
                        self.render_top_level(child, depth, html_out, css_rules, js_out, diagnostics);
                    }
                }
            }
            other => {
                diagnostics.error(
                    DiagnosticCategory::Semantic,
                    other.position(),
                    "this node cannot appear outside of an element body".to_string(),
                );
            }
        }
    }

    fn route_origin(
        &self,
        type_tag: &str,
        content: &str,
        position: crate::position::SourcePosition,
        html_out: &mut String,
        css_rules: &mut Vec<CssChunk>,
        js_out: &mut String,
        diagnostics: &mut Diagnostics,
    ) {
        match type_tag {
            "Html" => html_out.push_str(content),
            "Style" => css_rules.push(CssChunk::Raw(content.to_string())),
            "JavaScript" => js_out.push_str(content),
            other => {
                diagnostics.error(
                    DiagnosticCategory::Semantic,
                    position,
                    format!("unknown origin type '@{}' and no plugin claims it", other),
                );
            }
        }
    }

    /// Resolves a `Usage` node of kind Element against the symbol
    /// environment, applying `delete`/`insert` edits to the cloned child
    /// list (spec.md §4.4).
    fn resolve_element_usage(&self, usage_id: NodeId, diagnostics: &mut Diagnostics) -> Option<Vec<NodeId>> {
        let (name, namespace, edits, position) = match self.arena.get(usage_id) {
            Node::Usage { kind: TemplateKind::Element, name, namespace, edits, position } => {
                (name.clone(), namespace.clone(), edits.clone(), *position)
            }
            _ => return None,
        };

        let custom_entry = self.symbols.resolve(TemplateKind::Element, true, namespace.as_deref(), &name);
        let (entry, is_custom) = match custom_entry {
            Ok(entry) => (entry, true),
            Err(_) => match self.symbols.resolve(TemplateKind::Element, false, namespace.as_deref(), &name) {
                Ok(entry) => (entry, false),
                Err(e) => {
                    diagnostics.error(DiagnosticCategory::Semantic, position, e.to_string());
                    return None;
                }
            },
        };

        let base_children = match &entry.body {
            TemplateBody::Element(children) => children.clone(),
            _ => Vec::new(),
        };

        if !edits.is_empty() && !is_custom {
            diagnostics.error(
                DiagnosticCategory::Semantic,
                position,
                format!("template '{}' cannot be specialized — only customs may be", name),
            );
            return Some(base_children);
        }

        let mut children = base_children;
        for edit in &edits {
            match edit {
                SpecEdit::DeleteChild(tag) => {
                    if let Some(pos) = children.iter().position(|c| self.child_tag(*c) == Some(tag.as_str())) {
                        children.remove(pos);
                    }
                }
                SpecEdit::InsertAfter { anchor, children: inserted } => {
                    if let Some(pos) = children.iter().position(|c| self.child_tag(*c) == Some(anchor.as_str())) {
                        for (offset, &new_child) in inserted.iter().enumerate() {
                            children.insert(pos + 1 + offset, new_child);
                        }
                    }
                }
                SpecEdit::InsertBefore { anchor, children: inserted } => {
                    if let Some(pos) = children.iter().position(|c| self.child_tag(*c) == Some(anchor.as_str())) {
                        for (offset, &new_child) in inserted.iter().enumerate() {
                            children.insert(pos + offset, new_child);
                        }
                    }
                }
                SpecEdit::Override { .. } | SpecEdit::DeleteProperty(_) => {
                    diagnostics.error(
                        DiagnosticCategory::Semantic,
                        position,
                        "property override/delete is only meaningful for @Style customs".to_string(),
                    );
                }
            }
        }
        Some(children)
    }

    fn child_tag(&self, id: NodeId) -> Option<&str> {
        match self.arena.get(id) {
            Node::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn render_element(
        &self,
        id: NodeId,
        depth: usize,
        html_out: &mut String,
        css_rules: &mut Vec<CssChunk>,
        js_out: &mut String,
        diagnostics: &mut Diagnostics,
    ) {
        let (tag, attributes, children, style_id, script_id, position) = match self.arena.get(id) {
            Node::Element { tag, attributes, children, style, script, position } => {
                (tag.clone(), attributes.clone(), children.clone(), *style, *script, *position)
            }
            _ => return,
        };

        if self.config.debug_mode {
            html_out.push_str(&indent(depth));
            html_out.push_str(&format!("<!-- {} -->\n", position));
        }

        let explicit_class: Vec<String> = attributes
            .iter()
            .find(|a| a.key == "class")
            .map(|a| a.value.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let explicit_id = attributes.iter().find(|a| a.key == "id").map(|a| a.value.as_str().to_string());

        let mut facts = ElementFacts {
            tag: tag.clone(),
            explicit_class,
            explicit_id,
            derived_classes: Vec::new(),
            derived_id: None,
        };

        let mut inline_props = Vec::new();
        if let Some(style_id) = style_id {
            if let Node::Style { items, .. } = self.arena.get(style_id) {
                let mut evaluated = std::collections::HashMap::new();
                style::process_style_items(
                    items,
                    self.arena,
                    self.symbols,
                    self.config,
                    &mut facts,
                    &mut evaluated,
                    &mut inline_props,
                    css_rules,
                    diagnostics,
                );
            }
        }

        html_out.push_str(&indent(depth));
        html_out.push('<');
        html_out.push_str(&tag);

        for attr in &attributes {
            if attr.key == "class" || attr.key == "id" {
                continue;
            }
            html_out.push(' ');
            html_out.push_str(&attr.key);
            html_out.push_str("=\"");
            html_out.push_str(&escape_attr(attr.value.as_str()));
            html_out.push('"');
        }

        let merged_class = merge_classes(&facts.derived_classes, &facts.explicit_class);
        if !merged_class.is_empty() {
            html_out.push_str(" class=\"");
            html_out.push_str(&escape_attr(&merged_class.join(" ")));
            html_out.push('"');
        }

        if let Some(final_id) = merge_id(&facts, diagnostics, position) {
            html_out.push_str(" id=\"");
            html_out.push_str(&escape_attr(&final_id));
            html_out.push('"');
        }

        if !inline_props.is_empty() {
            html_out.push_str(" style=\"");
            html_out.push_str(&escape_attr(&render_inline_style(&inline_props)));
            html_out.push('"');
        }

        if let Some(script_id) = script_id {
            if let Node::Script { content, .. } = self.arena.get(script_id) {
                js_out.push_str(&chtljs::compile_script(content, self.plugins, diagnostics));
                js_out.push('\n');
            }
        }

        if is_void_element(&tag) {
            html_out.push_str(" />\n");
            return;
        }
        html_out.push('>');

        if let [only] = children.as_slice() {
            if let Node::Text { content, .. } = self.arena.get(*only) {
                html_out.push_str(&escape_text(content));
                html_out.push_str("</");
                html_out.push_str(&tag);
                html_out.push_str(">\n");
                return;
            }
        }

        if children.is_empty() {
            html_out.push_str("</");
            html_out.push_str(&tag);
            html_out.push_str(">\n");
            return;
        }

        html_out.push('\n');
        for &child in &children {
            self.render_child(child, depth + 1, html_out, css_rules, js_out, diagnostics);
        }
        html_out.push_str(&indent(depth));
        html_out.push_str("</");
        html_out.push_str(&tag);
        html_out.push_str(">\n");
    }

    fn render_child(
        &self,
        id: NodeId,
        depth: usize,
        html_out: &mut String,
        css_rules: &mut Vec<CssChunk>,
        js_out: &mut String,
        diagnostics: &mut Diagnostics,
    ) {
        match self.arena.get(id) {
            Node::Element { .. } => self.render_element(id, depth, html_out, css_rules, js_out, diagnostics),
            Node::Text { content, .. } => {
                html_out.push_str(&indent(depth));
                html_out.push_str(&escape_text(content));
                html_out.push('\n');
            }
            Node::Comment { content, kind: CommentKind::Generator, .. } => {
                html_out.push_str(&indent(depth));
                html_out.push_str("<!--");
                html_out.push_str(content);
                html_out.push_str("-->\n");
            }
            Node::Comment { kind: CommentKind::Silent, .. } => {}
            Node::Origin { type_tag, content, position } => {
                self.route_origin(type_tag, content, *position, html_out, css_rules, js_out, diagnostics);
            }
            Node::Usage { kind: TemplateKind::Element, .. } => {
                if let Some(children) = self.resolve_element_usage(id, diagnostics) {
                    for child in children {
                        self.render_child(child, depth, html_out, css_rules, js_out, diagnostics);
                    }
                }
            }
            other => {
                diagnostics.error(
                    DiagnosticCategory::Semantic,
                    other.position(),
                    "this node cannot appear inside an element body".to_string(),
                );
            }
        }
    }
}

fn render_inline_style(props: &[(String, String)]) -> String {
    props
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
        + ";"
}

fn render_css_rule(selector: &str, props: &[(String, String)]) -> String {
    let body = props
        .iter()
        .map(|(k, v)| format!("{}: {};", k, v))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {{ {} }}", selector, body)
}

/// Derived classes first (rule-authoring order), then explicit class
/// attribute tokens, deduplicated first-seen (spec.md §4.5 step 2, §8
/// invariant).
fn merge_classes(derived: &[String], explicit: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in derived.iter().chain(explicit.iter()) {
        if seen.insert(c.clone()) {
            out.push(c.clone());
        }
    }
    out
}

/// An explicit `id` attribute wins over a derived one if both are present,
/// with a warning recorded (spec.md §4.5 step 2).
fn merge_id(facts: &ElementFacts, diagnostics: &mut Diagnostics, position: crate::position::SourcePosition) -> Option<String> {
    match (&facts.explicit_id, &facts.derived_id) {
        (Some(explicit), Some(derived)) if explicit != derived => {
            diagnostics.warning(
                DiagnosticCategory::Semantic,
                position,
                format!("explicit id \"{}\" overrides derived id \"{}\"", explicit, derived),
            );
            Some(explicit.clone())
        }
        (Some(explicit), _) => Some(explicit.clone()),
        (None, Some(derived)) => Some(derived.clone()),
        (None, None) => None,
    }
}
