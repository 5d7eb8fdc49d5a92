//! Canonical source re-serialization — the `format` collaborator named in
//! spec.md §1. Parses source into the same AST the rest of the pipeline
//! uses, then pretty-prints it back into CHTL with a fixed indent, quote,
//! and brace style. Deliberately minimal: it exists to make the
//! idempotence property in spec.md §8 (`format(format(x)) == format(x)`)
//! real rather than aspirational, not to preserve every byte of the
//! author's original layout (comments and blank-line rhythm are not
//! round-tripped).

use crate::ast::{Arena, Attribute, AttributeValue, CommentKind, ImportSubject, Node, NodeId, SpecEdit, StyleItem, TemplateBody, TemplateKind};
use crate::config::Configuration;
use crate::diagnostics::Diagnostics;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::lexer::{resolve_keywords, tokenize};
use crate::parser::Parser;

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub indent: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

pub struct FormatResult {
    pub source: String,
    pub diagnostics: Diagnostics,
}

/// Parses `source` and re-emits it in canonical style. Callers should check
/// `result.diagnostics.has_errors()` before trusting `result.source` — a
/// source with syntax errors still formats whatever parsed, same as the
/// rest of the pipeline's error-tolerant diagnostics accumulation.
pub fn format_source(source: &str, options: &FormatOptions) -> FormatResult {
    let (tokens, config) = resolve_keywords(tokenize(source), Configuration::default());
    let output = Parser::new(&tokens, source, config).parse();
    let mut printer = Printer {
        arena: &output.arena,
        unit: " ".repeat(options.indent.max(1)),
        buf: String::new(),
    };
    for &id in &output.top_level {
        printer.print_node(id, 0);
    }
    FormatResult {
        source: printer.buf,
        diagnostics: output.diagnostics,
    }
}

struct Printer<'a> {
    arena: &'a Arena,
    unit: String,
    buf: String,
}

impl<'a> Printer<'a> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.buf.push_str(&self.unit);
        }
    }

    fn print_node(&mut self, id: NodeId, depth: usize) {
        match self.arena.get(id) {
            Node::Element {
                tag,
                attributes,
                children,
                style,
                script,
                ..
            } => {
                self.indent(depth);
                self.buf.push_str(tag);
                self.buf.push_str(" {\n");
                for attr in attributes {
                    self.indent(depth + 1);
                    self.print_attribute(attr);
                }
                if let Some(style_id) = style {
                    self.print_node(*style_id, depth + 1);
                }
                if let Some(script_id) = script {
                    self.print_node(*script_id, depth + 1);
                }
                for &child in children {
                    self.print_node(child, depth + 1);
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::Text { content, .. } => {
                self.indent(depth);
                self.buf.push_str("text { \"");
                self.buf.push_str(&escape(content));
                self.buf.push_str("\" }\n");
            }
            Node::Comment { content, kind, .. } => {
                self.indent(depth);
                match kind {
                    CommentKind::Silent => {
                        self.buf.push_str("// ");
                        self.buf.push_str(content.trim());
                        self.buf.push('\n');
                    }
                    CommentKind::Generator => {
                        self.buf.push('#');
                        self.buf.push_str(content);
                        self.buf.push('\n');
                    }
                }
            }
            Node::Style { items, .. } => {
                self.indent(depth);
                self.buf.push_str("style {\n");
                self.print_style_items(items, depth + 1);
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::Script { content, .. } => {
                self.indent(depth);
                self.buf.push_str("script {\n");
                let body = content.trim();
                if !body.is_empty() {
                    self.indent(depth + 1);
                    self.buf.push_str(body);
                    self.buf.push('\n');
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::TemplateDef {
                kind,
                name,
                base,
                body,
                ..
            } => {
                self.indent(depth);
                self.buf.push_str("[Template] @");
                self.buf.push_str(kind_name(*kind));
                self.buf.push(' ');
                self.buf.push_str(name);
                self.print_base(base);
                self.buf.push_str(" {\n");
                self.print_template_body(body, &[], depth + 1);
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::CustomDef {
                kind,
                name,
                base,
                body,
                valueless,
                ..
            } => {
                self.indent(depth);
                self.buf.push_str("[Custom] @");
                self.buf.push_str(kind_name(*kind));
                self.buf.push(' ');
                self.buf.push_str(name);
                self.print_base(base);
                self.buf.push_str(" {\n");
                self.print_template_body(body, valueless, depth + 1);
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::Usage { kind, name, edits, .. } => {
                self.indent(depth);
                self.buf.push('@');
                self.buf.push_str(kind_name(*kind));
                self.buf.push(' ');
                self.buf.push_str(name);
                if edits.is_empty() {
                    self.buf.push_str(";\n");
                } else {
                    self.buf.push_str(" {\n");
                    for edit in edits {
                        self.print_spec_edit(edit, depth + 1);
                    }
                    self.indent(depth);
                    self.buf.push_str("}\n");
                }
            }
            Node::Origin { type_tag, content, .. } => {
                self.indent(depth);
                self.buf.push_str("[Origin] @");
                self.buf.push_str(type_tag);
                self.buf.push_str(" {\n");
                let body = content.trim();
                if !body.is_empty() {
                    self.buf.push_str(body);
                    self.buf.push('\n');
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::Import { subject, path, alias, .. } => {
                self.indent(depth);
                self.buf.push_str("[Import] @");
                self.buf.push_str(import_subject_name(*subject));
                self.buf.push_str(" from \"");
                self.buf.push_str(path);
                self.buf.push('"');
                if let Some(a) = alias {
                    self.buf.push_str(" as ");
                    self.buf.push_str(a);
                }
                self.buf.push_str(";\n");
            }
            Node::NamespaceDecl { name, children, .. } => {
                self.indent(depth);
                self.buf.push_str("[Namespace] ");
                self.buf.push_str(name);
                self.buf.push_str(" {\n");
                for &child in children {
                    self.print_node(child, depth + 1);
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            Node::ConfigBlock { settings, .. } => {
                self.indent(depth);
                self.buf.push_str("[Configuration] {\n");
                for (k, v) in settings {
                    self.indent(depth + 1);
                    self.buf.push_str(k);
                    self.buf.push_str(" = ");
                    self.buf.push_str(v);
                    self.buf.push_str(";\n");
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
        }
    }

    fn print_base(&mut self, base: &[String]) {
        if !base.is_empty() {
            self.buf.push_str(": ");
            self.buf.push_str(&base.join(", "));
        }
    }

    fn print_attribute(&mut self, attr: &Attribute) {
        self.buf.push_str(&attr.key);
        self.buf.push_str(": ");
        match &attr.value {
            AttributeValue::Str(s) => {
                self.buf.push('"');
                self.buf.push_str(&escape(s));
                self.buf.push('"');
            }
            AttributeValue::Unquoted(s) => self.buf.push_str(s),
        }
        self.buf.push_str(";\n");
    }

    fn print_style_items(&mut self, items: &[StyleItem], depth: usize) {
        for item in items {
            match item {
                StyleItem::Property { name, value } => {
                    self.indent(depth);
                    self.buf.push_str(name);
                    self.buf.push_str(": ");
                    self.buf.push_str(&print_expr(value));
                    self.buf.push_str(";\n");
                }
                StyleItem::Rule { selector, body } => {
                    self.indent(depth);
                    self.buf.push_str(selector);
                    self.buf.push_str(" {\n");
                    self.print_style_items(body, depth + 1);
                    self.indent(depth);
                    self.buf.push_str("}\n");
                }
                StyleItem::Usage(usage_id) => self.print_node(*usage_id, depth),
            }
        }
    }

    fn print_template_body(&mut self, body: &TemplateBody, valueless: &[String], depth: usize) {
        match body {
            TemplateBody::Style(items) => self.print_style_items(items, depth),
            TemplateBody::Element(children) => {
                for &child in children {
                    self.print_node(child, depth);
                }
            }
            TemplateBody::Var(pairs) => {
                for (name, value) in pairs {
                    self.indent(depth);
                    self.buf.push_str(name);
                    self.buf.push_str(" = ");
                    self.buf.push_str(value);
                    self.buf.push_str(";\n");
                }
            }
        }
        for name in valueless {
            self.indent(depth);
            self.buf.push_str(name);
            self.buf.push_str(";\n");
        }
    }

    fn print_spec_edit(&mut self, edit: &SpecEdit, depth: usize) {
        self.indent(depth);
        match edit {
            SpecEdit::Override { name, value } => {
                self.buf.push_str(name);
                self.buf.push_str(": ");
                self.buf.push_str(&print_expr(value));
                self.buf.push_str(";\n");
            }
            SpecEdit::DeleteProperty(name) => {
                self.buf.push_str("delete ");
                self.buf.push_str(name);
                self.buf.push_str(";\n");
            }
            SpecEdit::DeleteChild(name) => {
                self.buf.push_str("delete ");
                self.buf.push_str(name);
                self.buf.push_str(";\n");
            }
            SpecEdit::InsertAfter { anchor, children } => {
                self.buf.push_str("insert after ");
                self.buf.push_str(anchor);
                self.buf.push_str(" {\n");
                for &child in children {
                    self.print_node(child, depth + 1);
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
            SpecEdit::InsertBefore { anchor, children } => {
                self.buf.push_str("insert before ");
                self.buf.push_str(anchor);
                self.buf.push_str(" {\n");
                for &child in children {
                    self.print_node(child, depth + 1);
                }
                self.indent(depth);
                self.buf.push_str("}\n");
            }
        }
    }
}

fn kind_name(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Style => "Style",
        TemplateKind::Element => "Element",
        TemplateKind::Var => "Var",
    }
}

fn import_subject_name(subject: ImportSubject) -> &'static str {
    match subject {
        ImportSubject::Chtl => "Chtl",
        ImportSubject::CJmod => "CJmod",
        ImportSubject::Style => "Style",
        ImportSubject::JavaScript => "JavaScript",
        ImportSubject::Config => "Config",
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        Pow => "**",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Eq => "==",
        Ne => "!=",
        And => "&&",
        Or => "||",
    }
}

/// Renders an [`Expr`] back into source text it will reparse to an
/// identical tree — every sub-expression is printed flat with explicit
/// spacing so the canonical form is stable under a second format pass.
fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Number { value, unit } => match unit {
            Some(u) => format!("{}{}", format_number(*value), u),
            None => format_number(*value),
        },
        Expr::Str(s) => format!("\"{}\"", escape(s)),
        Expr::PropertyRef(name) => name.clone(),
        Expr::VarAccess { template, var } => format!("{}({})", template, var),
        Expr::Unary(UnaryOp::Neg, inner) => format!("-{}", print_expr(inner)),
        Expr::Unary(UnaryOp::Not, inner) => format!("!{}", print_expr(inner)),
        Expr::Binary(op, left, right) => {
            format!("{} {} {}", print_expr(left), binary_op_symbol(*op), print_expr(right))
        }
        Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => format!("{} ? {} : {}", print_expr(cond), print_expr(then_branch), print_expr(else_branch)),
        Expr::Group(inner) => format!("({})", print_expr(inner)),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn format(src: &str) -> String {
        format_source(src, &FormatOptions::default()).source
    }

    #[test]
    fn formats_a_minimal_element() {
        let out = format(r#"div{text{"hi"}}"#);
        assert_eq!(out, "div {\n  text { \"hi\" }\n}\n");
    }

    #[test]
    fn formats_attributes_and_nested_elements() {
        let out = format(r#"div { id: "x"; span { text { "y" } } }"#);
        assert!(out.contains("  id: \"x\";\n"));
        assert!(out.contains("  span {\n"));
    }

    #[test]
    fn formats_style_expressions_with_canonical_spacing() {
        let out = format("div { style { width: 100px + 50px; } }");
        assert!(out.contains("width: 100px + 50px;\n"));
    }

    #[test]
    fn is_idempotent_on_its_own_output() {
        let source = r#"
            [Template] @Style Card { padding: 10px; }
            div { id: "x"; style { @Style Card; width: 10px * 2; } text { hello world } }
        "#;
        let once = format_source(source, &FormatOptions::default());
        assert!(!once.diagnostics.has_errors(), "{:?}", once.diagnostics.iter().collect::<Vec<_>>());
        let twice = format_source(&once.source, &FormatOptions::default());
        assert!(!twice.diagnostics.has_errors(), "{:?}", twice.diagnostics.iter().collect::<Vec<_>>());
        assert_eq!(once.source, twice.source);
    }

    proptest! {
        /// spec.md §8: `format(format(x)) == format(x)` over a generated
        /// family of minimal-but-valid documents (random tag name + random
        /// plain-text content) rather than arbitrary byte strings — most
        /// random byte strings aren't CHTL at all, so the property is only
        /// meaningful once parsing succeeds (`prop_assume!` discards the
        /// rest rather than asserting something vacuous over them).
        #[test]
        fn format_is_idempotent_on_generated_documents(
            tag in "[a-z][a-z0-9]{0,5}",
            text in "[a-zA-Z0-9 ]{0,12}",
        ) {
            let source = format!("{} {{ text {{ \"{}\" }} }}", tag, text);
            let once = format_source(&source, &FormatOptions::default());
            prop_assume!(!once.diagnostics.has_errors());
            let twice = format_source(&once.source, &FormatOptions::default());
            prop_assert!(!twice.diagnostics.has_errors());
            prop_assert_eq!(once.source, twice.source);
        }
    }
}
