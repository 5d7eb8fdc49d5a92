//! Style pre-pass (spec.md §4.5 step 1): inline property accumulation,
//! `&`-rewriting, and derived class/id collection.
//!
//! Grounded on `StyleEnhancer.cpp::processContextReference` (`&`
//! substitution) and `Generator.cpp::visit(SelectorRuleNode*)` in
//! `examples/original_source/CHTL/CHTL/CHTLGenerator/`.

use super::CssChunk;
use crate::ast::{Arena, Node, NodeId, SpecEdit, StyleItem, TemplateBody, TemplateKind};
use crate::config::Configuration;
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::expr::{EvalError, EvaluatedValue, Evaluator, PropertyLookup};
use crate::symbols::SymbolEnvironment;
use std::collections::HashMap;

/// Facts about the enclosing element that style processing needs: its tag,
/// any explicit `class`/`id` attribute, and the derived class set / id slot
/// accumulated as rules are discovered (spec.md §4.5 step 1-2).
pub struct ElementFacts {
    pub tag: String,
    pub explicit_class: Vec<String>,
    pub explicit_id: Option<String>,
    pub derived_classes: Vec<String>,
    pub derived_id: Option<String>,
}

impl ElementFacts {
    /// The parent's primary selector per spec.md §4.3: "a class name, if
    /// present; else id; else tag name" — evaluated against whatever has
    /// been derived or declared so far.
    fn primary_selector(&self) -> String {
        if let Some(c) = self.explicit_class.first().or_else(|| self.derived_classes.first()) {
            format!(".{}", c)
        } else if let Some(id) = self.explicit_id.as_deref().or(self.derived_id.as_deref()) {
            format!("#{}", id)
        } else {
            self.tag.clone()
        }
    }
}

struct SiblingLookup<'a> {
    evaluated: &'a HashMap<String, EvaluatedValue>,
    symbols: &'a SymbolEnvironment,
}

impl<'a> PropertyLookup for SiblingLookup<'a> {
    fn lookup_property(&self, name: &str) -> Option<EvaluatedValue> {
        self.evaluated.get(name).cloned()
    }

    fn lookup_variable(&self, template: &str, var: &str) -> Option<EvaluatedValue> {
        let entry = self
            .symbols
            .resolve(TemplateKind::Var, false, None, template)
            .or_else(|_| self.symbols.resolve(TemplateKind::Var, true, None, template))
            .ok()?;
        match &entry.body {
            TemplateBody::Var(pairs) => pairs
                .iter()
                .find(|(k, _)| k == var)
                .map(|(_, v)| parse_var_value(v)),
            _ => None,
        }
    }
}

/// A `[Template] @Var` / `[Custom] @Var` value is stored as a plain string;
/// render it as a number+unit when it looks numeric so expressions built on
/// top of a variable access (`Theme(spacing) * 2`) still do unit arithmetic.
fn parse_var_value(raw: &str) -> EvaluatedValue {
    let digits_end = raw
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*c == '.' && *i > 0))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    if digits_end == 0 {
        return EvaluatedValue::Str(raw.to_string());
    }
    let (num_part, unit_part) = raw.split_at(digits_end);
    match num_part.parse::<f64>() {
        Ok(value) if unit_part.is_empty() => EvaluatedValue::number(value, None),
        Ok(value) => EvaluatedValue::number(value, Some(unit_part.to_string())),
        Err(_) => EvaluatedValue::Str(raw.to_string()),
    }
}

fn bare_name(selector: &str) -> &str {
    let stripped = selector.trim_start_matches(['.', '#']);
    let end = stripped
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(stripped.len());
    &stripped[..end]
}

/// Resolves a `@Style Name;` / `@Style Name { ...specialization... }` usage
/// against the symbol environment, applying overrides/deletions, and
/// checking that every valueless property was supplied (spec.md §4.4).
fn resolve_style_usage(
    usage_id: NodeId,
    arena: &Arena,
    symbols: &SymbolEnvironment,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<StyleItem>> {
    let (name, namespace, edits, position) = match arena.get(usage_id) {
        Node::Usage {
            kind: TemplateKind::Style,
            name,
            namespace,
            edits,
            position,
        } => (name.clone(), namespace.clone(), edits.clone(), *position),
        _ => return None,
    };

    let custom_entry = symbols.resolve(TemplateKind::Style, true, namespace.as_deref(), &name);
    let (entry, is_custom) = match custom_entry {
        Ok(entry) => (entry, true),
        Err(_) => match symbols.resolve(TemplateKind::Style, false, namespace.as_deref(), &name) {
            Ok(entry) => (entry, false),
            Err(e) => {
                diagnostics.error(DiagnosticCategory::Semantic, position, e.to_string());
                return None;
            }
        },
    };

    let mut items = match &entry.body {
        TemplateBody::Style(items) => items.clone(),
        _ => Vec::new(),
    };

    if !edits.is_empty() && !is_custom {
        diagnostics.error(
            DiagnosticCategory::Semantic,
            position,
            format!("template '{}' cannot be specialized — only customs may be", name),
        );
    } else {
        let mut overridden = Vec::new();
        for edit in &edits {
            match edit {
                SpecEdit::Override { name: prop, value } => {
                    overridden.push(prop.clone());
                    if let Some(slot) = items.iter_mut().find_map(|it| match it {
                        StyleItem::Property { name: n, value: v } if n == prop => Some(v),
                        _ => None,
                    }) {
                        *slot = value.clone();
                    } else {
                        items.push(StyleItem::Property {
                            name: prop.clone(),
                            value: value.clone(),
                        });
                    }
                }
                SpecEdit::DeleteProperty(prop) => {
                    items.retain(|it| !matches!(it, StyleItem::Property { name: n, .. } if n == prop));
                }
                SpecEdit::DeleteChild(_) | SpecEdit::InsertAfter { .. } | SpecEdit::InsertBefore { .. } => {
                    diagnostics.error(
                        DiagnosticCategory::Semantic,
                        position,
                        "'delete'/'insert' on a child tag is only meaningful for @Element customs".to_string(),
                    );
                }
            }
        }
        for valueless in &entry.valueless {
            if !overridden.contains(valueless) {
                diagnostics.error(
                    DiagnosticCategory::Semantic,
                    position,
                    format!("custom '{}' requires a value for property '{}'", name, valueless),
                );
            }
        }
    }

    Some(items)
}

/// Walks `items`, evaluating inline properties (pushed to `props_out` and
/// recorded in `evaluated` for later sibling lookups), registering
/// derived class/id rules onto `facts`, and recursing into nested rules
/// (pushed to `css_rules`) and template/custom usages (merged inline).
#[allow(clippy::too_many_arguments)]
pub fn process_style_items(
    items: &[StyleItem],
    arena: &Arena,
    symbols: &SymbolEnvironment,
    config: &Configuration,
    facts: &mut ElementFacts,
    evaluated: &mut HashMap<String, EvaluatedValue>,
    props_out: &mut Vec<(String, String)>,
    css_rules: &mut Vec<CssChunk>,
    diagnostics: &mut Diagnostics,
) {
    for item in items {
        match item {
            StyleItem::Property { name, value } => {
                let lookup = SiblingLookup { evaluated, symbols };
                match Evaluator::new(&lookup).eval(value) {
                    Ok(v) => {
                        props_out.push((name.clone(), v.to_string()));
                        evaluated.insert(name.clone(), v);
                    }
                    Err(e) => report_eval_error(diagnostics, e),
                }
            }
            StyleItem::Rule { selector, body } => {
                register_derived(selector, facts, config);
                let resolved_selector = rewrite_ampersand(selector, facts);
                let mut rule_evaluated = HashMap::new();
                let mut rule_props = Vec::new();
                process_style_items(
                    body,
                    arena,
                    symbols,
                    config,
                    facts,
                    &mut rule_evaluated,
                    &mut rule_props,
                    css_rules,
                    diagnostics,
                );
                css_rules.push(CssChunk::Rule(resolved_selector, rule_props));
            }
            StyleItem::Usage(usage_id) => {
                if let Some(resolved) = resolve_style_usage(*usage_id, arena, symbols, diagnostics) {
                    process_style_items(
                        &resolved,
                        arena,
                        symbols,
                        config,
                        facts,
                        evaluated,
                        props_out,
                        css_rules,
                        diagnostics,
                    );
                }
            }
        }
    }
}

fn report_eval_error(diagnostics: &mut Diagnostics, e: EvalError) {
    diagnostics.error(DiagnosticCategory::Semantic, crate::position::SourcePosition::start(), e.to_string());
}

fn register_derived(selector: &str, facts: &mut ElementFacts, config: &Configuration) {
    let name = bare_name(selector);
    if name.is_empty() {
        return;
    }
    if selector.starts_with('.') {
        if !config.disable_style_auto_add_class && !facts.derived_classes.iter().any(|c| c == name) {
            facts.derived_classes.push(name.to_string());
        }
    } else if selector.starts_with('#') {
        if !config.disable_style_auto_add_id && facts.derived_id.is_none() {
            facts.derived_id = Some(name.to_string());
        }
    }
}

/// `&` is only recognized in the leading position (spec.md §9 Open
/// Question, resolved as "leading position only" — see `DESIGN.md`).
fn rewrite_ampersand(selector: &str, facts: &ElementFacts) -> String {
    if let Some(rest) = selector.strip_prefix('&') {
        format!("{}{}", facts.primary_selector(), rest)
    } else {
        selector.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn facts(tag: &str) -> ElementFacts {
        ElementFacts {
            tag: tag.to_string(),
            explicit_class: Vec::new(),
            explicit_id: None,
            derived_classes: Vec::new(),
            derived_id: None,
        }
    }

    #[test]
    fn ampersand_rewrites_to_derived_class() {
        let mut f = facts("div");
        f.derived_classes.push("box".to_string());
        assert_eq!(rewrite_ampersand("&:hover", &f), ".box:hover");
    }

    #[test]
    fn ampersand_falls_back_to_tag_name() {
        let f = facts("div");
        assert_eq!(rewrite_ampersand("&:hover", &f), "div:hover");
    }

    #[test]
    fn bare_name_strips_pseudo_class_suffix() {
        assert_eq!(bare_name(".box:hover"), "box");
        assert_eq!(bare_name("#main"), "main");
    }

    #[test]
    fn inline_property_pipeline_accumulates_sibling_lookup() {
        let arena = Arena::new();
        let symbols = SymbolEnvironment::new();
        let config = Configuration::default();
        let mut f = facts("div");
        let mut evaluated = HashMap::new();
        let mut props = Vec::new();
        let mut css_rules = Vec::new();
        let mut diags = Diagnostics::new();
        let items = vec![
            StyleItem::Property {
                name: "width".into(),
                value: Expr::Number { value: 100.0, unit: Some("px".into()) },
            },
            StyleItem::Property {
                name: "height".into(),
                value: Expr::Binary(
                    crate::expr::BinaryOp::Mul,
                    Box::new(Expr::PropertyRef("width".into())),
                    Box::new(Expr::Number { value: 2.0, unit: None }),
                ),
            },
        ];
        process_style_items(&items, &arena, &symbols, &config, &mut f, &mut evaluated, &mut props, &mut css_rules, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(props, vec![("width".to_string(), "100px".to_string()), ("height".to_string(), "300px".to_string())]);
    }
}
