//! `templateDef`/`customDef`/`usage` (spec.md §4.3): definitions register
//! into C4 as they're parsed; usages are plain AST nodes resolved later by
//! the generator.

use super::{PResult, Parser};
use crate::ast::{Node, NodeId, SpecEdit, TemplateBody, TemplateKind};
use crate::token::{Keyword, Punct, TokenKind};

pub fn parse_template_def(p: &mut Parser, is_custom: bool) -> PResult<NodeId> {
    let position = p.advance().unwrap().start; // '[Template]' / '[Custom]'
    let at_ident = p.expect_at_identifier()?;
    let kind = match TemplateKind::from_at_identifier(&at_ident) {
        Some(k) => k,
        None => {
            p.error(format!("unknown template kind '{}'", at_ident));
            return Err(());
        }
    };
    let name = p.expect_identifier()?;

    let mut base = Vec::new();
    if matches!(p.peek_kind(), Some(TokenKind::Keyword(Keyword::Inherit))) {
        p.advance();
        base.push(p.expect_identifier()?);
        while matches!(p.peek_punct(), Some(Punct::Comma)) {
            p.advance();
            base.push(p.expect_identifier()?);
        }
    }

    p.expect_punct(Punct::LBrace)?;
    let (body, valueless) = parse_body_by_kind(p, kind, is_custom)?;

    let node = p.arena.alloc(if is_custom {
        Node::CustomDef {
            kind,
            name: name.clone(),
            namespace: None,
            base: base.clone(),
            body: body.clone(),
            valueless: valueless.clone(),
            position,
        }
    } else {
        Node::TemplateDef {
            kind,
            name: name.clone(),
            namespace: None,
            base: base.clone(),
            body: body.clone(),
            position,
        }
    });

    match p.symbols.register(kind, is_custom, None, &name, &base, body, valueless, position, &mut p.arena) {
        Ok(()) => Ok(node),
        Err(e) => {
            p.diagnostics
                .error(crate::diagnostics::DiagnosticCategory::Semantic, position, e.to_string());
            Err(())
        }
    }
}

fn parse_body_by_kind(p: &mut Parser, kind: TemplateKind, is_custom: bool) -> PResult<(TemplateBody, Vec<String>)> {
    match kind {
        TemplateKind::Style => {
            let mut items = Vec::new();
            let mut valueless = Vec::new();
            loop {
                p.skip_insignificant_comments();
                match p.peek_punct() {
                    Some(Punct::RBrace) => {
                        p.advance();
                        break;
                    }
                    None => {
                        p.error("unterminated template body");
                        return Err(());
                    }
                    _ => {}
                }
                match p.peek_kind().cloned() {
                    Some(TokenKind::AtIdentifier(_)) => {
                        let usage = parse_usage(p)?;
                        items.push(crate::ast::StyleItem::Usage(usage));
                    }
                    Some(TokenKind::Identifier(name)) if is_custom && matches!(p.peek_at(1), Some(TokenKind::Punct(Punct::Semicolon))) => {
                        p.advance();
                        p.advance();
                        valueless.push(name);
                    }
                    _ => items.push(super::style::parse_property(p)?),
                }
            }
            Ok((TemplateBody::Style(items), valueless))
        }
        TemplateKind::Element => {
            let children = super::element::parse_child_items_until_rbrace(p)?;
            Ok((TemplateBody::Element(children), Vec::new()))
        }
        TemplateKind::Var => {
            let mut pairs = Vec::new();
            let mut valueless = Vec::new();
            loop {
                p.skip_insignificant_comments();
                match p.peek_punct() {
                    Some(Punct::RBrace) => {
                        p.advance();
                        break;
                    }
                    None => {
                        p.error("unterminated template body");
                        return Err(());
                    }
                    _ => {}
                }
                let name = p.expect_identifier()?;
                if is_custom && matches!(p.peek_punct(), Some(Punct::Semicolon)) {
                    p.advance();
                    valueless.push(name);
                    continue;
                }
                p.expect_punct(Punct::Equals)?;
                let value = match p.peek_kind().cloned() {
                    Some(TokenKind::StringLiteral(s)) => {
                        p.advance();
                        s
                    }
                    _ => {
                        // Unquoted var values run to the `;` the same way
                        // attribute values do (`color = #ff0000;`).
                        let text = p.scan_unquoted_run(&[';'], false);
                        if text.is_empty() {
                            p.error("expected a value after '='");
                            return Err(());
                        }
                        text
                    }
                };
                p.expect_punct(Punct::Semicolon)?;
                pairs.push((name, value));
            }
            Ok((TemplateBody::Var(pairs), valueless))
        }
    }
}

/// `usage := '@' kind IDENT ( ';' | '{' specBody '}' )`.
pub fn parse_usage(p: &mut Parser) -> PResult<NodeId> {
    let position = p.current_position();
    let at_ident = p.expect_at_identifier()?;
    let kind = match TemplateKind::from_at_identifier(&at_ident) {
        Some(k) => k,
        None => {
            p.error(format!("unknown usage kind '{}'", at_ident));
            return Err(());
        }
    };
    let name = p.expect_identifier()?;

    let edits = match p.peek_punct() {
        Some(Punct::Semicolon) => {
            p.advance();
            Vec::new()
        }
        Some(Punct::LBrace) => {
            p.advance();
            parse_spec_body(p, kind)?
        }
        _ => {
            p.error("expected ';' or '{' after a template/custom usage");
            return Err(());
        }
    };

    Ok(p.arena.alloc(Node::Usage {
        kind,
        name,
        namespace: None,
        edits,
        position,
    }))
}

/// `specBody := override | 'delete' IDENT ';' | 'insert' ('after'|'before') IDENT '{' elementBody '}'`
fn parse_spec_body(p: &mut Parser, kind: TemplateKind) -> PResult<Vec<SpecEdit>> {
    let mut edits = Vec::new();
    loop {
        p.skip_insignificant_comments();
        match p.peek_punct() {
            Some(Punct::RBrace) => {
                p.advance();
                break;
            }
            None => {
                p.error("unterminated specialization body");
                return Err(());
            }
            _ => {}
        }
        match p.peek_kind().cloned() {
            Some(TokenKind::Keyword(Keyword::Delete)) => {
                p.advance();
                let name = p.expect_identifier()?;
                p.expect_punct(Punct::Semicolon)?;
                edits.push(if kind == TemplateKind::Element {
                    SpecEdit::DeleteChild(name)
                } else {
                    SpecEdit::DeleteProperty(name)
                });
            }
            Some(TokenKind::Keyword(Keyword::Insert)) => {
                p.advance();
                let before = match p.peek_kind().cloned() {
                    Some(TokenKind::Keyword(Keyword::After)) => {
                        p.advance();
                        false
                    }
                    Some(TokenKind::Keyword(Keyword::Before)) => {
                        p.advance();
                        true
                    }
                    _ => {
                        p.error("expected 'after' or 'before' in an insert clause");
                        return Err(());
                    }
                };
                let anchor = p.expect_identifier()?;
                p.expect_punct(Punct::LBrace)?;
                let children = super::element::parse_child_items_until_rbrace(p)?;
                edits.push(if before {
                    SpecEdit::InsertBefore { anchor, children }
                } else {
                    SpecEdit::InsertAfter { anchor, children }
                });
            }
            Some(TokenKind::Identifier(_)) => {
                let name = p.expect_identifier()?;
                p.expect_punct(Punct::Colon)?;
                let value = super::style::parse_expr_until_semicolon(p)?;
                p.expect_punct(Punct::Semicolon)?;
                edits.push(SpecEdit::Override { name, value });
            }
            other => {
                p.error(format!("unexpected token {:?} in specialization body", other));
                return Err(());
            }
        }
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use crate::ast::{Node, TemplateBody};
    use crate::config::Configuration;
    use crate::lexer::{resolve_keywords, tokenize};
    use crate::parser::Parser;

    fn parse(src: &str) -> crate::parser::ParseOutput {
        let (tokens, config) = resolve_keywords(tokenize(src), Configuration::default());
        Parser::new(&tokens, src, config).parse()
    }

    #[test]
    fn registers_a_style_template_and_resolves_usage() {
        let out = parse(
            r#"
            [Template] @Style S { font-family: Arial; }
            p { style { @Style S; } }
            "#,
        );
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.iter().collect::<Vec<_>>());
        let entry = out.symbols.resolve(crate::ast::TemplateKind::Style, false, None, "S").unwrap();
        match &entry.body {
            TemplateBody::Style(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected style body"),
        }
    }

    #[test]
    fn custom_with_valueless_property_requires_override() {
        let out = parse(
            r#"
            [Custom] @Style Btn { padding: 10px; background-color; color: white; }
            button { style { @Style Btn { background-color: blue; delete color; } } }
            "#,
        );
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.iter().collect::<Vec<_>>());
        let entry = out.symbols.resolve(crate::ast::TemplateKind::Style, true, None, "Btn").unwrap();
        assert_eq!(entry.valueless, vec!["background-color".to_string()]);
        match out.arena.get(out.top_level[0]) {
            Node::Element { style: Some(style_id), .. } => match out.arena.get(*style_id) {
                Node::Style { items, .. } => match &items[0] {
                    crate::ast::StyleItem::Usage(usage_id) => match out.arena.get(*usage_id) {
                        Node::Usage { edits, .. } => assert_eq!(edits.len(), 2),
                        _ => panic!("expected usage node"),
                    },
                    _ => panic!("expected usage item"),
                },
                _ => panic!("expected style node"),
            },
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn var_template_accepts_an_unquoted_multi_token_value() {
        let out = parse("[Template] @Var Theme { accent = #ff0000; }");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.iter().collect::<Vec<_>>());
        let entry = out.symbols.resolve(crate::ast::TemplateKind::Var, false, None, "Theme").unwrap();
        match &entry.body {
            TemplateBody::Var(pairs) => assert_eq!(pairs[0], ("accent".to_string(), "#ff0000".to_string())),
            _ => panic!("expected var body"),
        }
    }

    #[test]
    fn undefined_template_usage_is_a_diagnostic_at_resolve_time() {
        // Parsing itself never resolves a usage eagerly (spec.md §4.4:
        // resolution happens at generation time) so this should parse
        // clean; the generator is what reports "undefined template".
        let out = parse("div { style { @Style Ghost; } }");
        assert!(out.diagnostics.is_empty());
    }
}
