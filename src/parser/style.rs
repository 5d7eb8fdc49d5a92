//! `styleBlock`/`styleItem` (spec.md §4.3): inline properties, nested
//! selector rules, and template/custom usages, feeding value expressions to
//! C2.

use super::{PResult, Parser};
use crate::ast::{Node, NodeId, StyleItem};
use crate::expr::{Expr, ExprParser};
use crate::token::{Punct, TokenKind};

pub fn parse_style_block(p: &mut Parser) -> PResult<NodeId> {
    let position = p.current_position();
    p.advance(); // 'style'
    p.expect_punct(Punct::LBrace)?;
    let items = parse_style_items_until_rbrace(p)?;
    Ok(p.arena.alloc(Node::Style { items, position }))
}

pub(super) fn parse_style_items_until_rbrace(p: &mut Parser) -> PResult<Vec<StyleItem>> {
    let mut items = Vec::new();
    loop {
        p.skip_insignificant_comments();
        match p.peek_punct() {
            Some(Punct::RBrace) => {
                p.advance();
                break;
            }
            None => {
                p.error("unterminated style block");
                return Err(());
            }
            _ => {}
        }

        match p.peek_kind().cloned() {
            Some(TokenKind::AtIdentifier(_)) => {
                let usage_id = super::template::parse_usage(p)?;
                items.push(StyleItem::Usage(usage_id));
            }
            Some(TokenKind::Punct(Punct::Dot)) => items.push(parse_rule(p, '.')?),
            Some(TokenKind::Punct(Punct::Hash)) => items.push(parse_rule(p, '#')?),
            Some(TokenKind::Punct(Punct::Amp)) => items.push(parse_rule(p, '&')?),
            Some(TokenKind::Identifier(_)) => items.push(parse_property(p)?),
            other => {
                p.error(format!("unexpected token {:?} inside style block", other));
                return Err(());
            }
        }
    }
    Ok(items)
}

/// `&` is only recognized in the leading position of a selector (spec.md
/// §9 Open Questions: "the specification above is strict — leading
/// position only"), which this parser enforces structurally: `&`/`.`/`#`
/// are only ever consumed as the first token of a rule.
fn parse_rule(p: &mut Parser, prefix: char) -> PResult<StyleItem> {
    p.advance(); // consume '.' / '#' / '&'
    let tail = parse_selector_tail(p);
    let selector = format!("{}{}", prefix, tail);
    p.expect_punct(Punct::LBrace)?;
    let body = parse_style_items_until_rbrace(p)?;
    Ok(StyleItem::Rule { selector, body })
}

fn parse_selector_tail(p: &mut Parser) -> String {
    let mut selector = String::new();
    loop {
        match p.peek_kind().cloned() {
            Some(TokenKind::Identifier(s)) => {
                selector.push_str(&s);
                p.advance();
            }
            Some(TokenKind::Punct(Punct::Dot)) => {
                selector.push('.');
                p.advance();
            }
            Some(TokenKind::Punct(Punct::Colon)) => {
                selector.push(':');
                p.advance();
            }
            Some(TokenKind::Punct(Punct::Hash)) => {
                selector.push('#');
                p.advance();
            }
            _ => break,
        }
    }
    selector
}

pub(super) fn parse_property(p: &mut Parser) -> PResult<StyleItem> {
    let name = p.expect_identifier()?;
    p.expect_punct(Punct::Colon)?;
    let value = parse_expr_until_semicolon(p)?;
    p.expect_punct(Punct::Semicolon)?;
    Ok(StyleItem::Property { name, value })
}

pub(super) fn parse_expr_until_semicolon(p: &mut Parser) -> PResult<Expr> {
    let tokens = p.collect_tokens_until_semicolon();
    match ExprParser::parse(tokens) {
        Ok(expr) => Ok(expr),
        Err(e) => {
            p.diagnostics
                .error(crate::diagnostics::DiagnosticCategory::Semantic, e.position, e.message);
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Node, StyleItem};
    use crate::config::Configuration;
    use crate::lexer::{resolve_keywords, tokenize};
    use crate::parser::Parser;

    fn parse_first_style(src: &str) -> Vec<StyleItem> {
        let (tokens, config) = resolve_keywords(tokenize(src), Configuration::default());
        let out = Parser::new(&tokens, src, config).parse();
        assert!(out.diagnostics.is_empty());
        match out.arena.get(out.top_level[0]) {
            Node::Element { style: Some(id), .. } => match out.arena.get(*id) {
                Node::Style { items, .. } => items.clone(),
                _ => panic!("expected style node"),
            },
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn parses_inline_property_and_derived_class_rule() {
        let items = parse_first_style("div { style { .box { color: red; } padding: 5px; } }");
        assert_eq!(items.len(), 2);
        match &items[0] {
            StyleItem::Rule { selector, body } => {
                assert_eq!(selector, ".box");
                assert_eq!(body.len(), 1);
            }
            _ => panic!("expected rule first"),
        }
        match &items[1] {
            StyleItem::Property { name, .. } => assert_eq!(name, "padding"),
            _ => panic!("expected property second"),
        }
    }

    #[test]
    fn ampersand_rule_is_leading_only() {
        let items = parse_first_style("div { style { &:hover { color: blue; } } }");
        match &items[0] {
            StyleItem::Rule { selector, .. } => assert_eq!(selector, "&:hover"),
            _ => panic!("expected rule"),
        }
    }
}
