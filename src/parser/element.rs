//! `element := IDENT '{' elementBody '}'` and the attribute/text productions
//! nested inside it (spec.md §4.3 grammar sketch).

use super::{PResult, Parser};
use crate::ast::{Attribute, AttributeValue, CommentKind, Node, NodeId};
use crate::token::{Keyword, Punct, TokenKind};

pub fn parse_element(p: &mut Parser) -> PResult<NodeId> {
    let position = p.current_position();
    let tag = p.expect_identifier()?;
    p.expect_punct(Punct::LBrace)?;

    let mut attributes = Vec::new();
    let mut children = Vec::new();
    let mut style = None;
    let mut script = None;

    loop {
        p.skip_insignificant_comments();
        match p.peek_punct() {
            Some(Punct::RBrace) => {
                p.advance();
                break;
            }
            None => {
                p.error("unterminated element body");
                return Err(());
            }
            _ => {}
        }

        if matches!(p.peek_kind(), Some(TokenKind::Identifier(_))) && is_attribute_lookahead(p) {
            attributes.push(parse_attribute(p)?);
            continue;
        }

        if let Some(id) = parse_body_item(p, &mut style, &mut script)? {
            children.push(id);
        }
    }

    Ok(p.arena.alloc(Node::Element {
        tag,
        attributes,
        children,
        style,
        script,
        position,
    }))
}

/// Parses one item from the set shared by an element's body and a
/// Template/Custom-of-kind-Element body: generator comment, `text { }`,
/// `style { }`, `script { }`, a template/custom usage, or a nested element.
/// Attribute parsing is the caller's responsibility since only an element's
/// own body accepts attributes.
fn parse_body_item(
    p: &mut Parser,
    style: &mut Option<NodeId>,
    script: &mut Option<NodeId>,
) -> PResult<Option<NodeId>> {
    match p.peek_kind().cloned() {
        Some(TokenKind::GeneratorComment(text)) => {
            let pos = p.advance().unwrap().start;
            Ok(Some(p.arena.alloc(Node::Comment {
                content: text,
                kind: CommentKind::Generator,
                position: pos,
            })))
        }
        Some(TokenKind::Keyword(Keyword::Text)) => Ok(Some(parse_text(p)?)),
        Some(TokenKind::Keyword(Keyword::Style)) => {
            if style.is_some() {
                p.error("an element may only have one embedded style block");
                return Err(());
            }
            *style = Some(super::style::parse_style_block(p)?);
            Ok(None)
        }
        Some(TokenKind::Keyword(Keyword::Script)) => {
            if script.is_some() {
                p.error("an element may only have one embedded script block");
                return Err(());
            }
            *script = Some(parse_script_block(p)?);
            Ok(None)
        }
        Some(TokenKind::AtIdentifier(_)) => Ok(Some(super::template::parse_usage(p)?)),
        Some(TokenKind::Identifier(_)) => Ok(Some(parse_element(p)?)),
        other => {
            p.error(format!("unexpected token {:?} inside element body", other));
            Err(())
        }
    }
}

/// Parses a bare sequence of body items (no attributes) up to and
/// including the closing `}` — the shape of a `[Template] @Element` /
/// `[Custom] @Element` body.
pub(super) fn parse_child_items_until_rbrace(p: &mut Parser) -> PResult<Vec<NodeId>> {
    let mut children = Vec::new();
    let mut style = None;
    let mut script = None;
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
        if let Some(id) = parse_body_item(p, &mut style, &mut script)? {
            children.push(id);
        }
    }
    Ok(children)
}

/// An identifier is an attribute key when immediately followed by `:` or
/// `=`; otherwise (typically `{`) it starts a nested element.
fn is_attribute_lookahead(p: &Parser) -> bool {
    matches!(
        p.peek_at(1),
        Some(TokenKind::Punct(Punct::Colon)) | Some(TokenKind::Punct(Punct::Equals))
    )
}

fn parse_attribute(p: &mut Parser) -> PResult<Attribute> {
    let key = p.expect_identifier()?;
    p.advance(); // ':' or '='
    let value = match p.peek_kind().cloned() {
        Some(TokenKind::StringLiteral(s)) => {
            p.advance();
            AttributeValue::Str(s)
        }
        _ => {
            // Unquoted: runs to the next `;` (spec.md §4.1/§4.3), e.g.
            // `color: #ff0000;`, `font: 12px sans-serif;`, `href: /a/b;` —
            // none of those are a single pre-tokenized shape, so this is a
            // raw re-scan rather than a token match.
            let text = p.scan_unquoted_run(&[';'], false);
            if text.is_empty() {
                p.error("expected a string or literal attribute value");
                return Err(());
            }
            AttributeValue::Unquoted(text)
        }
    };
    p.expect_punct(Punct::Semicolon)?;
    Ok(Attribute { key, value })
}

fn parse_text(p: &mut Parser) -> PResult<NodeId> {
    let position = p.current_position();
    p.advance(); // 'text'
    p.expect_punct(Punct::LBrace)?;
    let content = match p.peek_kind().cloned() {
        Some(TokenKind::StringLiteral(s)) => {
            p.advance();
            s
        }
        _ => {
            let text = p.scan_unquoted_run(&[], false);
            if text.is_empty() {
                p.error("expected string or literal content inside 'text { ... }'");
                return Err(());
            }
            text
        }
    };
    p.expect_punct(Punct::RBrace)?;
    Ok(p.arena.alloc(Node::Text { content, position }))
}

fn parse_script_block(p: &mut Parser) -> PResult<NodeId> {
    let position = p.current_position();
    p.advance(); // 'script'
    p.expect_punct(Punct::LBrace)?;
    let content = p.collect_raw_until_matching_brace();
    Ok(p.arena.alloc(Node::Script { content, position }))
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::lexer::{resolve_keywords, tokenize};
    use crate::parser::Parser;

    fn parse_ok(src: &str) -> crate::parser::ParseOutput {
        let (tokens, config) = resolve_keywords(tokenize(src), Configuration::default());
        let output = Parser::new(&tokens, src, config).parse();
        assert!(output.diagnostics.is_empty(), "unexpected diagnostics: {:?}", output.diagnostics.iter().collect::<Vec<_>>());
        output
    }

    #[test]
    fn parses_minimal_element_with_text_child() {
        let out = parse_ok(r#"div { text { "hi" } }"#);
        assert_eq!(out.top_level.len(), 1);
        match out.arena.get(out.top_level[0]) {
            crate::ast::Node::Element { tag, children, .. } => {
                assert_eq!(tag, "div");
                assert_eq!(children.len(), 1);
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let out = parse_ok(r#"div { id: "x"; span { text { "y" } } }"#);
        match out.arena.get(out.top_level[0]) {
            crate::ast::Node::Element { attributes, children, .. } => {
                assert_eq!(attributes.len(), 1);
                assert_eq!(attributes[0].key, "id");
                assert_eq!(children.len(), 1);
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn unquoted_attribute_value_runs_to_the_semicolon() {
        let out = parse_ok("div { color: #ff0000; font: 12px sans-serif; href: /a/b; }");
        match out.arena.get(out.top_level[0]) {
            crate::ast::Node::Element { attributes, .. } => {
                assert_eq!(attributes.len(), 3);
                assert_eq!(attributes[0].value.as_str(), "#ff0000");
                assert_eq!(attributes[1].value.as_str(), "12px sans-serif");
                assert_eq!(attributes[2].value.as_str(), "/a/b");
                assert!(attributes.iter().all(|a| matches!(a.value, crate::ast::AttributeValue::Unquoted(_))));
            }
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn unquoted_text_content_runs_to_the_closing_brace() {
        let out = parse_ok("div { text { hello world } }");
        match out.arena.get(out.top_level[0]) {
            crate::ast::Node::Element { children, .. } => match out.arena.get(children[0]) {
                crate::ast::Node::Text { content, .. } => assert_eq!(content, "hello world"),
                _ => panic!("expected text node"),
            },
            _ => panic!("expected element"),
        }
    }

    #[test]
    fn script_block_captures_raw_text_verbatim() {
        let out = parse_ok("div { script { const x = {{#a}}; } }");
        match out.arena.get(out.top_level[0]) {
            crate::ast::Node::Element { script: Some(id), .. } => match out.arena.get(*id) {
                crate::ast::Node::Script { content, .. } => {
                    assert_eq!(content.trim(), "const x = {{#a}};");
                }
                _ => panic!("expected script node"),
            },
            _ => panic!("expected element with script"),
        }
    }
}
