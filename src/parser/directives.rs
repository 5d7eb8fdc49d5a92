//! `originBlock` / `importStmt` / `namespaceDecl` / `configBlock` (spec.md
//! §4.3 grammar sketch) plus the `use html5;` declaration.
//!
//! Configuration blocks are mutated into [`crate::config::Configuration`]
//! before the parser ever sees them (`lexer::keywords::apply_configuration_block`
//! runs ahead of parsing so aliases take effect mid-file); this module just
//! rebuilds the same `KEY = value;` pairs into a `ConfigBlock` AST node for
//! round-tripping and diagnostics.

use super::{PResult, Parser};
use crate::ast::{ImportSubject, Node, NodeId};
use crate::token::{Keyword, Punct, TokenKind};

pub fn parse_origin(p: &mut Parser) -> PResult<NodeId> {
    let position = p.advance().unwrap().start; // '[Origin]'
    let at_ident = p.expect_at_identifier()?;
    let type_tag = at_ident.trim_start_matches('@').to_string();
    p.expect_punct(Punct::LBrace)?;
    let content = p.collect_raw_until_matching_brace();
    Ok(p.arena.alloc(Node::Origin {
        type_tag,
        content,
        position,
    }))
}

pub fn parse_import(p: &mut Parser) -> PResult<NodeId> {
    let position = p.advance().unwrap().start; // '[Import]'
    let at_ident = p.expect_at_identifier()?;
    let subject = match at_ident.as_str() {
        "@Chtl" => ImportSubject::Chtl,
        "@CJmod" => ImportSubject::CJmod,
        "@Style" => ImportSubject::Style,
        "@JavaScript" => ImportSubject::JavaScript,
        "@Config" => ImportSubject::Config,
        other => {
            p.error(format!("unknown import subject '{}'", other));
            return Err(());
        }
    };

    if !matches!(p.peek_kind(), Some(TokenKind::Keyword(Keyword::From))) {
        p.error("expected 'from' in import statement");
        return Err(());
    }
    p.advance();
    let path = p.expect_string_or_unquoted()?;

    let mut alias = None;
    if matches!(p.peek_kind(), Some(TokenKind::Keyword(Keyword::As))) {
        p.advance();
        alias = Some(p.expect_identifier()?);
    }

    // `except` is present in the keyword set but its semantics were never
    // pinned down in the reference implementation; reject rather than guess.
    if matches!(p.peek_kind(), Some(TokenKind::Keyword(Keyword::Except))) {
        p.error("'except' clauses on imports are not supported");
        return Err(());
    }

    p.expect_punct(Punct::Semicolon)?;
    Ok(p.arena.alloc(Node::Import {
        subject,
        path,
        alias,
        position,
    }))
}

pub fn parse_namespace(p: &mut Parser) -> PResult<NodeId> {
    let position = p.advance().unwrap().start; // '[Namespace]'
    let name = p.expect_identifier()?;
    p.expect_punct(Punct::LBrace)?;

    let previous = p.symbols.enter_namespace(&name);
    let mut children = Vec::new();
    loop {
        p.skip_insignificant_comments();
        match p.peek_punct() {
            Some(Punct::RBrace) => {
                p.advance();
                break;
            }
            None => {
                p.error("unterminated namespace block");
                p.symbols.restore_namespace(previous);
                return Err(());
            }
            _ => {}
        }
        match p.parse_top_level() {
            Ok(Some(id)) => children.push(id),
            Ok(None) => {}
            Err(()) => p.synchronize(),
        }
    }
    p.symbols.restore_namespace(previous);

    Ok(p.arena.alloc(Node::NamespaceDecl {
        name,
        children,
        position,
    }))
}

/// Rebuilds the `KEY = value;` pairs of a `[Configuration] { ... }` block
/// into AST form. The settings themselves were already applied to
/// `p.config` during keyword resolution, ahead of parsing.
pub fn parse_config_block(p: &mut Parser) -> PResult<NodeId> {
    let position = p.advance().unwrap().start; // '[Configuration]'
    p.expect_punct(Punct::LBrace)?;

    let mut settings = Vec::new();
    loop {
        p.skip_insignificant_comments();
        match p.peek_punct() {
            Some(Punct::RBrace) => {
                p.advance();
                break;
            }
            None => {
                p.error("unterminated configuration block");
                return Err(());
            }
            _ => {}
        }

        let key = match p.peek_kind().cloned() {
            Some(TokenKind::Identifier(s)) => {
                p.advance();
                s
            }
            other => {
                p.error(format!("expected a configuration key, found {:?}", other));
                return Err(());
            }
        };
        p.expect_punct(Punct::Equals)?;
        let value = match p.peek_kind().cloned() {
            Some(TokenKind::StringLiteral(v))
            | Some(TokenKind::UnquotedLiteral(v))
            | Some(TokenKind::NumberLiteral(v))
            | Some(TokenKind::Identifier(v)) => {
                p.advance();
                v
            }
            other => {
                p.error(format!("expected a configuration value, found {:?}", other));
                return Err(());
            }
        };
        p.expect_punct(Punct::Semicolon)?;
        settings.push((key, value));
    }

    Ok(p.arena.alloc(Node::ConfigBlock { settings, position }))
}

pub fn parse_use_statement(p: &mut Parser) -> PResult<()> {
    p.advance(); // 'use'
    match p.peek_kind() {
        Some(TokenKind::Keyword(Keyword::Html5)) => {
            p.advance();
            p.config.doctype_html5 = true;
        }
        other => {
            p.error(format!("expected 'html5' after 'use', found {:?}", other));
            return Err(());
        }
    }
    p.expect_punct(Punct::Semicolon)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ast::{ImportSubject, Node};
    use crate::config::Configuration;
    use crate::lexer::{resolve_keywords, tokenize};
    use crate::parser::Parser;

    fn parse(src: &str) -> crate::parser::ParseOutput {
        let (tokens, config) = resolve_keywords(tokenize(src), Configuration::default());
        Parser::new(&tokens, src, config).parse()
    }

    #[test]
    fn origin_block_captures_raw_html_verbatim() {
        let out = parse(r#"[Origin] @Html { <b>raw</b> }"#);
        assert!(out.diagnostics.is_empty());
        match out.arena.get(out.top_level[0]) {
            Node::Origin { type_tag, content, .. } => {
                assert_eq!(type_tag, "Html");
                assert_eq!(content.trim(), "<b>raw</b>");
            }
            _ => panic!("expected origin node"),
        }
    }

    #[test]
    fn import_statement_records_subject_and_path() {
        let out = parse(r#"[Import] @Chtl from "lib.chtl";"#);
        assert!(out.diagnostics.is_empty());
        match out.arena.get(out.top_level[0]) {
            Node::Import { subject, path, alias, .. } => {
                assert_eq!(*subject, ImportSubject::Chtl);
                assert_eq!(path, "lib.chtl");
                assert_eq!(*alias, None);
            }
            _ => panic!("expected import node"),
        }
    }

    #[test]
    fn import_statement_accepts_an_unquoted_path() {
        let out = parse("[Import] @Chtl from lib/button.chtl;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.iter().collect::<Vec<_>>());
        match out.arena.get(out.top_level[0]) {
            Node::Import { path, .. } => assert_eq!(path, "lib/button.chtl"),
            _ => panic!("expected import node"),
        }
    }

    #[test]
    fn import_except_clause_is_rejected() {
        let out = parse(r#"[Import] @Chtl from "lib.chtl" except Foo;"#);
        assert!(!out.diagnostics.is_empty());
    }

    #[test]
    fn namespace_scopes_nested_template_definitions() {
        let out = parse(
            r#"[Namespace] ui {
                [Template] @Style Box { color: red; }
            }"#,
        );
        assert!(out.diagnostics.is_empty());
        match out.arena.get(out.top_level[0]) {
            Node::NamespaceDecl { name, children, .. } => {
                assert_eq!(name, "ui");
                assert_eq!(children.len(), 1);
            }
            _ => panic!("expected namespace node"),
        }
        assert!(out.symbols.resolve(crate::ast::TemplateKind::Style, false, Some("ui"), "Box").is_ok());
    }

    #[test]
    fn configuration_block_is_recorded_as_a_node() {
        let out = parse("[Configuration] { DEBUG_MODE = true; }");
        assert!(out.diagnostics.is_empty());
        match out.arena.get(out.top_level[0]) {
            Node::ConfigBlock { settings, .. } => {
                assert_eq!(settings, &vec![("DEBUG_MODE".to_string(), "true".to_string())]);
            }
            _ => panic!("expected config block node"),
        }
        assert!(out.config.debug_mode);
    }

    #[test]
    fn use_html5_sets_doctype_flag() {
        let out = parse("use html5;");
        assert!(out.diagnostics.is_empty());
        assert!(out.top_level.is_empty());
        assert!(out.config.doctype_html5);
    }
}
