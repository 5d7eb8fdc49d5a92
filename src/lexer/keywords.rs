//! Keyword resolution: the small stage between the raw lexer and the parser
//! that turns plain `Identifier` tokens into `Keyword` tokens by consulting
//! the active [`KeywordTable`], and applies `[Configuration]` blocks as it
//! walks the stream so later keywords can be aliased mid-file.
//!
//! This keeps the lexer itself context-free: `tokenize()` never looks at
//! configuration, so it stays pure and restartable. Only this pass is
//! contextual, per the design note in spec.md §9.

use crate::config::Configuration;
use crate::token::{Keyword, Punct, Token, TokenKind};

fn keyword_for_canonical(name: &str) -> Option<Keyword> {
    Some(match name {
        "KEYWORD_TEXT" => Keyword::Text,
        "KEYWORD_STYLE" => Keyword::Style,
        "KEYWORD_SCRIPT" => Keyword::Script,
        "KEYWORD_TEMPLATE" => Keyword::Template,
        "KEYWORD_CUSTOM" => Keyword::Custom,
        "KEYWORD_ORIGIN" => Keyword::Origin,
        "KEYWORD_IMPORT" => Keyword::Import,
        "KEYWORD_NAMESPACE" => Keyword::Namespace,
        "KEYWORD_CONFIGURATION" => Keyword::Configuration,
        "KEYWORD_USE" => Keyword::Use,
        "KEYWORD_FROM" => Keyword::From,
        "KEYWORD_AS" => Keyword::As,
        "KEYWORD_DELETE" => Keyword::Delete,
        "KEYWORD_INSERT" => Keyword::Insert,
        "KEYWORD_AFTER" => Keyword::After,
        "KEYWORD_BEFORE" => Keyword::Before,
        "KEYWORD_INHERIT" => Keyword::Inherit,
        "KEYWORD_EXCEPT" => Keyword::Except,
        _ => return None,
    })
}

/// Walks `tokens` in order, converting identifiers that match the active
/// keyword table into `Keyword` tokens, and applying any `[Configuration]`
/// blocks encountered so keyword aliases and feature flags set early in a
/// file take effect for everything after them. `"html5"` as a bare
/// identifier (the `use html5;` / default-struct marker) is recognized
/// unconditionally since it has no alias slot in the configuration surface.
///
/// Returns the rewritten token stream and the configuration in effect after
/// the last token — the value the rest of the pipeline should use.
pub fn resolve_keywords(tokens: Vec<Token>, mut config: Configuration) -> (Vec<Token>, Configuration) {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if let TokenKind::BracketKeyword(name) = &token.kind {
            if name == "Configuration" {
                if let Some(end) = apply_configuration_block(&tokens, i, &mut config) {
                    // Emit the block's tokens unchanged (sans keyword
                    // rewriting, which configuration keys don't need) so the
                    // parser can still build a ConfigBlock AST node from them.
                    for t in &tokens[i..=end] {
                        out.push(t.clone());
                    }
                    i = end + 1;
                    continue;
                }
            }
        }
        out.push(resolve_one(token, &config));
        i += 1;
    }
    (out, config)
}

fn resolve_one(token: &Token, config: &Configuration) -> Token {
    if let TokenKind::Identifier(text) = &token.kind {
        if text == "html5" {
            return Token::new(TokenKind::Keyword(Keyword::Html5), token.start, token.end);
        }
        if let Some(canonical) = config.keywords.resolve(text) {
            if let Some(kw) = keyword_for_canonical(canonical) {
                return Token::new(TokenKind::Keyword(kw), token.start, token.end);
            }
        }
    }
    token.clone()
}

/// Given the index of a `[Configuration]` bracket-keyword token, find its
/// `{ ... }` body, apply every `KEY = value;` setting found inside (in
/// source order, so later settings in the same block win), and return the
/// index of the closing `}`. Returns `None` if the block is malformed (no
/// opening brace found) — the caller then falls through to ordinary
/// resolution and the parser will report the syntax error.
fn apply_configuration_block(tokens: &[Token], start: usize, config: &mut Configuration) -> Option<usize> {
    let mut i = start + 1;
    while i < tokens.len() && matches!(tokens[i].kind, TokenKind::LineComment(_) | TokenKind::BlockComment(_)) {
        i += 1;
    }
    if !matches!(tokens.get(i)?.kind, TokenKind::Punct(Punct::LBrace)) {
        return None;
    }
    let body_start = i;
    let mut depth = 0usize;
    let mut end = None;
    for (offset, t) in tokens[body_start..].iter().enumerate() {
        match &t.kind {
            TokenKind::Punct(Punct::LBrace) => depth += 1,
            TokenKind::Punct(Punct::RBrace) => {
                depth -= 1;
                if depth == 0 {
                    end = Some(body_start + offset);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;

    let mut j = body_start + 1;
    while j < end {
        let key = match &tokens[j].kind {
            TokenKind::Identifier(s) => s.clone(),
            _ => {
                j += 1;
                continue;
            }
        };
        let mut k = j + 1;
        if !matches!(tokens.get(k).map(|t| &t.kind), Some(TokenKind::Punct(Punct::Equals))) {
            j += 1;
            continue;
        }
        k += 1;
        let value = match tokens.get(k).map(|t| &t.kind) {
            Some(TokenKind::StringLiteral(v))
            | Some(TokenKind::UnquotedLiteral(v))
            | Some(TokenKind::NumberLiteral(v))
            | Some(TokenKind::Identifier(v)) => v.clone(),
            _ => {
                j = k;
                continue;
            }
        };
        config.apply_setting(&key, &value);
        j = k + 1;
    }

    Some(end)
}
