//! C3: the main parser. Turns a keyword-resolved token stream into AST
//! nodes (owned by an [`Arena`]) plus side-effecting registrations into a
//! [`SymbolEnvironment`], per spec.md §4.3.
//!
//! Split by concern the way the grammar sketch is split: `element.rs` for
//! element/attribute/text bodies, `style.rs` for style blocks (which hand
//! off to C2 for value expressions), `template.rs` for template/custom
//! definitions and usages, `directives.rs` for Origin/Import/Namespace/
//! Configuration.

pub mod directives;
pub mod element;
pub mod style;
pub mod template;

use crate::ast::{Arena, CommentKind, Node, NodeId};
use crate::config::Configuration;
use crate::diagnostics::Diagnostics;
use crate::position::SourcePosition;
use crate::symbols::SymbolEnvironment;
use crate::token::{Punct, Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token],
    /// The original source text, kept alongside the token stream so verbatim
    /// regions (`script { ... }`, `[Origin] { ... }`) can be sliced by byte
    /// offset instead of re-serialized from tokens.
    source: &'a str,
    pos: usize,
    pub arena: Arena,
    pub symbols: SymbolEnvironment,
    pub diagnostics: Diagnostics,
    pub config: Configuration,
}

pub struct ParseOutput {
    pub arena: Arena,
    pub symbols: SymbolEnvironment,
    pub top_level: Vec<NodeId>,
    pub diagnostics: Diagnostics,
    pub config: Configuration,
}

/// Sentinel "already diagnosed" error used internally so callers can bail
/// out of a production without duplicating the diagnostic.
pub(crate) type PResult<T> = Result<T, ()>;

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str, config: Configuration) -> Self {
        Self {
            tokens,
            source,
            pos: 0,
            arena: Arena::new(),
            symbols: SymbolEnvironment::new(),
            diagnostics: Diagnostics::new(),
            config,
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        let mut top_level = Vec::new();
        while !self.at_eof() {
            self.skip_insignificant_comments();
            if self.at_eof() {
                break;
            }
            match self.parse_top_level() {
                Ok(Some(id)) => top_level.push(id),
                Ok(None) => {}
                Err(()) => self.synchronize(),
            }
        }
        ParseOutput {
            arena: self.arena,
            symbols: self.symbols,
            top_level,
            diagnostics: self.diagnostics,
            config: self.config,
        }
    }

    fn parse_top_level(&mut self) -> PResult<Option<NodeId>> {
        match self.peek_kind().cloned() {
            Some(TokenKind::BracketKeyword(name)) => match name.as_str() {
                "Template" => template::parse_template_def(self, false).map(Some),
                "Custom" => template::parse_template_def(self, true).map(Some),
                "Origin" => directives::parse_origin(self).map(Some),
                "Import" => directives::parse_import(self).map(Some),
                "Namespace" => directives::parse_namespace(self).map(Some),
                "Configuration" => directives::parse_config_block(self).map(Some),
                other => {
                    self.error(format!("unexpected bracket keyword '[{}]' at top level", other));
                    Err(())
                }
            },
            Some(TokenKind::GeneratorComment(text)) => {
                let position = self.advance().unwrap().start;
                Ok(Some(self.arena.alloc(Node::Comment {
                    content: text,
                    kind: CommentKind::Generator,
                    position,
                })))
            }
            Some(TokenKind::Keyword(crate::token::Keyword::Use)) => {
                directives::parse_use_statement(self)?;
                Ok(None)
            }
            Some(TokenKind::Identifier(_)) => element::parse_element(self).map(Some),
            Some(other) => {
                self.error(format!("unexpected token {:?} at top level", other));
                Err(())
            }
            None => Ok(None),
        }
    }

    /// Skip (and discard) silent line/block comments wherever they may
    /// appear between significant tokens.
    pub(crate) fn skip_insignificant_comments(&mut self) {
        while matches!(
            self.peek_kind(),
            Some(TokenKind::LineComment(_)) | Some(TokenKind::BlockComment(_))
        ) {
            self.advance();
        }
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    pub(crate) fn peek_punct(&self) -> Option<Punct> {
        match self.peek_kind() {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    pub(crate) fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn current_position(&self) -> SourcePosition {
        self.peek()
            .map(|t| t.start)
            .or_else(|| self.tokens.last().map(|t| t.end))
            .unwrap_or_default()
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.diagnostics
            .error(crate::diagnostics::DiagnosticCategory::Syntactic, self.current_position(), message);
    }

    pub(crate) fn expect_punct(&mut self, p: Punct) -> PResult<SourcePosition> {
        if self.peek_punct() == Some(p) {
            let pos = self.advance().unwrap().start;
            Ok(pos)
        } else {
            self.error(format!("expected '{}'", p.as_str()));
            Err(())
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> PResult<String> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Identifier(s)) => {
                self.advance();
                Ok(s)
            }
            _ => {
                self.error("expected an identifier");
                Err(())
            }
        }
    }

    pub(crate) fn expect_at_identifier(&mut self) -> PResult<String> {
        match self.peek_kind().cloned() {
            Some(TokenKind::AtIdentifier(s)) => {
                self.advance();
                Ok(s)
            }
            _ => {
                self.error("expected an '@'-identifier");
                Err(())
            }
        }
    }

    pub(crate) fn expect_string_or_unquoted(&mut self) -> PResult<String> {
        match self.peek_kind().cloned() {
            Some(TokenKind::StringLiteral(s)) => {
                self.advance();
                Ok(s)
            }
            Some(TokenKind::Eof) | None => {
                self.error("expected a string or literal value");
                Err(())
            }
            _ => {
                let text = self.scan_unquoted_run(&[';'], true);
                if text.is_empty() {
                    self.error("expected a string or literal value");
                    return Err(());
                }
                Ok(text)
            }
        }
    }

    /// Error recovery: skip tokens while tracking brace nesting, resuming
    /// at a depth-0 boundary (spec.md §4.3 "Recovery policy").
    pub(crate) fn synchronize(&mut self) {
        let mut depth: i32 = 0;
        loop {
            match self.peek_punct() {
                Some(Punct::LBrace) => {
                    depth += 1;
                    self.advance();
                }
                Some(Punct::RBrace) => {
                    self.advance();
                    depth -= 1;
                    if depth <= 0 {
                        return;
                    }
                }
                Some(Punct::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                None => return,
                _ => {
                    if self.at_eof() {
                        return;
                    }
                    self.advance();
                }
            }
        }
    }

    /// Collects a raw token slice up to (not including) the matching close
    /// brace of an already-consumed opening brace, for verbatim bodies
    /// (`script { ... }`, `[Origin] { ... }`).
    pub(crate) fn collect_until_matching_brace(&mut self) -> &'a [Token] {
        let start = self.pos;
        let mut depth = 1;
        while depth > 0 {
            match self.peek_punct() {
                Some(Punct::LBrace) => depth += 1,
                Some(Punct::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                None => break,
                _ => {}
            }
            if self.advance().is_none() {
                break;
            }
        }
        let slice = &self.tokens[start..self.pos];
        self.advance();
        slice
    }

    /// Collects tokens up to (not including) the next top-level `;` — a
    /// value expression never contains unparenthesized semicolons, so
    /// paren-depth is the only nesting that matters here.
    pub(crate) fn collect_tokens_until_semicolon(&mut self) -> &'a [Token] {
        let start = self.pos;
        let mut paren_depth: i32 = 0;
        loop {
            match self.peek_punct() {
                Some(Punct::LParen) => paren_depth += 1,
                Some(Punct::RParen) => paren_depth -= 1,
                Some(Punct::Semicolon) if paren_depth <= 0 => break,
                None => break,
                _ => {}
            }
            if self.advance().is_none() {
                break;
            }
        }
        &self.tokens[start..self.pos]
    }

    /// Like [`Self::collect_until_matching_brace`], but returns the exact
    /// source substring spanned by the body (whitespace, comments and all)
    /// instead of a token slice — what `script { ... }` and
    /// `[Origin] { ... }` bodies need to stay byte-for-byte verbatim.
    pub(crate) fn collect_raw_until_matching_brace(&mut self) -> String {
        let start = self.current_position();
        let mut depth = 1;
        while depth > 0 {
            match self.peek_punct() {
                Some(Punct::LBrace) => depth += 1,
                Some(Punct::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                None => break,
                _ => {}
            }
            if self.advance().is_none() {
                break;
            }
        }
        let end = self.current_position();
        self.advance();
        self.source
            .get(start.offset..end.offset)
            .unwrap_or_default()
            .to_string()
    }

    /// Scans an unquoted literal: a raw run of source characters starting
    /// at the current token, stopping before `\n`, `{`, `}`, anything in
    /// `terminators`, or (when `stop_at_whitespace`) the first space/tab
    /// (spec.md §4.1: "a sequence of non-terminator characters used for
    /// CSS values and attribute values"). Recognizing this is inherently
    /// contextual — only a production that already knows quoting is
    /// optional here should call it — so it lives on the parser rather
    /// than the lexer, which stays a context-free, token-shape-driven pass
    /// (spec.md §9). Resyncs the token cursor past whatever already-lexed
    /// tokens the scanned span covers.
    pub(crate) fn scan_unquoted_run(&mut self, terminators: &[char], stop_at_whitespace: bool) -> String {
        let start = self.current_position().offset;
        let mut end = start;
        for ch in self.source[start..].chars() {
            if ch == '\n' || ch == '{' || ch == '}' || terminators.contains(&ch) {
                break;
            }
            if stop_at_whitespace && ch.is_whitespace() {
                break;
            }
            end += ch.len_utf8();
        }
        while let Some(t) = self.peek() {
            if t.start.offset < end {
                self.advance();
            } else {
                break;
            }
        }
        self.source.get(start..end).unwrap_or_default().trim().to_string()
    }
}
