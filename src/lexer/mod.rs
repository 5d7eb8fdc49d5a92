//! C1: character-precise tokenization.
//!
//! The lexer is pure and restartable: the same input string always produces
//! the same token stream, and it never panics on malformed input — it emits
//! a [`crate::token::TokenKind::Error`] token and advances one character.

pub mod keywords;

use crate::position::SourcePosition;
use crate::token::{Keyword, Punct, Token, TokenKind};

pub use keywords::resolve_keywords;

/// Character-cursor tokenizer. One `Lexer` is consumed by a single
/// `tokenize()` call; it holds no keyword knowledge — that's layered on by
/// [`resolve_keywords`] afterwards.
pub struct Lexer {
    input: Vec<char>,
    index: usize,
    pos: SourcePosition,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            input: source.chars().collect(),
            index: 0,
            pos: SourcePosition::start(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_insignificant_whitespace();
            if self.is_at_end() {
                break;
            }
            let start = self.pos;
            let token = self.next_token(start);
            tokens.push(token);
        }
        let eof_pos = self.pos;
        tokens.push(Token::new(TokenKind::Eof, eof_pos, eof_pos));
        tokens
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        self.pos.advance(ch);
        Some(ch)
    }

    /// Space and tab are discarded silently; newlines are significant only
    /// for line/column bookkeeping (CHTL has no indentation grammar).
    fn skip_insignificant_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self, start: SourcePosition) -> Token {
        let ch = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, start, start),
        };

        if ch == '/' && self.peek_at(1) == Some('/') {
            return self.read_line_comment(start);
        }
        if ch == '/' && self.peek_at(1) == Some('*') {
            return self.read_block_comment(start);
        }
        if ch == '#' {
            return self.read_hash(start);
        }
        if ch == '"' || ch == '\'' {
            return self.read_string(start, ch);
        }
        if ch.is_ascii_digit() {
            return self.read_number(start);
        }
        if ch == '@' {
            return self.read_at_identifier(start);
        }
        if ch == '[' {
            if let Some(tok) = self.try_read_bracket_keyword(start) {
                return tok;
            }
        }
        if is_identifier_start(ch) {
            return self.read_identifier(start);
        }
        self.read_punct(start)
    }

    fn read_line_comment(&mut self, start: SourcePosition) -> Token {
        self.advance(); // '/'
        self.advance(); // '/'
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::LineComment(text), start, self.pos)
    }

    fn read_block_comment(&mut self, start: SourcePosition) -> Token {
        self.advance(); // '/'
        self.advance(); // '*'
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Token::new(
                        TokenKind::Error("unterminated block comment".to_string()),
                        start,
                        self.pos,
                    );
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
        Token::new(TokenKind::BlockComment(text), start, self.pos)
    }

    /// `#` starts a generator comment only when followed by whitespace (or
    /// end of input); immediately followed by an identifier character it's
    /// the CSS id-selector punctuation (`#box`, `{{#btn}}`).
    fn read_hash(&mut self, start: SourcePosition) -> Token {
        let next = self.peek_at(1);
        let looks_like_comment = matches!(next, None | Some(' ') | Some('\t') | Some('\n') | Some('\r'));
        if !looks_like_comment {
            self.advance();
            return Token::new(TokenKind::Punct(Punct::Hash), start, self.pos);
        }
        self.advance(); // '#'
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::GeneratorComment(text), start, self.pos)
    }

    fn read_string(&mut self, start: SourcePosition, quote: char) -> Token {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Token::new(
                        TokenKind::Error("unterminated string literal".to_string()),
                        start,
                        self.pos,
                    );
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some('\'') => text.push('\''),
                        Some(other) => text.push(other),
                        None => {
                            return Token::new(
                                TokenKind::Error("unterminated string literal".to_string()),
                                start,
                                self.pos,
                            );
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Token::new(TokenKind::StringLiteral(text), start, self.pos)
    }

    fn read_number(&mut self, start: SourcePosition) -> Token {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) {
                seen_dot = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::NumberLiteral(text), start, self.pos)
    }

    fn read_at_identifier(&mut self, start: SourcePosition) -> Token {
        self.advance(); // '@'
        let mut text = String::from("@");
        while let Some(ch) = self.peek() {
            if is_identifier_continue(ch) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if text == "@" {
            return Token::new(
                TokenKind::Error("'@' not followed by an identifier".to_string()),
                start,
                self.pos,
            );
        }
        Token::new(TokenKind::AtIdentifier(text), start, self.pos)
    }

    /// `[` immediately followed by an identifier and `]`, with no
    /// intervening whitespace. Returns `None` (leaving the cursor untouched)
    /// if the lookahead doesn't match, so the caller falls through to plain
    /// punctuation.
    fn try_read_bracket_keyword(&mut self, start: SourcePosition) -> Option<Token> {
        let mut offset = 1;
        if !matches!(self.peek_at(offset), Some(c) if is_identifier_start(c)) {
            return None;
        }
        let ident_start = offset;
        while matches!(self.peek_at(offset), Some(c) if is_identifier_continue(c)) {
            offset += 1;
        }
        if self.peek_at(offset) != Some(']') {
            return None;
        }
        let name: String = (ident_start..offset)
            .map(|i| self.peek_at(i).unwrap())
            .collect();
        for _ in 0..=offset {
            self.advance();
        }
        Some(Token::new(TokenKind::BracketKeyword(name), start, self.pos))
    }

    fn read_identifier(&mut self, start: SourcePosition) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if is_identifier_continue(ch) {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Identifier(text), start, self.pos)
    }

    fn read_punct(&mut self, start: SourcePosition) -> Token {
        let ch = self.advance().expect("checked by caller");
        let punct = match ch {
            '{' if self.peek() == Some('{') => {
                self.advance();
                Punct::LDoubleBrace
            }
            '}' if self.peek() == Some('}') => {
                self.advance();
                Punct::RDoubleBrace
            }
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            ':' => Punct::Colon,
            ';' => Punct::Semicolon,
            '=' if self.peek() == Some('=') => {
                self.advance();
                Punct::EqEq
            }
            '=' => Punct::Equals,
            ',' => Punct::Comma,
            '.' => Punct::Dot,
            '#' => Punct::Hash,
            '&' if self.peek() == Some('-') && self.peek_at(1) == Some('>') => {
                self.advance();
                self.advance();
                Punct::AmpArrow
            }
            '&' if self.peek() == Some('&') => {
                self.advance();
                Punct::AndAnd
            }
            '&' => Punct::Amp,
            '+' => Punct::Plus,
            '-' if self.peek() == Some('>') => {
                self.advance();
                Punct::Arrow
            }
            '-' => Punct::Minus,
            '*' if self.peek() == Some('*') => {
                self.advance();
                Punct::StarStar
            }
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '>' if self.peek() == Some('=') => {
                self.advance();
                Punct::GreaterEq
            }
            '>' => Punct::Greater,
            '<' if self.peek() == Some('=') => {
                self.advance();
                Punct::LessEq
            }
            '<' => Punct::Less,
            '?' => Punct::Question,
            '!' if self.peek() == Some('=') => {
                self.advance();
                Punct::NotEq
            }
            '!' => Punct::Bang,
            '|' if self.peek() == Some('|') => {
                self.advance();
                Punct::OrOr
            }
            other => {
                return Token::new(
                    TokenKind::Error(format!("unexpected character '{}'", other)),
                    start,
                    self.pos,
                );
            }
        };
        Token::new(TokenKind::Punct(punct), start, self.pos)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Tokenize `source`, returning the raw token stream with no keyword
/// resolution applied (every identifier is still `TokenKind::Identifier`).
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
