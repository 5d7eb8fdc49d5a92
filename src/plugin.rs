//! C8: the plugin registry consulted by the CHTL-JS sub-compiler (spec.md
//! §4.7) before its own built-in recognizers run.
//!
//! Grounded on the argument-slot model in
//! `examples/original_source/src/CJMOD/Syntax.cpp` and
//! `Arg.cpp`/`AtomArg.cpp`: a pattern is a sequence of atomic tokens, each
//! either a literal that must match verbatim or a value placeholder
//! carrying one of four flags. The core only owns the data types and
//! dispatch (spec.md's Non-goals rule out loading a `.cjmod` archive's
//! actual code) — registration is the embedder's job.

use crate::token::{Token, TokenKind};
use std::fmt;
use std::sync::Arc;

/// How a placeholder slot participates in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFlag {
    /// `$!` — must be present.
    Required,
    /// `$?` — may be absent.
    Optional,
    /// `$_` — may appear out of the declared order relative to siblings.
    Unordered,
    /// `$…` — captures every remaining token up to the next literal.
    Variadic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    Literal(String),
    Slot(ArgFlag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub keyword: String,
    pub tokens: Vec<PatternToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternParseError {
    Empty,
    UnknownFlag(String),
}

impl fmt::Display for PatternParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternParseError::Empty => write!(f, "plugin pattern must name a keyword"),
            PatternParseError::UnknownFlag(s) => write!(f, "unrecognized placeholder flag in '{}'", s),
        }
    }
}

impl std::error::Error for PatternParseError {}

impl Pattern {
    /// Parses `"$ ** $"`-style pattern text: whitespace-separated atoms,
    /// the first of which is the dispatch keyword. A bare `$` defaults to
    /// `Required`; `$?`/`$!`/`$_`/`$…` pick a flag explicitly. Every other
    /// atom is a literal token matched verbatim against source text.
    pub fn parse(keyword: &str, pattern: &str) -> Result<Self, PatternParseError> {
        if keyword.trim().is_empty() {
            return Err(PatternParseError::Empty);
        }
        let mut tokens = Vec::new();
        for atom in pattern.split_whitespace() {
            if let Some(rest) = atom.strip_prefix('$') {
                let flag = match rest {
                    "" | "!" => ArgFlag::Required,
                    "?" => ArgFlag::Optional,
                    "_" => ArgFlag::Unordered,
                    "…" | "..." => ArgFlag::Variadic,
                    other => return Err(PatternParseError::UnknownFlag(other.to_string())),
                };
                tokens.push(PatternToken::Slot(flag));
            } else {
                tokens.push(PatternToken::Literal(atom.to_string()));
            }
        }
        Ok(Self { keyword: keyword.to_string(), tokens })
    }
}

pub type TransformFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

#[derive(Clone)]
pub struct PluginEntry {
    pub pattern: Pattern,
    pub transform: TransformFn,
}

/// A successful dispatch: the token range matched (exclusive end) and the
/// replacement text produced by the transform.
pub struct PluginMatch {
    pub token_count: usize,
    pub replacement: String,
}

/// Process-local, keyword-keyed registry (spec.md §4.7). Read-only during a
/// compile, so `&PluginRegistry` is safely shared across threads once
/// registration is complete (spec.md §5).
#[derive(Default, Clone)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: Pattern, transform: TransformFn) {
        self.entries.push(PluginEntry { pattern, transform });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tries every registered entry whose keyword matches `tokens[start]`'s
    /// text, greedily walking the declared pattern against the following
    /// tokens. Returns the first entry whose pattern fully matches.
    pub fn try_match(&self, tokens: &[Token], start: usize) -> Option<PluginMatch> {
        let first = tokens.get(start)?;
        if first.is_eof() {
            return None;
        }
        let first_text = token_text(first);
        for entry in &self.entries {
            if entry.pattern.keyword != first_text {
                continue;
            }
            if let Some((count, args)) = match_pattern(&entry.pattern.tokens, tokens, start) {
                return Some(PluginMatch {
                    token_count: count,
                    replacement: (entry.transform)(&args),
                });
            }
        }
        None
    }
}

/// Walks `pattern` against `tokens[start..]`. The keyword itself is
/// `pattern[0]`, a literal that's already been matched by the caller via
/// `first_text`, so it still participates here for uniformity. Each `Slot`
/// consumes one token's text unless `Variadic`, which consumes tokens until
/// the next literal pattern entry is found (or end of stream).
fn match_pattern(pattern: &[PatternToken], tokens: &[Token], start: usize) -> Option<(usize, Vec<String>)> {
    let mut args = Vec::new();
    let mut tok_idx = start;
    let mut pat_idx = 0;
    while pat_idx < pattern.len() {
        match &pattern[pat_idx] {
            PatternToken::Literal(lit) => {
                let text = token_text(tokens.get(tok_idx)?);
                if text != *lit {
                    return None;
                }
                tok_idx += 1;
            }
            PatternToken::Slot(ArgFlag::Variadic) => {
                let next_literal = pattern[pat_idx + 1..].iter().find_map(|p| match p {
                    PatternToken::Literal(l) => Some(l.as_str()),
                    _ => None,
                });
                let mut captured = Vec::new();
                while let Some(tok) = tokens.get(tok_idx) {
                    if matches!(tok.kind, TokenKind::Eof) {
                        break;
                    }
                    let text = token_text(tok);
                    if Some(text.as_str()) == next_literal {
                        break;
                    }
                    captured.push(text);
                    tok_idx += 1;
                }
                args.push(captured.join(" "));
            }
            PatternToken::Slot(ArgFlag::Optional) => {
                if let Some(tok) = tokens.get(tok_idx) {
                    if !matches!(tok.kind, TokenKind::Eof) {
                        args.push(token_text(tok));
                        tok_idx += 1;
                    }
                }
            }
            PatternToken::Slot(ArgFlag::Required) | PatternToken::Slot(ArgFlag::Unordered) => {
                let tok = tokens.get(tok_idx)?;
                if matches!(tok.kind, TokenKind::Eof) {
                    return None;
                }
                args.push(token_text(tok));
                tok_idx += 1;
            }
        }
        pat_idx += 1;
    }
    Some((tok_idx - start, args))
}

/// Plugin keyword/literal atoms are ordinary identifiers in practice; this
/// also covers the rarer case of a pattern literal that happens to collide
/// with a reserved keyword or a punctuation spelling.
fn token_text(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Punct(p) => p.as_str().to_string(),
        TokenKind::Keyword(k) => format!("{:?}", k),
        _ => tok.text().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn parses_pattern_with_mixed_flags() {
        let pattern = Pattern::parse("Highlight", "$! ** $?").unwrap();
        assert_eq!(
            pattern.tokens,
            vec![
                PatternToken::Slot(ArgFlag::Required),
                PatternToken::Literal("**".to_string()),
                PatternToken::Slot(ArgFlag::Optional),
            ]
        );
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Pattern::parse("Highlight", "$@").is_err());
    }

    #[test]
    fn dispatch_matches_keyword_and_fills_slots() {
        let mut registry = PluginRegistry::new();
        let pattern = Pattern::parse("Highlight", "Highlight $! color $!").unwrap();
        registry.register(
            pattern,
            Arc::new(|args: &[String]| format!("/* highlight {} as {} */", args[0], args[1])),
        );
        let tokens = tokenize("Highlight target color red ;");
        let m = registry.try_match(&tokens, 0).expect("should match");
        assert_eq!(m.replacement, "/* highlight target as red */");
        assert_eq!(m.token_count, 4);
    }

    #[test]
    fn non_matching_keyword_returns_none() {
        let registry = PluginRegistry::new();
        let tokens = tokenize("Whatever x");
        assert!(registry.try_match(&tokens, 0).is_none());
    }
}
