//! `targetExpr -> Listen { event: handler, … }` and
//! `parentExpr -> Delegate { target: 'sel', event: handler, … }`.
//!
//! Grounded on `CHTLJSCompiler.cpp::compileListenFunctions` /
//! `compileDelegateFunctions` / `parseDelegateBlock`.

use super::selector::convert_selector;
use super::support::{find_matching_close, ident_text, is_punct, strip_quotes, Span};
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::position::SourcePosition;
use crate::token::{Punct, Token, TokenKind};

enum Form {
    Listen,
    Delegate,
}

pub(crate) fn find_all(tokens: &[Token], source: &str, diagnostics: &mut Diagnostics) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if is_punct(&tokens[i], Punct::Arrow) {
            let form = tokens.get(i + 1).and_then(ident_text).and_then(|name| match name {
                "Listen" => Some(Form::Listen),
                "Delegate" => Some(Form::Delegate),
                _ => None,
            });
            if let Some(form) = form {
                if let Some(target_start) = capture_target(tokens, i) {
                    if is_punct(&tokens[i + 2], Punct::LBrace) {
                        let open_idx = i + 2;
                        if let Some(close_idx) = find_matching_close(tokens, open_idx) {
                            let target_text = super::support::raw_text(tokens, source, target_start, i);
                            let body = &source[tokens[open_idx].end.offset..tokens[close_idx].start.offset];
                            let replacement = match form {
                                Form::Listen => build_listen(&target_text, body),
                                Form::Delegate => build_delegate(&target_text, body, diagnostics),
                            };
                            spans.push(Span {
                                start_byte: tokens[target_start].start.offset,
                                end_byte: tokens[close_idx].end.offset,
                                replacement,
                            });
                            i = close_idx + 1;
                            continue;
                        }
                    }
                }
            }
        }
        i += 1;
    }
    spans
}

/// Walks backward from the `Arrow` token at `arrow_idx` to find the start of
/// its target expression: either a balanced `{{ ... }}` group or a dotted
/// identifier chain (`a.b.c`).
fn capture_target(tokens: &[Token], arrow_idx: usize) -> Option<usize> {
    if arrow_idx == 0 {
        return None;
    }
    let prev = arrow_idx - 1;
    if is_punct(&tokens[prev], Punct::RDoubleBrace) {
        let mut j = prev;
        while j > 0 {
            j -= 1;
            if is_punct(&tokens[j], Punct::LDoubleBrace) {
                return Some(j);
            }
        }
        return None;
    }
    if !matches!(tokens[prev].kind, TokenKind::Identifier(_)) {
        return None;
    }
    let mut start = prev;
    while start > 1 {
        let dot = start - 1;
        if is_punct(&tokens[dot], Punct::Dot) && matches!(tokens[dot - 1].kind, TokenKind::Identifier(_)) {
            start = dot - 1;
        } else {
            break;
        }
    }
    Some(start)
}

/// Splits a `key: value, key2: value2` body into pairs, honoring `{}`
/// nesting inside a value (so a handler written as an inline arrow function
/// doesn't get cut at its own commas).
fn parse_pairs(body: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = body.chars().collect();
    let mut pairs = Vec::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        let Some(colon_rel) = chars[pos..].iter().position(|&c| c == ':') else {
            break;
        };
        let colon = pos + colon_rel;
        let key: String = chars[pos..colon].iter().collect::<String>().trim().to_string();
        if key.is_empty() {
            pos = colon + 1;
            continue;
        }
        let mut value_start = colon + 1;
        while value_start < chars.len() && chars[value_start].is_whitespace() {
            value_start += 1;
        }
        let mut value_end = value_start;
        let mut depth = 0i32;
        while value_end < chars.len() {
            match chars[value_end] {
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                ',' if depth == 0 => break,
                _ => {}
            }
            value_end += 1;
        }
        let handler: String = chars[value_start..value_end].iter().collect::<String>().trim().to_string();
        if !handler.is_empty() {
            pairs.push((key, handler));
        }
        pos = value_end + 1;
    }
    pairs
}

fn build_listen(target: &str, body: &str) -> String {
    let mut out = String::new();
    for (event, handler) in parse_pairs(body) {
        out.push_str(&format!("{}.addEventListener('{}', {});\n", target, strip_quotes(&event), handler));
    }
    out
}

fn build_delegate(target: &str, body: &str, diagnostics: &mut Diagnostics) -> String {
    let mut delegated_selector = None;
    let mut handlers = Vec::new();
    for (key, value) in parse_pairs(body) {
        if key == "target" {
            delegated_selector = Some(strip_quotes(&value));
        } else {
            handlers.push((key, value));
        }
    }
    let Some(delegated_selector) = delegated_selector else {
        diagnostics.warning(
            DiagnosticCategory::Semantic,
            SourcePosition::start(),
            "Delegate requires a 'target' property naming the delegated selector",
        );
        return "console.error(\"CHTL JS Delegate Error: 'target' property is required.\");\n".to_string();
    };
    let delegated_selector = if let Some(sel) = delegated_selector.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
        convert_selector(sel)
    } else {
        format!("'{}'", delegated_selector)
    };

    let mut out = String::new();
    out.push_str(&format!("const parent_elem = {};\n", target));
    out.push_str("if (parent_elem) {\n");
    for (event, handler) in handlers {
        out.push_str(&format!("  parent_elem.addEventListener('{}', (event) => {{\n", strip_quotes(&event)));
        out.push_str(&format!("    if (event.target.matches({})) {{\n", delegated_selector));
        out.push_str(&format!("      ({})(event);\n", handler));
        out.push_str("    }\n  });\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn listen_emits_one_add_event_listener_per_pair() {
        let source = "myButton -> Listen { click: onClick, mouseover: onHover };";
        let tokens = tokenize(source);
        let mut diags = Diagnostics::new();
        let spans = find_all(&tokens, source, &mut diags);
        assert_eq!(spans.len(), 1);
        let r = &spans[0].replacement;
        assert!(r.contains("myButton.addEventListener('click', onClick);"));
        assert!(r.contains("myButton.addEventListener('mouseover', onHover);"));
    }

    #[test]
    fn delegate_requires_target() {
        let source = "list -> Delegate { click: onClick };";
        let tokens = tokenize(source);
        let mut diags = Diagnostics::new();
        let spans = find_all(&tokens, source, &mut diags);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].replacement.contains("Delegate Error"));
        assert!(!diags.has_errors());
        assert!(!diags.is_empty());
    }

    #[test]
    fn double_brace_target_is_captured_whole() {
        let source = "{{.box}} -> Listen { click: onClick };";
        let tokens = tokenize(source);
        let mut diags = Diagnostics::new();
        let spans = find_all(&tokens, source, &mut diags);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].replacement.starts_with("{{.box}}.addEventListener"));
    }
}
