//! `Router { mode:'hash', url:'/a', page:{{#a}}, … }` -> a `routes` map plus
//! a `hashchange`-driven `navigate()` function.
//!
//! Grounded on `CHTLJSCompiler.cpp::parseRouterBlock`. Only `hash` mode is
//! supported in-core (spec.md §4.6).

use super::selector::convert_selector;
use super::support::{expect_lbrace, find_matching_close, ident_is, strip_quotes, Span};
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::position::SourcePosition;
use crate::token::Token;
use std::collections::BTreeMap;

const NAVIGATE_RUNTIME: &str = r#"
function navigate() {
    const path = window.location.hash.slice(1) || '/';
    const page = routes[path];
    for (const key in routes) {
        if (routes[key]) routes[key].style.display = 'none';
    }
    if (page) {
        page.style.display = 'block';
    }
}
window.addEventListener('hashchange', navigate);
navigate();
"#;

pub(crate) fn find_all(tokens: &[Token], source: &str, diagnostics: &mut Diagnostics) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if ident_is(&tokens[i], "Router") {
            if let Some(open_idx) = expect_lbrace(tokens, i + 1) {
                if let Some(close_idx) = find_matching_close(tokens, open_idx) {
                    let body = &source[tokens[open_idx].end.offset..tokens[close_idx].start.offset];
                    spans.push(Span {
                        start_byte: tokens[i].start.offset,
                        end_byte: tokens[close_idx].end.offset,
                        replacement: build(body, diagnostics),
                    });
                    i = close_idx + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    spans
}

fn build(content: &str, diagnostics: &mut Diagnostics) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut pos = 0usize;
    let mut mode = "hash".to_string();
    let mut current_url: Option<String> = None;
    let mut routes: BTreeMap<String, String> = BTreeMap::new();

    while pos < chars.len() {
        while pos < chars.len() && (chars[pos].is_whitespace() || chars[pos] == ',') {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        let Some(colon_rel) = chars[pos..].iter().position(|&c| c == ':') else {
            break;
        };
        let colon = pos + colon_rel;
        let key: String = chars[pos..colon].iter().collect::<String>().trim().to_string();

        let mut value_start = colon + 1;
        while value_start < chars.len() && chars[value_start].is_whitespace() {
            value_start += 1;
        }
        if value_start >= chars.len() {
            break;
        }

        let value_end = if chars[value_start] == '\'' || chars[value_start] == '"' {
            let quote = chars[value_start];
            chars[value_start + 1..]
                .iter()
                .position(|&c| c == quote)
                .map(|p| value_start + 1 + p + 1)
                .unwrap_or(chars.len())
        } else if chars.get(value_start) == Some(&'{') && chars.get(value_start + 1) == Some(&'{') {
            find_double_brace_close(&chars, value_start).map(|p| p + 2).unwrap_or(chars.len())
        } else {
            chars[value_start..]
                .iter()
                .position(|&c| c == ',' || c.is_whitespace())
                .map(|p| value_start + p)
                .unwrap_or(chars.len())
        };

        let raw_value: String = chars[value_start..value_end]
            .iter()
            .collect::<String>()
            .trim_end_matches([' ', '\t', '\r', '\n', ','])
            .trim()
            .to_string();
        let value = strip_quotes(&raw_value);

        match key.as_str() {
            "url" => current_url = Some(value),
            "page" => {
                if let Some(url) = current_url.take() {
                    routes.insert(url, value);
                }
            }
            "mode" => mode = value,
            _ => {}
        }

        pos = value_end;
    }

    if routes.is_empty() {
        diagnostics.warning(DiagnosticCategory::Semantic, SourcePosition::start(), "Router requires at least one url/page route");
        return "console.error(\"CHTL JS Router Error: No routes were defined.\");\n".to_string();
    }
    if mode != "hash" {
        diagnostics.warning(
            DiagnosticCategory::Semantic,
            SourcePosition::start(),
            format!("Router mode '{}' is not supported — only 'hash' is", mode),
        );
        return "console.error(\"CHTL JS Router Error: Only 'hash' mode is currently supported.\");\n".to_string();
    }

    let mut js = String::from("const routes = {\n");
    for (url, page) in &routes {
        let compiled_page = if let Some(sel) = page.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
            convert_selector(sel)
        } else {
            page.clone()
        };
        js.push_str(&format!("  '{}': {},\n", url, compiled_page));
    }
    js.push_str("};\n");
    js.push_str(NAVIGATE_RUNTIME);
    js
}

fn find_double_brace_close(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '}' && chars[i + 1] == '}' {
            return Some(i);
        }
        i += 1;
    }
    None
}
