//! `ScriptLoader { load: 'a.js', 'b.js'; load: 'c.js'; }` -> a self-invoking
//! function that appends one `<script>` element per path.
//!
//! Grounded on `CHTLJSCompiler.cpp::parseScriptLoaderBlock`.

use super::support::{expect_lbrace, find_matching_close, ident_is, strip_quotes, Span};
use crate::token::Token;

pub(crate) fn find_all(tokens: &[Token], source: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if ident_is(&tokens[i], "ScriptLoader") {
            if let Some(open_idx) = expect_lbrace(tokens, i + 1) {
                if let Some(close_idx) = find_matching_close(tokens, open_idx) {
                    let body = &source[tokens[open_idx].end.offset..tokens[close_idx].start.offset];
                    spans.push(Span {
                        start_byte: tokens[i].start.offset,
                        end_byte: tokens[close_idx].end.offset,
                        replacement: build(body),
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

fn build(content: &str) -> String {
    let mut js = String::from("(function() {\n");
    let mut counter = 0usize;
    let mut search_from = 0usize;
    while let Some(rel) = content[search_from..].find("load:") {
        let load_pos = search_from + rel;
        let after_colon = load_pos + "load:".len();
        let Some(value_start_rel) = content[after_colon..].find(|c: char| !c.is_whitespace()) else {
            break;
        };
        let value_start = after_colon + value_start_rel;
        let value_end = content[value_start..]
            .find(|c: char| c == ';' || c == '\n')
            .map(|p| value_start + p)
            .unwrap_or(content.len());
        for raw_path in content[value_start..value_end].split(',') {
            let path = strip_quotes(raw_path.trim());
            if path.is_empty() {
                continue;
            }
            js.push_str(&format!("  const script{counter} = document.createElement('script');\n"));
            js.push_str(&format!("  script{counter}.src = '{path}';\n"));
            js.push_str(&format!("  document.head.appendChild(script{counter});\n"));
            counter += 1;
        }
        search_from = value_end;
    }
    js.push_str("})();\n");
    js
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn builds_one_script_tag_per_path() {
        let source = "ScriptLoader { load: 'a.js', 'b.js'; }";
        let tokens = tokenize(source);
        let spans = find_all(&tokens, source);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].replacement.contains("script0.src = 'a.js';"));
        assert!(spans[0].replacement.contains("script1.src = 'b.js';"));
        assert!(spans[0].replacement.contains("document.head.appendChild(script1);"));
    }
}
