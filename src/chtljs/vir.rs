//! `Vir name = iNeverAway { Signature: function(…){…}, … };` followed by
//! `name -> Signature(args)`.
//!
//! A preprocessing pass, run before every other recognizer: each method is
//! hoisted to a uniquely-named global `const`, call sites are rewritten to
//! call it directly, and the `Vir` declaration itself is erased. Not
//! present in `examples/original_source/` — `CHTLJSCompiler.cpp` never grew
//! a `Vir` form — so this is modeled directly on spec.md §4.6's recognized
//! forms table, in the same token-scan-then-splice style as the other
//! recognizers.

use super::support::{
    find_matching_close, ident_text, is_punct_at, raw_text, split_key_value, split_top_level_commas, splice, Span,
};
use crate::diagnostics::Diagnostics;
use crate::token::{Punct, TokenKind};
use std::collections::HashMap;

pub(crate) fn hoist(content: &str, _diagnostics: &mut Diagnostics) -> String {
    let tokens = crate::lexer::tokenize(content);
    let mut spans: Vec<Span> = Vec::new();
    let mut registry: HashMap<(String, String), String> = HashMap::new();

    let mut i = 0;
    while i < tokens.len() {
        let is_decl_start = matches!(&tokens[i].kind, TokenKind::Identifier(s) if s == "Vir")
            && matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::Identifier(_)))
            && is_punct_at(&tokens, i + 2, Punct::Equals)
            && matches!(tokens.get(i + 3).map(|t| &t.kind), Some(TokenKind::Identifier(s)) if s == "iNeverAway")
            && is_punct_at(&tokens, i + 4, Punct::LBrace);

        if is_decl_start {
            let var_name = ident_text(&tokens[i + 1]).unwrap().to_string();
            let open_idx = i + 4;
            if let Some(close_idx) = find_matching_close(&tokens, open_idx) {
                let mut decl_end = close_idx;
                if is_punct_at(&tokens, close_idx + 1, Punct::Semicolon) {
                    decl_end += 1;
                }

                let mut hoisted_defs = String::new();
                for (seg_start, seg_end) in split_top_level_commas(&tokens, open_idx + 1, close_idx) {
                    if let Some((k_s, k_e, v_s, v_e)) = split_key_value(&tokens, seg_start, seg_end) {
                        let method = raw_text(&tokens, content, k_s, k_e);
                        let func_expr = raw_text(&tokens, content, v_s, v_e);
                        let global_name = format!("__chtl_vir_{}_{}", var_name, method);
                        hoisted_defs.push_str(&format!("const {} = {};\n", global_name, func_expr));
                        registry.insert((var_name.clone(), method), global_name);
                    }
                }

                spans.push(Span {
                    start_byte: tokens[i].start.offset,
                    end_byte: tokens[decl_end].end.offset,
                    replacement: hoisted_defs,
                });
                i = decl_end + 1;
                continue;
            }
        }
        i += 1;
    }

    if registry.is_empty() {
        return content.to_string();
    }

    i = 0;
    while i < tokens.len() {
        if let TokenKind::Identifier(name) = &tokens[i].kind {
            let arrow_then_method = is_punct_at(&tokens, i + 1, Punct::Arrow)
                && matches!(tokens.get(i + 2).map(|t| &t.kind), Some(TokenKind::Identifier(_)));
            if arrow_then_method {
                let method = ident_text(&tokens[i + 2]).unwrap().to_string();
                if let Some(global_name) = registry.get(&(name.clone(), method)) {
                    spans.push(Span {
                        start_byte: tokens[i].start.offset,
                        end_byte: tokens[i + 2].end.offset,
                        replacement: global_name.clone(),
                    });
                    i += 3;
                    continue;
                }
            }
        }
        i += 1;
    }

    splice(content, &mut spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hoists_methods_and_rewrites_call_sites() {
        let source = "Vir comp = iNeverAway { Signature: function(x) { return x + 1; } }; comp -> Signature(41);";
        let mut diags = Diagnostics::new();
        let out = hoist(source, &mut diags);
        assert!(out.contains("const __chtl_vir_comp_Signature = function(x) { return x + 1; };"));
        assert!(out.contains("__chtl_vir_comp_Signature(41);"));
        assert!(!out.contains("iNeverAway"));
    }

    #[test]
    fn leaves_ordinary_scripts_untouched() {
        let source = "const x = 1;\nconsole.log(x);";
        let mut diags = Diagnostics::new();
        assert_eq!(hoist(source, &mut diags), source);
    }
}
