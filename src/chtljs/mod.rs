//! C7: the CHTL-JS sub-compiler. Input is the raw text of a `script { … }`
//! block; output is plain JavaScript. The transform is token-level, not
//! AST-level (spec.md §4.6): the lexer from `crate::lexer` is reused, and
//! the resulting token list is scanned for the recognized forms named in
//! the table there. Grounded on `CHTLJSCompiler.cpp::compile`'s pipeline
//! shape (`examples/original_source/src/CHTLJS/CHTLJSCompiler.cpp`), with
//! each regex-substitution pass there reworked into a token-boundary scan
//! that only falls back to raw-text parsing for the inner key/value grammar
//! of a matched block, and a single trailing selector-rewrite pass.

mod animate;
mod listen;
mod router;
mod scriptloader;
mod selector;
mod support;
mod vir;

use crate::diagnostics::Diagnostics;
use crate::plugin::PluginRegistry;
use crate::token::Token;
use support::Span;

/// Compiles one `script { ... }` body to plain JavaScript.
///
/// Order mirrors the reference compiler: `Vir` hoisting runs first as a
/// preprocessing pass, then `ScriptLoader`/`Listen`/`Delegate`/`Animate`/
/// `Router` block forms are recognized (plugins get first refusal on each
/// token position), and finally every remaining `{{selector}}` is rewritten
/// in one global pass.
pub fn compile_script(content: &str, plugins: &PluginRegistry, diagnostics: &mut Diagnostics) -> String {
    let hoisted = vir::hoist(content, diagnostics);
    let tokens = crate::lexer::tokenize(&hoisted);

    let mut spans: Vec<Span> = Vec::new();

    #[cfg(feature = "plugins")]
    spans.extend(plugin_spans(&tokens, &hoisted, plugins));
    #[cfg(not(feature = "plugins"))]
    let _ = plugins;

    spans.extend(scriptloader::find_all(&tokens, &hoisted));
    spans.extend(listen::find_all(&tokens, &hoisted, diagnostics));
    spans.extend(animate::find_all(&tokens, &hoisted, diagnostics));
    spans.extend(router::find_all(&tokens, &hoisted, diagnostics));

    let assembled = support::splice(&hoisted, &mut spans);
    selector::rewrite_selectors(&assembled)
}

#[cfg(feature = "plugins")]
fn plugin_spans(tokens: &[Token], source: &str, plugins: &PluginRegistry) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let Some(m) = plugins.try_match(tokens, i) {
            let end_idx = i + m.token_count;
            if m.token_count > 0 && end_idx <= tokens.len() {
                spans.push(Span {
                    start_byte: tokens[i].start.offset,
                    end_byte: tokens[end_idx - 1].end.offset,
                    replacement: m.replacement,
                });
                i = end_idx;
                continue;
            }
        }
        i += 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_selector_expression() {
        let plugins = PluginRegistry::new();
        let mut diags = Diagnostics::new();
        let out = compile_script("const box = {{.box}};", &plugins, &mut diags);
        assert_eq!(out, "const box = document.querySelector('.box');");
    }

    #[test]
    fn compiles_listen_and_scriptloader_together() {
        let plugins = PluginRegistry::new();
        let mut diags = Diagnostics::new();
        let src = "ScriptLoader { load: 'a.js'; }\n{{.btn}} -> Listen { click: onClick };";
        let out = compile_script(src, &plugins, &mut diags);
        assert!(out.contains("document.head.appendChild(script0);"));
        assert!(out.contains("document.querySelector('.btn').addEventListener('click', onClick);"));
    }

    #[test]
    fn plain_javascript_passes_through_unchanged() {
        let plugins = PluginRegistry::new();
        let mut diags = Diagnostics::new();
        let src = "function greet(name) {\n  console.log('hi ' + name);\n}\ngreet('world');";
        assert_eq!(compile_script(src, &plugins, &mut diags), src);
    }
}
