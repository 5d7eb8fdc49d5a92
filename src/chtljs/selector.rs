//! `{{cssSelector}}` -> `document.querySelector('cssSelector')`.
//!
//! Grounded on `CHTLJSCompiler.cpp::convertSelector`/`compileSelectors`: a
//! final global substitution run after every block-level form has already
//! been expanded, so a selector embedded inside a `Router`'s `page:` value
//! or a `Listen` target still resolves (spec.md §4.6 "Identifier-level
//! rewriting").

use regex::Regex;

pub(crate) fn convert_selector(selector: &str) -> String {
    format!("document.querySelector('{}')", selector.trim())
}

pub(crate) fn rewrite_selectors(text: &str) -> String {
    let re = Regex::new(r"\{\{([^}]+)\}\}").expect("static selector regex is valid");
    re.replace_all(text, |caps: &regex::Captures| convert_selector(&caps[1])).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_class_and_id_selectors() {
        let out = rewrite_selectors("const box = {{.box}}; const btn = {{#submit}};");
        assert_eq!(out, "const box = document.querySelector('.box'); const btn = document.querySelector('#submit');");
    }

    #[test]
    fn leaves_plain_code_untouched() {
        assert_eq!(rewrite_selectors("const x = 1;"), "const x = 1;");
    }
}
