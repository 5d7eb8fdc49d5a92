//! Document assembly: combines the generator's three streams (HTML/CSS/JS)
//! into whatever final shape the caller asked for via `CompileOptions` —
//! a single inlined document, a `default_struct` HTML skeleton linking
//! sibling `.css`/`.js` files, or the bare generated fragments for a caller
//! that wants to place them itself (spec.md §6 CompileOptions table).
//!
//! Grounded on spec.md §6 directly — this is pure string stitching with no
//! AST involvement, so there's no teacher file doing the same job; the
//! ordering rule ("`<style>` in `<head>`, then body HTML, then `<script>`
//! appended to body") and the doctype skeleton come straight from spec.md's
//! "Generated output" paragraph.

use crate::config::Configuration;
use crate::generator::GeneratedOutput;

/// Caller-supplied knobs controlling how the three generated streams are
/// stitched into final output (spec.md §6).
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Emit a single HTML document with both CSS and JS inlined.
    pub inline_output: bool,
    /// Inline CSS into a `<style>` tag; JS still goes to a sibling file
    /// unless `inline_output`/`inline_js` also says otherwise.
    pub inline_css: bool,
    /// Inline JS into a `<script>` tag; CSS still goes to a sibling file
    /// unless `inline_output`/`inline_css` also says otherwise.
    pub inline_js: bool,
    /// Wrap the body markup in a `<!DOCTYPE html><html>...</html>` skeleton,
    /// linking sibling CSS/JS files for whichever stream isn't inlined.
    pub default_struct: bool,
    /// Base name used to name sibling `.css`/`.js` files when a stream isn't
    /// inlined.
    pub output_name: String,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            inline_output: false,
            inline_css: false,
            inline_js: false,
            default_struct: false,
            output_name: "output".to_string(),
        }
    }
}

/// The final artifacts of a compilation, shaped per [`AssemblyOptions`].
/// `css`/`js` are `None` exactly when their content was inlined into `html`.
#[derive(Debug, Clone)]
pub struct AssembledOutput {
    pub html: String,
    pub css: Option<String>,
    pub js: Option<String>,
}

/// Stitches `output`'s three streams together per `options`, honoring the
/// doctype toggle from `[Configuration] { DOCTYPE_HTML5 = ...; }`.
pub fn assemble(output: &GeneratedOutput, options: &AssemblyOptions, config: &Configuration) -> AssembledOutput {
    let css_inline = options.inline_output || options.inline_css;
    let js_inline = options.inline_output || options.inline_js;

    if !options.default_struct {
        let mut html = output.html.clone();
        if css_inline && !output.css.is_empty() {
            html = format!("<style>{}</style>\n{}", output.css, html);
        }
        if js_inline && !output.js.is_empty() {
            html.push_str(&format!("<script>{}</script>\n", output.js));
        }
        return AssembledOutput {
            html,
            css: (!css_inline).then(|| output.css.clone()),
            js: (!js_inline).then(|| output.js.clone()),
        };
    }

    let mut head = String::new();
    if config.doctype_html5 {
        head.push_str("<!DOCTYPE html>\n");
    }
    head.push_str("<html>\n<head>\n");
    if css_inline {
        if !output.css.is_empty() {
            head.push_str(&format!("<style>{}</style>\n", output.css));
        }
    } else {
        head.push_str(&format!("<link rel=\"stylesheet\" href=\"{}.css\">\n", options.output_name));
    }
    head.push_str("</head>\n<body>\n");

    let mut body_tail = String::new();
    if js_inline {
        if !output.js.is_empty() {
            body_tail.push_str(&format!("<script>{}</script>\n", output.js));
        }
    } else {
        body_tail.push_str(&format!("<script src=\"{}.js\"></script>\n", options.output_name));
    }

    let html = format!("{}{}{}</body>\n</html>\n", head, output.html, body_tail);

    AssembledOutput {
        html,
        css: (!css_inline).then(|| output.css.clone()),
        js: (!js_inline).then(|| output.js.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> GeneratedOutput {
        GeneratedOutput {
            html: "<div>hi</div>\n".to_string(),
            css: ".box { color: red; }\n".to_string(),
            js: "console.log(1);\n".to_string(),
        }
    }

    #[test]
    fn inline_output_inlines_both_streams_with_style_before_body_before_script() {
        let options = AssemblyOptions { inline_output: true, ..Default::default() };
        let assembled = assemble(&output(), &options, &Configuration::default());
        assert!(assembled.css.is_none());
        assert!(assembled.js.is_none());
        let style_pos = assembled.html.find("<style>").unwrap();
        let body_pos = assembled.html.find("<div>").unwrap();
        let script_pos = assembled.html.find("<script>").unwrap();
        assert!(style_pos < body_pos && body_pos < script_pos);
    }

    #[test]
    fn default_struct_links_sibling_files_when_not_inline() {
        let options = AssemblyOptions { default_struct: true, output_name: "page".to_string(), ..Default::default() };
        let assembled = assemble(&output(), &options, &Configuration::default());
        assert!(assembled.html.starts_with("<!DOCTYPE html>"));
        assert!(assembled.html.contains("href=\"page.css\""));
        assert!(assembled.html.contains("src=\"page.js\""));
        assert_eq!(assembled.css.as_deref(), Some(output().css.as_str()));
        assert_eq!(assembled.js.as_deref(), Some(output().js.as_str()));
    }

    #[test]
    fn default_struct_without_doctype_html5_omits_the_doctype() {
        let mut config = Configuration::default();
        config.doctype_html5 = false;
        let options = AssemblyOptions { default_struct: true, ..Default::default() };
        let assembled = assemble(&output(), &options, &config);
        assert!(!assembled.html.contains("<!DOCTYPE"));
    }

    #[test]
    fn inline_css_alone_keeps_js_external() {
        let options = AssemblyOptions { inline_css: true, ..Default::default() };
        let assembled = assemble(&output(), &options, &Configuration::default());
        assert!(assembled.html.contains("<style>"));
        assert!(assembled.css.is_none());
        assert_eq!(assembled.js.as_deref(), Some(output().js.as_str()));
    }

    #[test]
    fn plain_mode_returns_bare_streams_untouched() {
        let assembled = assemble(&output(), &AssemblyOptions::default(), &Configuration::default());
        assert_eq!(assembled.html, output().html);
        assert_eq!(assembled.css.as_deref(), Some(output().css.as_str()));
        assert_eq!(assembled.js.as_deref(), Some(output().js.as_str()));
    }
}
