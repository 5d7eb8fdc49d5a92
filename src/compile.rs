//! The compile entry point (spec.md §5/§6): a pure function from (source
//! text, options, loader, plugin registry) to generated output plus
//! diagnostics, threading every import through C5 and every script block
//! through C7/C8.
//!
//! Grounded on the teacher's `api.rs::process` shape (explicit `*Options`/
//! `*Result` structs, no hidden global state, one call does the whole
//! pipeline) generalized to carry a [`Loader`] and [`PluginRegistry`]
//! through instead of hardcoding a single pipeline shape.

use crate::assemble::{self, AssembledOutput, AssemblyOptions};
use crate::ast::{ImportSubject, Node};
use crate::config::Configuration;
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::generator::{GeneratedOutput, Generator};
use crate::lexer::{resolve_keywords, tokenize};
use crate::loader::{ImportStack, Loader};
use crate::parser::{ParseOutput, Parser};
use crate::plugin::PluginRegistry;

/// Caller-supplied knobs for a single compilation (spec.md §6
/// `CompileOptions` table).
pub struct CompileOptions {
    /// Identifies the entry file to the loader, so its own relative imports
    /// resolve against the right directory (spec.md §6).
    pub entry_path: String,
    pub config: Configuration,
    pub plugins: PluginRegistry,
    /// Emit a single HTML document with CSS and JS inlined.
    pub inline_output: bool,
    /// Inline CSS into a `<style>` tag; JS still lands in a sibling stream.
    pub inline_css: bool,
    /// Inline JS into a `<script>` tag; CSS still lands in a sibling stream.
    pub inline_js: bool,
    /// Wrap body HTML in a `<!DOCTYPE html><html>...</html>` skeleton,
    /// linking sibling CSS/JS for whichever stream isn't inlined.
    pub default_struct: bool,
    /// Include source-position comments in the generated HTML, in addition
    /// to whatever an in-source `[Configuration] { DEBUG_MODE = ...; }`
    /// block already requested.
    pub debug: bool,
    /// Base name for sibling `.css`/`.js` files when a stream isn't inlined.
    pub output_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            entry_path: "main.chtl".to_string(),
            config: Configuration::default(),
            plugins: PluginRegistry::new(),
            inline_output: false,
            inline_css: false,
            inline_js: false,
            default_struct: false,
            debug: false,
            output_name: "output".to_string(),
        }
    }
}

impl CompileOptions {
    fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            inline_output: self.inline_output,
            inline_css: self.inline_css,
            inline_js: self.inline_js,
            default_struct: self.default_struct,
            output_name: self.output_name.clone(),
        }
    }
}

/// Everything a caller gets back from a compilation (spec.md §4.5 Contract
/// plus the accumulated diagnostics list). `output` carries the raw,
/// unassembled HTML/CSS/JS streams; `assembled` is the same content shaped
/// per `CompileOptions`'s inline/default-struct knobs (spec.md §6).
pub struct CompileResult {
    pub output: GeneratedOutput,
    pub assembled: AssembledOutput,
    pub diagnostics: Diagnostics,
}

/// Compiles `source` to HTML/CSS/JS. `loader` resolves every `[Import]`
/// statement reached while parsing; diagnostics from every stage (and every
/// imported unit) accumulate into one list rather than aborting the pass.
pub fn compile(source: &str, options: CompileOptions, loader: &mut dyn Loader) -> CompileResult {
    let mut diagnostics = Diagnostics::new();
    let mut import_stack = ImportStack::new();
    let _ = import_stack.enter(&options.entry_path);

    let mut extra_css = String::new();
    let mut extra_js = String::new();

    let mut base_config = options.config.clone();
    base_config.debug_mode = base_config.debug_mode || options.debug;

    let parsed = parse_unit(
        source,
        &options.entry_path,
        base_config,
        loader,
        &mut import_stack,
        &mut diagnostics,
        &mut extra_css,
        &mut extra_js,
    );

    let generator = Generator::new(&parsed.arena, &parsed.symbols, &parsed.config, &options.plugins);
    let mut output = generator.generate(&parsed.top_level, &mut diagnostics);
    output.css = format!("{}{}", extra_css, output.css);
    output.js = format!("{}{}", extra_js, output.js);

    let assembled = assemble::assemble(&output, &options.assembly_options(), &parsed.config);

    CompileResult { output, assembled, diagnostics }
}

/// Parses one translation unit and resolves every `[Import]` it contains
/// before returning:
///
/// - `@Chtl` recursively parses the target and merges its template/custom
///   definitions into this unit's symbol environment — never its elements
///   (spec.md §4.4: "contributes its top-level TemplateDef/CustomDef
///   entries... it does not inject elements").
/// - `@Style`/`@JavaScript` splice the raw file content into the CSS/JS
///   streams, the same verbatim treatment an `[Origin]` block gets.
/// - `@Config` folds the target's `[Configuration]` settings into this
///   unit's configuration (spec.md leaves the exact mechanics open; applying
///   it through the same `resolve_keywords` pass a plain file goes through
///   keeps one code path for "a `[Configuration]` block took effect").
/// - `@CJmod` only invokes the loader, to surface a missing-file or
///   unsupported-archive error — registering the module's actual transform
///   with the plugin registry is the embedder's job, not the core's (the
///   core never executes `.cjmod` payloads).
fn parse_unit(
    source: &str,
    path: &str,
    config: Configuration,
    loader: &mut dyn Loader,
    import_stack: &mut ImportStack,
    diagnostics: &mut Diagnostics,
    extra_css: &mut String,
    extra_js: &mut String,
) -> ParseOutput {
    let (tokens, config) = resolve_keywords(tokenize(source), config);
    let mut parsed = Parser::new(&tokens, source, config).parse();
    diagnostics.extend(std::mem::take(&mut parsed.diagnostics));
    let mut config = parsed.config.clone();

    let imports: Vec<_> = parsed
        .top_level
        .iter()
        .filter_map(|&id| match parsed.arena.get(id) {
            Node::Import { subject, path, alias, position } => Some((subject.clone(), path.clone(), alias.clone(), *position)),
            _ => None,
        })
        .collect();

    for (subject, import_path, alias, position) in imports {
        if matches!(subject, ImportSubject::Chtl) {
            if let Err(e) = import_stack.enter(&import_path) {
                diagnostics.error(DiagnosticCategory::Io, position, e.to_string());
                continue;
            }
        }

        match loader.load(&import_path, path) {
            Ok(content) => match subject {
                ImportSubject::Chtl => {
                    let mut sub_css = String::new();
                    let mut sub_js = String::new();
                    let sub = parse_unit(&content, &import_path, config.clone(), loader, import_stack, diagnostics, &mut sub_css, &mut sub_js);
                    import_stack.exit(&import_path);
                    extra_css.push_str(&sub_css);
                    extra_js.push_str(&sub_js);
                    if let Err(e) = parsed.symbols.merge_imported(sub.symbols, alias.as_deref()) {
                        diagnostics.error(DiagnosticCategory::Semantic, position, e.to_string());
                    }
                }
                ImportSubject::Style => {
                    extra_css.push_str(&content);
                    extra_css.push('\n');
                }
                ImportSubject::JavaScript => {
                    extra_js.push_str(&content);
                    extra_js.push('\n');
                }
                ImportSubject::Config => {
                    let (_, imported_config) = resolve_keywords(tokenize(&content), config.clone());
                    config = imported_config;
                }
                ImportSubject::CJmod => {}
            },
            Err(e) => {
                if matches!(subject, ImportSubject::Chtl) {
                    import_stack.exit(&import_path);
                }
                diagnostics.error(DiagnosticCategory::Io, position, e.to_string());
            }
        }
    }

    parsed.config = config;
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use std::collections::HashMap;

    struct MapLoader(HashMap<String, String>);

    impl Loader for MapLoader {
        fn load(&mut self, relative_path: &str, _importer_context: &str) -> Result<String, LoadError> {
            self.0
                .get(relative_path)
                .cloned()
                .ok_or_else(|| LoadError::NotFound { path: relative_path.to_string() })
        }
    }

    #[test]
    fn compiles_a_plain_element_with_no_imports() {
        let mut loader = MapLoader(HashMap::new());
        let result = compile("div { text { \"hi\" } }", CompileOptions::default(), &mut loader);
        assert!(!result.diagnostics.has_errors());
        assert!(result.output.html.contains("<div>hi</div>"));
    }

    #[test]
    fn chtl_import_merges_templates_without_injecting_elements() {
        let mut files = HashMap::new();
        files.insert("lib.chtl".to_string(), "[Template] @Style S { font-family: Arial; }".to_string());
        let mut loader = MapLoader(files);

        let source = r#"[Import] @Chtl from "lib.chtl"; p { style { @Style S; } }"#;
        let result = compile(source, CompileOptions::default(), &mut loader);
        assert!(!result.diagnostics.has_errors(), "{:?}", result.diagnostics.iter().collect::<Vec<_>>());
        assert!(result.output.html.contains("font-family:Arial;"));
    }

    #[test]
    fn missing_import_is_an_io_diagnostic() {
        let mut loader = MapLoader(HashMap::new());
        let source = r#"[Import] @Chtl from "ghost.chtl";"#;
        let result = compile(source, CompileOptions::default(), &mut loader);
        assert!(result.diagnostics.iter().any(|d| d.category == DiagnosticCategory::Io));
    }

    #[test]
    fn circular_import_is_reported_instead_of_recursing_forever() {
        let mut files = HashMap::new();
        files.insert("a.chtl".to_string(), r#"[Import] @Chtl from "main.chtl";"#.to_string());
        let mut loader = MapLoader(files);

        let mut options = CompileOptions::default();
        options.entry_path = "main.chtl".to_string();
        let source = r#"[Import] @Chtl from "a.chtl";"#;
        let result = compile(source, options, &mut loader);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("circular")));
    }
}
