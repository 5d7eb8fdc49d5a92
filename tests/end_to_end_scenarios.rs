//! End-to-end scenarios straight out of spec.md §8 "Testable properties /
//! End-to-end scenarios", run through the real public `compile()` entry
//! point rather than any single component in isolation.

use chtl::compile::{compile, CompileOptions};
use chtl::diagnostics::DiagnosticCategory;
use chtl::loader::{LoadError, Loader};
use std::collections::HashMap;

/// An in-memory [`Loader`] for tests that need `[Import]` to resolve to
/// something without touching the filesystem.
struct MapLoader(HashMap<String, String>);

impl MapLoader {
    fn new() -> Self {
        Self(HashMap::new())
    }

    fn with(mut self, path: &str, content: &str) -> Self {
        self.0.insert(path.to_string(), content.to_string());
        self
    }
}

impl Loader for MapLoader {
    fn load(&mut self, relative_path: &str, _importer_context: &str) -> Result<String, LoadError> {
        self.0
            .get(relative_path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound { path: relative_path.to_string() })
    }
}

fn compile_ok(source: &str) -> chtl::compile::CompileResult {
    let mut loader = MapLoader::new();
    let result = compile(source, CompileOptions::default(), &mut loader);
    assert!(
        !result.diagnostics.has_errors(),
        "expected no errors, got: {:#?}",
        result.diagnostics.iter().collect::<Vec<_>>()
    );
    result
}

#[test]
fn scenario_1_minimal_element() {
    let result = compile_ok(r#"div { text { "hi" } }"#);
    assert_eq!(result.output.html, "<div>hi</div>\n");
    assert!(result.output.css.is_empty());
    assert!(result.output.js.is_empty());
}

#[test]
fn scenario_2_derived_class_and_inline_style() {
    let source = r#"div { style { .box { color: red; } padding: 5px; } text { "x" } }"#;
    let result = compile_ok(source);
    assert!(result.output.html.contains(r#"class="box""#));
    assert!(result.output.html.contains(r#"style="padding:5px;""#));
    assert!(result.output.css.contains(".box { color: red; }"));
}

#[test]
fn scenario_3_expression_with_unit_arithmetic() {
    let source = "div { style { width: 100px + 50px; height: width * 2; } }";
    let result = compile_ok(source);
    assert!(result.output.html.contains("width:150px; height:300px;"));
}

#[test]
fn scenario_4_custom_style_with_valueless_property_and_specialization() {
    let source = r#"
        [Custom] @Style Btn { padding: 10px; background-color; color: white; }
        button { style { @Style Btn { background-color: blue; delete color; } } }
    "#;
    let result = compile_ok(source);
    assert!(result.output.html.contains("padding:10px;"));
    assert!(result.output.html.contains("background-color:blue;"));
    assert!(!result.output.html.contains("color:white"));
}

#[test]
fn scenario_5_import_propagation() {
    let loader_files = MapLoader::new().with("lib.chtl", "[Template] @Style S { font-family: Arial; }");
    let source = r#"[Import] @Chtl from "lib.chtl"; p { style { @Style S; } }"#;
    let mut loader = loader_files;
    let result = compile(source, CompileOptions::default(), &mut loader);
    assert!(!result.diagnostics.has_errors(), "{:#?}", result.diagnostics.iter().collect::<Vec<_>>());
    assert!(result.output.html.contains("font-family:Arial;"));
}

#[test]
fn scenario_6_chtl_js_listen() {
    let source = "div { script { {{#btn}} -> Listen { click: onClick }; } }";
    let result = compile_ok(source);
    assert!(result
        .output
        .js
        .contains("document.querySelector('#btn').addEventListener('click', onClick);"));
}

#[test]
fn error_missing_semicolon_in_attribute() {
    let mut loader = MapLoader::new();
    let result = compile(r#"div { id : "x" }"#, CompileOptions::default(), &mut loader);
    assert!(result.diagnostics.has_errors());
}

#[test]
fn error_division_by_zero_in_style_expression() {
    let mut loader = MapLoader::new();
    let source = "div { style { width: 10px / 0; } }";
    let result = compile(source, CompileOptions::default(), &mut loader);
    assert!(result.diagnostics.has_errors());
}

#[test]
fn error_reference_to_undefined_template() {
    let mut loader = MapLoader::new();
    let source = "div { style { @Style Ghost; } }";
    let result = compile(source, CompileOptions::default(), &mut loader);
    assert!(result.diagnostics.iter().any(|d| d.category == DiagnosticCategory::Semantic));
}

#[test]
fn error_circular_import_chain() {
    let loader_files = MapLoader::new().with("a.chtl", r#"[Import] @Chtl from "b.chtl";"#).with(
        "b.chtl",
        r#"[Import] @Chtl from "a.chtl";"#,
    );
    let mut options = CompileOptions::default();
    options.entry_path = "a.chtl".to_string();
    let mut loader = loader_files;
    let result = compile(r#"[Import] @Chtl from "b.chtl";"#, options, &mut loader);
    assert!(result.diagnostics.iter().any(|d| d.message.contains("circular")));
}

#[test]
fn error_animate_without_target_or_duration() {
    let mut loader = MapLoader::new();
    let source = r#"div { script { Animate { duration: 300 }; } }"#;
    let result = compile(source, CompileOptions::default(), &mut loader);
    // spec.md §4.6: missing required keys become a console.error(...) placeholder
    // and compilation continues rather than failing the whole unit.
    assert!(result.output.js.contains("console.error"));
}

#[test]
fn default_struct_links_sibling_css_and_js() {
    let mut loader = MapLoader::new();
    let mut options = CompileOptions::default();
    options.default_struct = true;
    options.output_name = "page".to_string();
    let source = r#"div { style { .box { color: red; } } script { {{#a}} -> Listen { click: go }; } }"#;
    let result = compile(source, options, &mut loader);
    assert!(!result.diagnostics.has_errors());
    assert!(result.assembled.html.starts_with("<!DOCTYPE html>"));
    assert!(result.assembled.html.contains(r#"href="page.css""#));
    assert!(result.assembled.html.contains(r#"src="page.js""#));
    assert!(result.assembled.css.is_some());
    assert!(result.assembled.js.is_some());
}

#[test]
fn inline_output_produces_one_self_contained_document() {
    let mut loader = MapLoader::new();
    let mut options = CompileOptions::default();
    options.inline_output = true;
    let source = r#"div { style { .box { color: red; } } text { "hi" } }"#;
    let result = compile(source, options, &mut loader);
    assert!(!result.diagnostics.has_errors());
    assert!(result.assembled.css.is_none());
    assert!(result.assembled.js.is_none());
    assert!(result.assembled.html.contains("<style>"));
}
