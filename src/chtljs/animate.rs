//! `Animate { target:…, duration:…, easing:…, loop:…, delay:…, direction:…,
//! begin:{…}, when:[{at:n,…}, …], end:{…}, callback: fn }` ->
//! `target.animate(keyframes, options)`.
//!
//! Grounded on `CHTLJSCompiler.cpp::parseAnimateBlock`/`parseKeyframeObject`.

use super::selector::convert_selector;
use super::support::{camel_case_css_key, expect_lbrace, find_matching_char, find_matching_close, ident_is, strip_quotes, Span};
use crate::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::position::SourcePosition;
use crate::token::Token;
use regex::Regex;

pub(crate) fn find_all(tokens: &[Token], source: &str, diagnostics: &mut Diagnostics) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if ident_is(&tokens[i], "Animate") {
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

    let mut target = String::new();
    let mut duration = String::new();
    let mut callback = String::new();
    let mut options: Vec<String> = Vec::new();
    let mut begin_frame: Option<String> = None;
    let mut end_frame: Option<String> = None;
    let mut when_frames: Vec<String> = Vec::new();

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

        let value_end = match chars[value_start] {
            '{' => find_matching_char(&chars, value_start, '{', '}').map(|e| e + 1).unwrap_or(chars.len()),
            '[' => find_matching_char(&chars, value_start, '[', ']').map(|e| e + 1).unwrap_or(chars.len()),
            _ => chars[value_start..]
                .iter()
                .position(|&c| c == ',' || c == '\n')
                .map(|p| value_start + p)
                .unwrap_or(chars.len()),
        };

        let raw_value: String = chars[value_start..value_end]
            .iter()
            .collect::<String>()
            .trim_end_matches([' ', '\t', '\r', '\n', ','])
            .trim()
            .to_string();
        let unquoted = strip_quotes(&raw_value);

        match key.as_str() {
            "target" => target = raw_value.clone(),
            "duration" => {
                duration = unquoted.clone();
                options.push(format!("duration: {}", unquoted));
            }
            "delay" => options.push(format!("delay: {}", unquoted)),
            "easing" | "direction" => options.push(format!("{}: '{}'", key, unquoted)),
            "loop" => {
                if unquoted == "-1" {
                    options.push("iterations: Infinity".to_string());
                } else {
                    options.push(format!("iterations: {}", unquoted));
                }
            }
            "callback" => callback = unquoted,
            "begin" => begin_frame = Some(parse_keyframe_object(&raw_value)),
            "end" => end_frame = Some(parse_keyframe_object(&raw_value)),
            "when" => when_frames = parse_when_list(&raw_value),
            _ => {}
        }

        pos = value_end;
    }

    if target.is_empty() {
        diagnostics.warning(DiagnosticCategory::Semantic, SourcePosition::start(), "Animate requires a 'target' property");
        return "console.error(\"CHTL JS Animate Error: 'target' property is required.\");\n".to_string();
    }
    if duration.is_empty() {
        diagnostics.warning(DiagnosticCategory::Semantic, SourcePosition::start(), "Animate requires a 'duration' property");
        return "console.error(\"CHTL JS Animate Error: 'duration' property is required.\");\n".to_string();
    }

    let mut keyframes = Vec::new();
    if let Some(b) = begin_frame {
        keyframes.push(b);
    }
    keyframes.extend(when_frames);
    if let Some(e) = end_frame {
        keyframes.push(e);
    }

    let compiled_target = if let Some(sel) = target.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
        convert_selector(sel)
    } else {
        target
    };

    let mut js = String::new();
    js.push_str(&format!("const target_elem = {};\n", compiled_target));
    js.push_str("if (target_elem) {\n");
    js.push_str(&format!("  const keyframes = [ {} ];\n", keyframes.join(", ")));
    js.push_str(&format!("  const animation = target_elem.animate(keyframes, {{ {} }});\n", options.join(", ")));
    if !callback.is_empty() {
        js.push_str(&format!("  animation.finished.then({});\n", callback));
    }
    js.push_str("}\n");
    js
}

fn parse_when_list(bracketed: &str) -> Vec<String> {
    let inner = bracketed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(bracketed);
    let chars: Vec<char> = inner.chars().collect();
    let mut frames = Vec::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        let Some(rel) = chars[pos..].iter().position(|&c| c == '{') else {
            break;
        };
        let start = pos + rel;
        let Some(end) = find_matching_char(&chars, start, '{', '}') else {
            break;
        };
        let frame: String = chars[start..=end].iter().collect();
        frames.push(parse_keyframe_object(&frame));
        pos = end + 1;
    }
    frames
}

/// Parses a `{ at: 0.5, background-color: 'red' }`-shaped block into a JS
/// object literal, renaming `at` to `offset` and camel-casing every other
/// key.
fn parse_keyframe_object(block: &str) -> String {
    let inner = block.trim().strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(block).trim();
    let re = Regex::new(r"([\w-]+)\s*:\s*([\d.]+|'[^']*')").expect("static keyframe regex is valid");
    let mut parts = Vec::new();
    for caps in re.captures_iter(inner) {
        let key = &caps[1];
        let value = &caps[2];
        let rendered_key = if key == "at" { "offset".to_string() } else { camel_case_css_key(key) };
        parts.push(format!("{}: {}", rendered_key, value));
    }
    format!("{{ {} }}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn builds_target_and_options() {
        let source = "Animate { target: {{.box}}, duration: 400, easing: 'ease-in', loop: -1 }";
        let tokens = tokenize(source);
        let mut diags = Diagnostics::new();
        let spans = find_all(&tokens, source, &mut diags);
        assert_eq!(spans.len(), 1);
        let r = &spans[0].replacement;
        assert!(r.contains("const target_elem = document.querySelector('.box');"));
        assert!(r.contains("duration: 400"));
        assert!(r.contains("easing: 'ease-in'"));
        assert!(r.contains("iterations: Infinity"));
    }

    #[test]
    fn missing_duration_emits_console_error() {
        let source = "Animate { target: {{.box}} }";
        let tokens = tokenize(source);
        let mut diags = Diagnostics::new();
        let spans = find_all(&tokens, source, &mut diags);
        assert!(spans[0].replacement.contains("'duration' property is required"));
    }

    #[test]
    fn keyframe_object_renames_at_and_camel_cases_keys() {
        let out = parse_keyframe_object("{ at: 0.5, background-color: 'blue' }");
        assert_eq!(out, "{ offset: 0.5, backgroundColor: 'blue' }");
    }
}
