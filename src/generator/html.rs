//! Tag emission, the HTML void-element table, and HTML escaping (spec.md
//! §4.5 steps 3-4). Grounded on spec.md directly; the reference project has
//! no matching file because its own markup emission uses `quick_xml` for
//! well-formed XML, which actively fights void elements and verbatim
//! `Origin` passthrough (see `DESIGN.md`), so this hand-builds strings the
//! way `examples/original_source/CHTL/CHTL/CHTLGenerator/Generator.cpp`
//! builds them with `std::ostringstream`.

/// HTML5 void elements: self-closing, never carry a closing tag (spec.md
/// §4.5 step 3). `<head>` is explicitly excluded even when empty.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// `&` first (to avoid double-encoding), then `<` `>` `"` `'`.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn escape_attr(raw: &str) -> String {
    escape_text(raw)
}

pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_ampersand_before_other_entities() {
        assert_eq!(escape_text("a & b < c"), "a &amp; b &lt; c");
    }

    #[test]
    fn void_elements_are_recognized() {
        assert!(is_void_element("img"));
        assert!(!is_void_element("head"));
        assert!(!is_void_element("div"));
    }
}
