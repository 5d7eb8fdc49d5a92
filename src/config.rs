//! Runtime configuration: the active keyword table plus feature toggles.
//!
//! Two halves feed `Configuration`: caller-supplied [`crate::compile::CompileOptions`]
//! and in-source `[Configuration] { ... }` blocks parsed by the main parser.
//! `[Configuration]` blocks patch this struct as parsing proceeds; tokens
//! already lexed are unaffected (lexing stays a pure, restartable pass — only
//! the keyword *resolution* post-pass consults the table, per the
//! context-free-then-contextual lexing design note).

use std::collections::HashMap;

/// Canonical keyword name -> source spelling currently in effect. Starts at
/// the defaults named in the data model and can be overridden per-key by a
/// `KEYWORD_*` configuration setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    spellings: HashMap<&'static str, String>,
}

impl KeywordTable {
    const DEFAULTS: &'static [(&'static str, &'static str)] = &[
        ("KEYWORD_TEXT", "text"),
        ("KEYWORD_STYLE", "style"),
        ("KEYWORD_SCRIPT", "script"),
        ("KEYWORD_TEMPLATE", "Template"),
        ("KEYWORD_CUSTOM", "Custom"),
        ("KEYWORD_ORIGIN", "Origin"),
        ("KEYWORD_IMPORT", "Import"),
        ("KEYWORD_NAMESPACE", "Namespace"),
        ("KEYWORD_CONFIGURATION", "Configuration"),
        ("KEYWORD_USE", "use"),
        ("KEYWORD_FROM", "from"),
        ("KEYWORD_AS", "as"),
        ("KEYWORD_DELETE", "delete"),
        ("KEYWORD_INSERT", "insert"),
        ("KEYWORD_AFTER", "after"),
        ("KEYWORD_BEFORE", "before"),
        ("KEYWORD_INHERIT", "inherit"),
        ("KEYWORD_EXCEPT", "except"),
    ];

    pub fn defaults() -> Self {
        let spellings = Self::DEFAULTS
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        Self { spellings }
    }

    /// Apply a `KEYWORD_*` override. Returns `false` if `key` isn't a
    /// recognized `KEYWORD_*` setting (caller should report a diagnostic).
    pub fn set(&mut self, key: &str, spelling: &str) -> bool {
        if let Some((canonical, _)) = Self::DEFAULTS.iter().find(|(k, _)| *k == key) {
            self.spellings.insert(canonical, spelling.to_string());
            true
        } else {
            false
        }
    }

    /// Resolve a raw identifier's text against the active table, returning
    /// the canonical keyword name it matches (e.g. `"style"` normally maps to
    /// `"KEYWORD_STYLE"`), or `None` if it's an ordinary identifier.
    pub fn resolve(&self, text: &str) -> Option<&'static str> {
        Self::DEFAULTS
            .iter()
            .find(|(k, _)| self.spellings.get(*k).map(String::as_str) == Some(text))
            .map(|(k, _)| *k)
    }

    pub fn spelling_of(&self, canonical: &str) -> Option<&str> {
        self.spellings.get(canonical).map(String::as_str)
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Feature toggles recognized by `[Configuration]`, per the configuration
/// block format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub keywords: KeywordTable,
    pub debug_mode: bool,
    pub disable_style_auto_add_class: bool,
    pub disable_style_auto_add_id: bool,
    pub doctype_html5: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            keywords: KeywordTable::defaults(),
            debug_mode: false,
            disable_style_auto_add_class: false,
            disable_style_auto_add_id: false,
            doctype_html5: true,
        }
    }
}

impl Configuration {
    /// Apply a single `key = value;` setting from a `[Configuration]` block.
    /// Returns `false` for an unrecognized key (caller reports a Semantic
    /// diagnostic but keeps the rest of the block).
    pub fn apply_setting(&mut self, key: &str, value: &str) -> bool {
        match key {
            "DEBUG_MODE" => {
                self.debug_mode = parse_bool(value);
                true
            }
            "DISABLE_STYLE_AUTO_ADD_CLASS" => {
                self.disable_style_auto_add_class = parse_bool(value);
                true
            }
            "DISABLE_STYLE_AUTO_ADD_ID" => {
                self.disable_style_auto_add_id = parse_bool(value);
                true
            }
            "DOCTYPE_HTML5" => {
                self.doctype_html5 = parse_bool(value);
                true
            }
            _ if key.starts_with("KEYWORD_") => self.keywords.set(key, value),
            _ => false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keywords_resolve_standard_spellings() {
        let table = KeywordTable::defaults();
        assert_eq!(table.resolve("style"), Some("KEYWORD_STYLE"));
        assert_eq!(table.resolve("nope"), None);
    }

    #[test]
    fn aliasing_a_keyword_changes_resolution() {
        let mut table = KeywordTable::defaults();
        assert!(table.set("KEYWORD_STYLE", "esttilo"));
        assert_eq!(table.resolve("style"), None);
        assert_eq!(table.resolve("esttilo"), Some("KEYWORD_STYLE"));
    }

    #[test]
    fn unknown_keyword_setting_is_rejected() {
        let mut table = KeywordTable::defaults();
        assert!(!table.set("KEYWORD_BOGUS", "x"));
    }

    #[test]
    fn configuration_applies_feature_flags() {
        let mut cfg = Configuration::default();
        assert!(cfg.apply_setting("DISABLE_STYLE_AUTO_ADD_CLASS", "true"));
        assert!(cfg.disable_style_auto_add_class);
        assert!(!cfg.apply_setting("NOT_A_KEY", "true"));
    }
}
