//! C4: the symbol environment — name-keyed registries for style/element/var
//! templates and customs, plus namespace-qualified lookup and import merge.
//!
//! Grounded on the registry shape in spec.md §4.4; the reference
//! implementation's `CMODManager`/`CHTLNamespace` split keeps one table per
//! kind, which this mirrors as three `HashMap`s per template/custom half.

use crate::ast::{NodeId, TemplateBody, TemplateKind};
use crate::position::SourcePosition;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QualifiedName {
    namespace: Option<String>,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub position: SourcePosition,
    pub body: TemplateBody,
    /// Properties with no value, supplied at each use site. Only customs
    /// populate this; templates always have `[]`.
    pub valueless: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolError {
    DuplicateDefinition { kind: TemplateKind, custom: bool, name: String, first: SourcePosition },
    UndefinedBase { kind: TemplateKind, name: String },
    Unresolved { kind: TemplateKind, custom: bool, name: String },
    CircularInheritance { kind: TemplateKind, name: String },
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::DuplicateDefinition { name, first, .. } => {
                write!(f, "'{}' is already defined (first definition at {})", name, first)
            }
            SymbolError::UndefinedBase { name, .. } => write!(f, "inherited base '{}' is undefined", name),
            SymbolError::Unresolved { custom, name, .. } => {
                write!(f, "undefined {} '{}'", if *custom { "custom" } else { "template" }, name)
            }
            SymbolError::CircularInheritance { name, .. } => {
                write!(f, "circular inheritance detected at '{}'", name)
            }
        }
    }
}

impl std::error::Error for SymbolError {}

#[derive(Default)]
struct Registry {
    templates: HashMap<QualifiedName, TemplateEntry>,
    customs: HashMap<QualifiedName, TemplateEntry>,
}

/// Owns the per-compilation registries and the namespace the parser is
/// currently inside. One `SymbolEnvironment` lives for exactly one
/// compilation (spec.md §5: "owned by a single compilation").
#[derive(Default)]
pub struct SymbolEnvironment {
    style: Registry,
    element: Registry,
    var: Registry,
    current_namespace: Option<String>,
}

impl SymbolEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_namespace(&mut self, name: &str) -> Option<String> {
        std::mem::replace(&mut self.current_namespace, Some(name.to_string()))
    }

    pub fn restore_namespace(&mut self, previous: Option<String>) {
        self.current_namespace = previous;
    }

    fn registry(&self, kind: TemplateKind) -> &Registry {
        match kind {
            TemplateKind::Style => &self.style,
            TemplateKind::Element => &self.element,
            TemplateKind::Var => &self.var,
        }
    }

    fn registry_mut(&mut self, kind: TemplateKind) -> &mut Registry {
        match kind {
            TemplateKind::Style => &mut self.style,
            TemplateKind::Element => &mut self.element,
            TemplateKind::Var => &mut self.var,
        }
    }

    /// Registers a template or custom definition, resolving `base` (the
    /// `inherit` clause) by copying the base's body ahead of `body`.
    /// Duplicate names within the same namespace and kind are rejected
    /// (spec.md §3: "unique per kind").
    pub fn register(
        &mut self,
        kind: TemplateKind,
        custom: bool,
        namespace: Option<String>,
        name: &str,
        base: &[String],
        mut body: TemplateBody,
        valueless: Vec<String>,
        position: SourcePosition,
        arena: &mut crate::ast::Arena,
    ) -> Result<(), SymbolError> {
        let ns = namespace.or_else(|| self.current_namespace.clone());
        for base_name in base {
            let base_entry = self
                .lookup(kind, custom, ns.as_deref(), base_name)
                .or_else(|| self.lookup(kind, !custom, ns.as_deref(), base_name))
                .cloned()
                .ok_or_else(|| SymbolError::UndefinedBase {
                    kind,
                    name: base_name.clone(),
                })?;
            body = merge_inherited(base_entry.body, body, arena);
        }

        let qname = QualifiedName { namespace: ns, name: name.to_string() };
        let registry = self.registry_mut(kind);
        let table = if custom { &mut registry.customs } else { &mut registry.templates };
        if let Some(existing) = table.get(&qname) {
            return Err(SymbolError::DuplicateDefinition {
                kind,
                custom,
                name: name.to_string(),
                first: existing.position,
            });
        }
        table.insert(
            qname,
            TemplateEntry {
                position,
                body,
                valueless,
            },
        );
        Ok(())
    }

    /// Resolves `"name"` against `namespace` first (falling back to the
    /// current parse namespace if `namespace` is `None`), then against the
    /// global (no-namespace) table. A dotted `"ns.name"` form bypasses the
    /// current namespace and addresses `ns` directly.
    pub fn resolve(
        &self,
        kind: TemplateKind,
        custom: bool,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<&TemplateEntry, SymbolError> {
        if let Some((ns, bare)) = name.split_once('.') {
            return self
                .lookup(kind, custom, Some(ns), bare)
                .ok_or_else(|| SymbolError::Unresolved { kind, custom, name: name.to_string() });
        }
        let ns = namespace.or(self.current_namespace.as_deref());
        self.lookup(kind, custom, ns, name)
            .or_else(|| self.lookup(kind, custom, None, name))
            .ok_or_else(|| SymbolError::Unresolved { kind, custom, name: name.to_string() })
    }

    fn lookup(&self, kind: TemplateKind, custom: bool, namespace: Option<&str>, name: &str) -> Option<&TemplateEntry> {
        let qname = QualifiedName {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        };
        let registry = self.registry(kind);
        if custom {
            registry.customs.get(&qname)
        } else {
            registry.templates.get(&qname)
        }
    }

    /// Merges another translation unit's templates/customs into this
    /// environment, as if they'd been declared under `namespace` here.
    /// Name clashes are a duplicate-definition error raised immediately
    /// (spec.md §4.4: "at import time, not at use time").
    pub fn merge_imported(&mut self, other: SymbolEnvironment, namespace: Option<&str>) -> Result<(), SymbolError> {
        for kind in [TemplateKind::Style, TemplateKind::Element, TemplateKind::Var] {
            let other_registry = match kind {
                TemplateKind::Style => &other.style,
                TemplateKind::Element => &other.element,
                TemplateKind::Var => &other.var,
            };
            for (qname, entry) in &other_registry.templates {
                self.insert_merged(kind, false, namespace, qname, entry.clone())?;
            }
            for (qname, entry) in &other_registry.customs {
                self.insert_merged(kind, true, namespace, qname, entry.clone())?;
            }
        }
        Ok(())
    }

    fn insert_merged(
        &mut self,
        kind: TemplateKind,
        custom: bool,
        namespace: Option<&str>,
        qname: &QualifiedName,
        entry: TemplateEntry,
    ) -> Result<(), SymbolError> {
        let target_ns = namespace.map(str::to_string).or_else(|| qname.namespace.clone());
        let target = QualifiedName {
            namespace: target_ns,
            name: qname.name.clone(),
        };
        let registry = self.registry_mut(kind);
        let table = if custom { &mut registry.customs } else { &mut registry.templates };
        if let Some(existing) = table.get(&target) {
            return Err(SymbolError::DuplicateDefinition {
                kind,
                custom,
                name: target.name,
                first: existing.position,
            });
        }
        table.insert(target, entry);
        Ok(())
    }
}

/// `inherit X` copies `X`'s body ahead of the inheriting definition's own
/// body (spec.md §4.3: "copies all properties / child nodes / variables").
fn merge_inherited(base: TemplateBody, own: TemplateBody, arena: &mut crate::ast::Arena) -> TemplateBody {
    match (base, own) {
        (TemplateBody::Style(mut base_items), TemplateBody::Style(own_items)) => {
            base_items.extend(own_items);
            TemplateBody::Style(base_items)
        }
        (TemplateBody::Element(base_children), TemplateBody::Element(own_children)) => {
            let mut children: Vec<NodeId> = base_children.iter().map(|id| arena.clone_subtree(*id)).collect();
            children.extend(own_children);
            TemplateBody::Element(children)
        }
        (TemplateBody::Var(mut base_vars), TemplateBody::Var(own_vars)) => {
            for (k, v) in own_vars {
                if let Some(existing) = base_vars.iter_mut().find(|(bk, _)| *bk == k) {
                    existing.1 = v;
                } else {
                    base_vars.push((k, v));
                }
            }
            TemplateBody::Var(base_vars)
        }
        (_, own) => own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arena;

    #[test]
    fn registers_and_resolves_a_style_template() {
        let mut env = SymbolEnvironment::new();
        let mut arena = Arena::new();
        env.register(
            TemplateKind::Style,
            false,
            None,
            "Base",
            &[],
            TemplateBody::Style(vec![]),
            vec![],
            SourcePosition::start(),
            &mut arena,
        )
        .unwrap();
        assert!(env.resolve(TemplateKind::Style, false, None, "Base").is_ok());
        assert!(env.resolve(TemplateKind::Style, false, None, "Missing").is_err());
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut env = SymbolEnvironment::new();
        let mut arena = Arena::new();
        env.register(
            TemplateKind::Style,
            false,
            None,
            "Base",
            &[],
            TemplateBody::Style(vec![]),
            vec![],
            SourcePosition::start(),
            &mut arena,
        )
        .unwrap();
        let err = env
            .register(
                TemplateKind::Style,
                false,
                None,
                "Base",
                &[],
                TemplateBody::Style(vec![]),
                vec![],
                SourcePosition::start(),
                &mut arena,
            )
            .unwrap_err();
        assert!(matches!(err, SymbolError::DuplicateDefinition { .. }));
    }

    #[test]
    fn inherit_copies_base_properties_ahead_of_own() {
        use crate::expr::Expr;
        let mut env = SymbolEnvironment::new();
        let mut arena = Arena::new();
        env.register(
            TemplateKind::Style,
            false,
            None,
            "Base",
            &[],
            TemplateBody::Style(vec![crate::ast::StyleItem::Property {
                name: "color".into(),
                value: Expr::Str("red".into()),
            }]),
            vec![],
            SourcePosition::start(),
            &mut arena,
        )
        .unwrap();
        env.register(
            TemplateKind::Style,
            false,
            None,
            "Derived",
            &["Base".to_string()],
            TemplateBody::Style(vec![crate::ast::StyleItem::Property {
                name: "padding".into(),
                value: Expr::Str("5px".into()),
            }]),
            vec![],
            SourcePosition::start(),
            &mut arena,
        )
        .unwrap();
        let entry = env.resolve(TemplateKind::Style, false, None, "Derived").unwrap();
        match &entry.body {
            TemplateBody::Style(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected style body"),
        }
    }

    #[test]
    fn undefined_base_is_an_error() {
        let mut env = SymbolEnvironment::new();
        let mut arena = Arena::new();
        let err = env
            .register(
                TemplateKind::Style,
                false,
                None,
                "Derived",
                &["Ghost".to_string()],
                TemplateBody::Style(vec![]),
                vec![],
                SourcePosition::start(),
                &mut arena,
            )
            .unwrap_err();
        assert!(matches!(err, SymbolError::UndefinedBase { .. }));
    }
}
