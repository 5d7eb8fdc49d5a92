//! Index-based AST storage (spec.md §9: "arenas and indices, not pointer
//! graphs"). Nodes reference each other by [`NodeId`] handle into a single
//! translation-unit-local [`Arena`]; imports merge *copies* of subtrees, so
//! no reference cycles ever arise.

use super::Node;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deep-copies the subtree rooted at `id` into fresh arena slots,
    /// returning the new root's id. Used to instantiate a template body at a
    /// use site without aliasing the definition's nodes (spec.md §3
    /// lifecycle: "specialization is performed on cloned subtrees").
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let node = self.get(id).clone();
        let cloned = match node {
            Node::Element {
                tag,
                attributes,
                children,
                style,
                script,
                position,
            } => {
                let children = children.iter().map(|c| self.clone_subtree(*c)).collect();
                let style = style.map(|s| self.clone_subtree(s));
                let script = script.map(|s| self.clone_subtree(s));
                Node::Element {
                    tag,
                    attributes,
                    children,
                    style,
                    script,
                    position,
                }
            }
            Node::Style { items, position } => {
                let items = items.into_iter().map(|item| self.clone_style_item(item)).collect();
                Node::Style { items, position }
            }
            Node::Usage {
                kind,
                name,
                namespace,
                edits,
                position,
            } => {
                let edits = edits.into_iter().map(|e| self.clone_spec_edit(e)).collect();
                Node::Usage {
                    kind,
                    name,
                    namespace,
                    edits,
                    position,
                }
            }
            other => other,
        };
        self.alloc(cloned)
    }

    fn clone_spec_edit(&mut self, edit: super::SpecEdit) -> super::SpecEdit {
        match edit {
            super::SpecEdit::InsertAfter { anchor, children } => super::SpecEdit::InsertAfter {
                anchor,
                children: children.iter().map(|c| self.clone_subtree(*c)).collect(),
            },
            super::SpecEdit::InsertBefore { anchor, children } => super::SpecEdit::InsertBefore {
                anchor,
                children: children.iter().map(|c| self.clone_subtree(*c)).collect(),
            },
            other => other,
        }
    }

    fn clone_style_item(&mut self, item: super::StyleItem) -> super::StyleItem {
        match item {
            super::StyleItem::Usage(id) => super::StyleItem::Usage(self.clone_subtree(id)),
            super::StyleItem::Rule { selector, body } => super::StyleItem::Rule {
                selector,
                body: body.into_iter().map(|i| self.clone_style_item(i)).collect(),
            },
            other @ super::StyleItem::Property { .. } => other,
        }
    }
}
