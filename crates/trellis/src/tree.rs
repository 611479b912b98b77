//! The component arena.

use std::collections::BTreeMap;

use geom::Rect;
use slotmap::{SlotMap, new_key_type};

use crate::{
    error::{Error, Result},
    factory::FactoryId,
    registry::ComponentRegistry,
};

new_key_type! {
    /// Opaque handle for a component stored in the [`Tree`] arena. Handles carry
    /// a generation, so a handle to a destroyed component never aliases a new
    /// one.
    pub struct ComponentId;
}

/// A component in the arena.
pub struct Node {
    /// The factory that created this node. Group roots have none.
    pub(crate) factory: Option<FactoryId>,

    /// Parent in the arena tree.
    pub(crate) parent: Option<ComponentId>,
    /// Children in the arena tree.
    pub(crate) children: Vec<ComponentId>,
    /// The child that absorbs resizing, if any.
    pub(crate) resizable: Option<ComponentId>,
    /// Can this node hold children?
    pub(crate) container: bool,

    /// Absolute rectangle.
    pub(crate) rect: Rect,
    /// Label text.
    pub(crate) label: String,
    /// Active flag.
    pub(crate) active: bool,
    /// Visible flag.
    pub(crate) visible: bool,
    /// Output-only flag.
    pub(crate) output: bool,
    /// Style attributes and factory-specific properties, normalised to text.
    pub(crate) attrs: BTreeMap<String, String>,

    /// Local registry of a template instance.
    pub(crate) scope: Option<ComponentRegistry>,
}

impl Node {
    /// Construct a detached node.
    pub fn new(factory: Option<FactoryId>, rect: Rect, label: &str) -> Self {
        Self {
            factory,
            parent: None,
            children: Vec::new(),
            resizable: None,
            container: false,
            rect,
            label: label.to_string(),
            active: true,
            visible: true,
            output: false,
            attrs: BTreeMap::new(),
            scope: None,
        }
    }

    /// Mark the node as able to hold children.
    pub fn with_container(mut self, container: bool) -> Self {
        self.container = container;
        self
    }

    /// Seed an attribute value.
    pub fn with_attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    /// The factory that created this node.
    pub fn factory(&self) -> Option<FactoryId> {
        self.factory
    }

    /// Return the node's parent, if any.
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// Return the node's children.
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Return the resizable child.
    pub fn resizable(&self) -> Option<ComponentId> {
        self.resizable
    }

    /// Can this node hold children?
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Return the absolute rectangle.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Return the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Return the active flag.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Return the visible flag.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Return the output flag.
    pub fn output(&self) -> bool {
        self.output
    }

    /// Return an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Return the local registry of a template instance.
    pub fn scope(&self) -> Option<&ComponentRegistry> {
        self.scope.as_ref()
    }
}

/// Arena of components. Every node has at most one parent; detached nodes are
/// roots.
#[derive(Default)]
pub struct Tree {
    /// Node storage.
    nodes: SlotMap<ComponentId, Node>,
    /// Number of removal operations so far.
    removals: u64,
}

impl Tree {
    /// Construct an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node.
    pub fn insert(&mut self, node: Node) -> ComponentId {
        self.nodes.insert(node)
    }

    /// Does the handle refer to a live node?
    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Return a node by handle.
    pub fn node(&self, id: ComponentId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Return a mutable node by handle.
    pub fn node_mut(&mut self, id: ComponentId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Return a node by handle, or an error.
    pub fn get(&self, id: ComponentId) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| not_found(id))
    }

    /// Return a mutable node by handle, or an error.
    pub fn get_mut(&mut self, id: ComponentId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return true if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return a node's parent.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Return a node's children; empty for unknown handles.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.nodes.get(id).map_or(&[], |n| &n.children)
    }

    /// Is `ancestor` a strict ancestor of `node`?
    pub fn is_ancestor(&self, ancestor: ComponentId, node: ComponentId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attach a node as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn attach(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        if !self.nodes.contains_key(parent) {
            return Err(not_found(parent));
        }
        if !self.nodes.contains_key(child) {
            return Err(not_found(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(Error::Internal(format!(
                "attaching {child:?} under {parent:?} would create a cycle"
            )));
        }
        self.detach(child)?;
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Detach a node from its parent if attached.
    pub fn detach(&mut self, child: ComponentId) -> Result<()> {
        let parent = self.get(child)?.parent;
        let Some(parent) = parent else {
            return Ok(());
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|id| *id != child);
            if node.resizable == Some(child) {
                node.resizable = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
        Ok(())
    }

    /// Remove a node and all descendants from the arena.
    pub fn remove_subtree(&mut self, root: ComponentId) -> Result<()> {
        self.detach(root)?;
        for id in self.subtree_post_order(root) {
            self.nodes.remove(id);
        }
        self.removals += 1;
        Ok(())
    }

    /// A counter bumped by every removal. Registries compare it to skip
    /// reaping when nothing has been destroyed.
    pub fn removals(&self) -> u64 {
        self.removals
    }

    /// Remove every child subtree of a node, keeping the node itself.
    pub fn clear_children(&mut self, id: ComponentId) -> Result<()> {
        let children = self.get(id)?.children.clone();
        for child in children {
            self.remove_subtree(child)?;
        }
        Ok(())
    }

    /// Collect the descendants of a node in pre-order, excluding the node.
    pub fn descendants(&self, root: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack: Vec<ComponentId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Collect a subtree in post-order, including the root.
    fn subtree_post_order(&self, root: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, visited)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if visited {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            for child in node.children.iter().rev() {
                stack.push((*child, false));
            }
        }
        out
    }

    /// Move a node and its whole subtree by an offset.
    pub fn translate(&mut self, id: ComponentId, dx: i32, dy: i32) -> Result<()> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        for id in ids {
            let node = self.get_mut(id)?;
            node.rect = node.rect.shift(dx, dy);
        }
        Ok(())
    }

    /// Set a node's rectangle. A change of origin translates the subtree; a
    /// change of size affects only the node.
    pub fn set_rect(&mut self, id: ComponentId, rect: Rect) -> Result<()> {
        let old = self.get(id)?.rect;
        self.translate(
            id,
            rect.tl.x.saturating_sub(old.tl.x),
            rect.tl.y.saturating_sub(old.tl.y),
        )?;
        self.get_mut(id)?.rect = rect;
        Ok(())
    }
}

/// The error returned for a handle that is not in the arena.
fn not_found(id: ComponentId) -> Error {
    Error::UnknownComponent(format!("{id:?}"))
}
