//! The name index of managed components.
//!
//! A [`ComponentRegistry`] maps names to component handles and back. The tree
//! may destroy a component without telling the registry (a template instance
//! being repopulated, a group being cleared), so records are checked against
//! the [`Tree`] and stale ones are reaped before anything is returned.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::{Error, Result},
    factory::FactoryId,
    tree::{ComponentId, Tree},
};

/// A mutation callback: receives the component, the property key and the new
/// value.
pub type Callback = Box<dyn FnMut(ComponentId, &str, &str)>;

/// One managed component.
pub struct ComponentRecord {
    /// Unique name within the registry.
    name: String,
    /// Factory that created the component.
    factory: FactoryId,
    /// Component handle.
    id: ComponentId,
    /// Optional mutation callback.
    callback: Option<Callback>,
}

impl ComponentRecord {
    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creating factory.
    pub fn factory(&self) -> FactoryId {
        self.factory
    }

    /// Component handle.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Does the record carry a callback?
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

/// Bidirectional name ⇄ handle index.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Records by handle.
    records: HashMap<ComponentId, ComponentRecord>,
    /// Handles by name.
    by_name: BTreeMap<String, ComponentId>,
    /// [`Tree::removals`] at the last reap.
    reaped: u64,
}

impl ComponentRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record whose component no longer exists. Only scans when
    /// the tree has removed something since the last reap.
    pub fn reap(&mut self, tree: &Tree) {
        if self.reaped == tree.removals() {
            return;
        }
        self.reaped = tree.removals();
        let stale: Vec<ComponentId> = self
            .records
            .keys()
            .filter(|id| !tree.contains(**id))
            .copied()
            .collect();
        for id in stale {
            self.remove(id);
        }
    }

    /// Register a component under a name.
    pub fn insert(
        &mut self,
        tree: &Tree,
        name: &str,
        factory: FactoryId,
        id: ComponentId,
    ) -> Result<()> {
        self.reap(tree);
        if self.by_name.contains_key(name) {
            return Err(Error::NameConflict(name.to_string()));
        }
        if let Some(old) = self.records.remove(&id) {
            self.by_name.remove(&old.name);
        }
        self.by_name.insert(name.to_string(), id);
        self.records.insert(
            id,
            ComponentRecord {
                name: name.to_string(),
                factory,
                id,
                callback: None,
            },
        );
        Ok(())
    }

    /// Find a component by name.
    pub fn lookup(&mut self, tree: &Tree, name: &str) -> Option<ComponentId> {
        self.reap(tree);
        self.by_name.get(name).copied()
    }

    /// Return the record of a component.
    pub fn record(&mut self, tree: &Tree, id: ComponentId) -> Option<&ComponentRecord> {
        self.reap(tree);
        self.records.get(&id)
    }

    /// Return the record of a live component without reaping.
    pub fn get(&self, tree: &Tree, id: ComponentId) -> Option<&ComponentRecord> {
        self.records.get(&id).filter(|_| tree.contains(id))
    }

    /// Return the name of a component.
    pub fn name_of(&mut self, tree: &Tree, id: ComponentId) -> Option<&str> {
        self.record(tree, id).map(ComponentRecord::name)
    }

    /// Return the factory of a component.
    pub fn factory_of(&mut self, tree: &Tree, id: ComponentId) -> Option<FactoryId> {
        self.record(tree, id).map(ComponentRecord::factory)
    }

    /// Is the component registered here?
    pub fn is_managed(&mut self, tree: &Tree, id: ComponentId) -> bool {
        self.record(tree, id).is_some()
    }

    /// Rename a component. Renaming to the current name is a no-op.
    pub fn rename(&mut self, tree: &Tree, id: ComponentId, new_name: &str) -> Result<()> {
        self.reap(tree);
        let Some(record) = self.records.get_mut(&id) else {
            return Err(Error::UnknownComponent(format!("{id:?}")));
        };
        if record.name == new_name {
            return Ok(());
        }
        if new_name.is_empty() {
            return Err(Error::InvalidName(new_name.to_string()));
        }
        if self.by_name.contains_key(new_name) {
            return Err(Error::NameConflict(new_name.to_string()));
        }
        let old = std::mem::replace(&mut record.name, new_name.to_string());
        self.by_name.remove(&old);
        self.by_name.insert(new_name.to_string(), id);
        Ok(())
    }

    /// Forget a component. Returns its record if it was registered.
    pub fn remove(&mut self, id: ComponentId) -> Option<ComponentRecord> {
        let record = self.records.remove(&id)?;
        self.by_name.remove(&record.name);
        Some(record)
    }

    /// Forget every component.
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_name.clear();
    }

    /// Names of all managed components, sorted.
    pub fn names(&mut self, tree: &Tree) -> Vec<String> {
        self.reap(tree);
        self.by_name.keys().cloned().collect()
    }

    /// All records, sorted by name.
    pub fn records(&mut self, tree: &Tree) -> Vec<&ComponentRecord> {
        self.reap(tree);
        self.by_name
            .values()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Number of managed components.
    pub fn len(&mut self, tree: &Tree) -> usize {
        self.reap(tree);
        self.records.len()
    }

    /// Return true if no components are managed.
    pub fn is_empty(&mut self, tree: &Tree) -> bool {
        self.len(tree) == 0
    }

    /// The first free name of the form `{prefix}0`, `{prefix}1`, ...
    pub fn unique_name(&mut self, tree: &Tree, prefix: &str) -> String {
        self.reap(tree);
        (0usize..)
            .map(|i| format!("{prefix}{i}"))
            .find(|n| !self.by_name.contains_key(n))
            .unwrap_or_default()
    }

    /// Managed components under `root`, in pre-order. Unmanaged components
    /// are skipped and not descended into. `root` itself may be unmanaged.
    pub fn child_components(&mut self, tree: &Tree, root: ComponentId) -> Vec<ComponentId> {
        self.reap(tree);
        let mut out = Vec::new();
        let mut stack: Vec<ComponentId> = tree.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !self.records.contains_key(&id) {
                continue;
            }
            out.push(id);
            stack.extend(tree.children(id).iter().rev());
        }
        out
    }

    /// The nearest managed ancestor of a component.
    pub fn parent_of(&mut self, tree: &Tree, id: ComponentId) -> Option<ComponentId> {
        self.reap(tree);
        let mut current = tree.parent(id);
        while let Some(p) = current {
            if self.records.contains_key(&p) {
                return Some(p);
            }
            current = tree.parent(p);
        }
        None
    }

    /// Install or clear the mutation callback of a component.
    pub fn set_callback(
        &mut self,
        tree: &Tree,
        id: ComponentId,
        callback: Option<Callback>,
    ) -> Result<()> {
        self.reap(tree);
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownComponent(format!("{id:?}")))?;
        record.callback = callback;
        Ok(())
    }

    /// Invoke a component's callback, if it has one.
    pub fn notify(&mut self, tree: &Tree, id: ComponentId, key: &str, value: &str) {
        self.reap(tree);
        if let Some(cb) = self.records.get_mut(&id).and_then(|r| r.callback.as_mut()) {
            cb(id, key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use geom::Rect;
    use pretty_assertions::assert_eq;
    use slotmap::KeyData;

    use super::*;
    use crate::tree::Node;

    fn fid() -> FactoryId {
        FactoryId::from(KeyData::from_ffi(1))
    }

    fn leaf(tree: &mut Tree) -> ComponentId {
        tree.insert(Node::new(None, Rect::zero(), ""))
    }

    #[test]
    fn name_conflict() {
        let mut t = Tree::new();
        let mut r = ComponentRegistry::new();
        let a = leaf(&mut t);
        let b = leaf(&mut t);
        r.insert(&t, "a", fid(), a).unwrap();
        assert_eq!(
            r.insert(&t, "a", fid(), b),
            Err(Error::NameConflict("a".into()))
        );
        assert_eq!(r.lookup(&t, "a"), Some(a));
        assert_eq!(r.name_of(&t, b), None);
    }

    #[test]
    fn rename_keeps_handle() {
        let mut t = Tree::new();
        let mut r = ComponentRegistry::new();
        let a = leaf(&mut t);
        let b = leaf(&mut t);
        r.insert(&t, "a", fid(), a).unwrap();
        r.insert(&t, "b", fid(), b).unwrap();
        assert_eq!(
            r.rename(&t, a, "b"),
            Err(Error::NameConflict("b".into()))
        );
        r.rename(&t, a, "c").unwrap();
        r.rename(&t, a, "c").unwrap();
        assert_eq!(r.lookup(&t, "a"), None);
        assert_eq!(r.lookup(&t, "c"), Some(a));
        assert_eq!(r.names(&t), vec!["b", "c"]);
    }

    #[test]
    fn stale_records_are_reaped() {
        let mut t = Tree::new();
        let mut r = ComponentRegistry::new();
        let a = leaf(&mut t);
        r.insert(&t, "w0", fid(), a).unwrap();
        t.remove_subtree(a).unwrap();
        assert_eq!(r.lookup(&t, "w0"), None);
        assert_eq!(r.unique_name(&t, "w"), "w0");
        let b = leaf(&mut t);
        r.insert(&t, "w0", fid(), b).unwrap();
        assert_eq!(r.unique_name(&t, "w"), "w1");

        // A second removal is noticed after lookups have caught up.
        let c = leaf(&mut t);
        r.insert(&t, "c", fid(), c).unwrap();
        assert_eq!(r.lookup(&t, "c"), Some(c));
        t.remove_subtree(b).unwrap();
        assert_eq!(r.lookup(&t, "w0"), None);
        assert_eq!(r.names(&t), vec!["c"]);
    }

    #[test]
    fn managed_children_skip_unmanaged() {
        let mut t = Tree::new();
        let mut r = ComponentRegistry::new();
        let root = t.insert(Node::new(None, Rect::zero(), "").with_container(true));
        let g = t.insert(Node::new(None, Rect::zero(), "").with_container(true));
        let inner = leaf(&mut t);
        let hidden = t.insert(Node::new(None, Rect::zero(), "").with_container(true));
        let under_hidden = leaf(&mut t);
        t.attach(root, g).unwrap();
        t.attach(g, inner).unwrap();
        t.attach(root, hidden).unwrap();
        t.attach(hidden, under_hidden).unwrap();
        for (n, id) in [("g", g), ("inner", inner), ("under", under_hidden)] {
            r.insert(&t, n, fid(), id).unwrap();
        }
        assert_eq!(r.child_components(&t, root), vec![g, inner]);
        assert_eq!(r.parent_of(&t, inner), Some(g));
        assert_eq!(r.parent_of(&t, under_hidden), None);
    }

    #[test]
    fn callbacks() {
        let mut t = Tree::new();
        let mut r = ComponentRegistry::new();
        let a = leaf(&mut t);
        r.insert(&t, "a", fid(), a).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let cb: Callback = Box::new(move |_: ComponentId, k: &str, v: &str| {
            s.borrow_mut().push(format!("{k}={v}"));
        });
        r.set_callback(&t, a, Some(cb)).unwrap();
        r.notify(&t, a, "label", "hi");
        assert_eq!(*seen.borrow(), vec!["label=hi".to_string()]);
    }
}
