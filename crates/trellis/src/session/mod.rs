//! The document context.
//!
//! A [`Session`] owns the component arena, the document's component registry,
//! the factory registry, the groups and the undo history. Every mutating
//! operation is bracketed by [`Session::action_start`] and
//! [`Session::action_end`]: the first records an undo point, the second
//! rebuilds the group templates and refreshes their instances.
#![allow(clippy::multiple_inherent_impl)]

/// Copy, cut and paste.
mod clipboard;
/// Group management.
mod groups;
/// Document files.
mod io;

use std::collections::BTreeSet;

use geom::{Point, Rect};

pub use groups::Group;

use crate::{
    codec::{PropertyMap, keys},
    config::SessionConfig,
    deps::DependencyGraph,
    error::{Error, Result},
    factory::{self, Ctx, FactoryRegistry},
    history::{Snapshot, UndoHistory},
    registry::{Callback, ComponentRegistry},
    schema::Schema,
    tree::{ComponentId, Node, Tree},
};

/// Default size of a component added without an explicit rectangle.
const DEFAULT_SIZE: i32 = 50;

/// The kind of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A selection change. Records no undo point.
    Select,
    /// A component was added.
    AddComponent,
    /// Components were deleted.
    Delete,
    /// A property was set.
    SetProperty,
    /// Components were moved.
    Move,
    /// A component was resized.
    Resize,
    /// A group was added.
    GroupAdd,
    /// A group was renamed.
    GroupRename,
    /// A group was deleted.
    GroupDelete,
    /// Components were cut to the clipboard.
    Cut,
    /// Clipboard text was pasted.
    Paste,
    /// The document was cleared.
    FileNew,
    /// A document was loaded.
    FileLoad,
}

/// An editable document.
pub struct Session {
    /// Settings.
    config: SessionConfig,
    /// Component arena.
    tree: Tree,
    /// Document-level component names.
    components: ComponentRegistry,
    /// Primitive, template and override factories.
    factories: FactoryRegistry,
    /// Groups, in creation order.
    groups: Vec<Group>,
    /// Undo points.
    history: UndoHistory,
    /// The open action, if any.
    action: Option<Action>,
    /// Templates loaded from outside the document. They survive undo, load and
    /// new-document operations.
    external: BTreeSet<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Construct a session with default settings.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Construct a session holding the built-in primitives and one empty
    /// group.
    pub fn with_config(config: SessionConfig) -> Self {
        let history = UndoHistory::new(config.history_limit);
        let mut s = Self {
            config,
            tree: Tree::new(),
            components: ComponentRegistry::new(),
            factories: FactoryRegistry::with_builtins(),
            groups: Vec::new(),
            history,
            action: None,
            external: BTreeSet::new(),
        };
        s.ensure_default_group();
        s.regenerate_templates();
        s
    }

    /// The session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The component arena.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The factory registry.
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// The factory registry, for registering overrides and custom factories.
    pub fn factories_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.factories
    }

    /// The undo history.
    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// The open action, if any.
    pub fn current_action(&self) -> Option<Action> {
        self.action
    }

    /// Open an action, ending any open one first. Every action except
    /// [`Action::Select`] records an undo point.
    pub fn action_start(&mut self, action: Action) {
        self.action_end();
        self.action = Some(action);
        if action != Action::Select {
            let snapshot = self.snapshot();
            self.history.push(snapshot);
        }
    }

    /// Close the open action and bring every template up to date with its
    /// group. Does nothing if no action is open.
    pub fn action_end(&mut self) {
        if self.action.take().is_some() {
            self.regenerate_templates();
        }
    }

    /// Abandon an action that failed before changing the document.
    fn cancel_action(&mut self) {
        if self.action.take().is_some_and(|a| a != Action::Select) {
            self.history.discard_last();
        }
    }

    /// Run `f` inside an action. A failure cancels the action and leaves no
    /// undo point, so `f` must fail before it changes anything.
    fn with_action<T>(
        &mut self,
        action: Action,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.action_start(action);
        match f(self) {
            Ok(v) => {
                self.action_end();
                Ok(v)
            }
            Err(e) => {
                self.cancel_action();
                Err(e)
            }
        }
    }

    /// Serialize every group into a snapshot.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::new(self.group_lines(true))
    }

    /// Step back one undo point. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.action_end();
        if self.history.at_top() {
            let snapshot = self.snapshot();
            self.history.save_top(snapshot);
        }
        let Some(snapshot) = self.history.step_back().cloned() else {
            return Ok(false);
        };
        self.apply(&snapshot)?;
        Ok(true)
    }

    /// Step forward one undo point. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.action_end();
        let Some(snapshot) = self.history.step_forward().cloned() else {
            return Ok(false);
        };
        self.apply(&snapshot)?;
        Ok(true)
    }

    /// Replace the document with a snapshot. Groups missing from the snapshot
    /// are deleted, the others are cleared and rebuilt. Lines that fail to
    /// build are skipped.
    pub fn apply(&mut self, snapshot: &Snapshot) -> Result<()> {
        let groups = snapshot.groups();
        let absent: Vec<String> = self
            .groups
            .iter()
            .filter(|g| !groups.contains_key(g.name()))
            .map(|g| g.name().to_string())
            .collect();
        for name in absent {
            self.destroy_group(&name)?;
        }
        let roots: Vec<ComponentId> = self.groups.iter().map(Group::root).collect();
        for root in roots {
            self.tree.clear_children(root)?;
        }
        self.components.reap(&self.tree);

        let external = &self.external;
        self.factories.retain_templates(|n| external.contains(n));
        for (name, lines) in &groups {
            let recipe = lines
                .iter()
                .filter(|p| p.contains_key(keys::FACTORY))
                .cloned()
                .collect();
            self.factories.add_template(name, recipe);
        }

        for (name, lines) in &groups {
            let root = match self.group_root(name) {
                Some(root) => root,
                None => self.insert_group(name),
            };
            let origin = self.tree.get(root)?.rect().tl;
            for props in lines.iter().filter(|p| p.contains_key(keys::FACTORY)) {
                if let Err(e) = self.build_line(root, origin, props, false) {
                    tracing::warn!("undo: cannot rebuild {}: {e}", props.serialize());
                }
            }
        }
        self.ensure_default_group();
        self.regenerate_templates();
        Ok(())
    }

    /// Rebuild the template of every group from its components, drop the
    /// templates whose group is gone along with their instances, then refresh
    /// every document instance with inner templates first.
    pub fn regenerate_templates(&mut self) {
        let groups: Vec<(String, ComponentId)> = self
            .groups
            .iter()
            .map(|g| (g.name().to_string(), g.root()))
            .collect();
        for (name, root) in &groups {
            let recipe = self
                .components
                .child_components(&self.tree, *root)
                .into_iter()
                .filter_map(|id| self.properties(id))
                .collect();
            self.factories.add_template(name, recipe);
            self.external.remove(name);
        }

        for name in self.factories.templates() {
            if groups.iter().any(|(g, _)| *g == name) || self.external.contains(&name) {
                continue;
            }
            if let Some(fid) = self.factories.id_of(&name) {
                for id in self.instances(fid) {
                    if let Err(e) = self.tree.remove_subtree(id) {
                        tracing::warn!("removing instance of {name}: {e}");
                    }
                }
            }
            self.factories.remove(&name);
        }
        self.components.reap(&self.tree);

        for name in DependencyGraph::from_factories(&self.factories).order() {
            let Some(fid) = self.factories.id_of(&name) else {
                continue;
            };
            let instances = self.instances(fid);
            let Some(template) = self.factories.template_by_id(fid) else {
                continue;
            };
            for id in instances {
                if let Err(e) = template.populate(&mut self.tree, &self.factories, id, 0) {
                    tracing::warn!("refreshing instance of {name}: {e}");
                }
            }
        }
    }

    /// Document components created by a factory.
    fn instances(&mut self, factory: factory::FactoryId) -> Vec<ComponentId> {
        self.components
            .records(&self.tree)
            .into_iter()
            .filter(|r| r.factory() == factory)
            .map(|r| r.id())
            .collect()
    }

    /// Create a component and attach it under `parent`. No undo point is
    /// recorded.
    pub fn create_component(
        &mut self,
        parent: ComponentId,
        type_name: &str,
        name: &str,
        rect: Rect,
        label: &str,
    ) -> Result<ComponentId> {
        if !self.tree.contains(parent) {
            return Err(Error::UnknownComponent(format!("{parent:?}")));
        }
        let id = self.create_detached(type_name, name, rect, label)?;
        self.tree.attach(parent, id)?;
        Ok(id)
    }

    /// Create a registered component that is not part of any group. This is
    /// how an application embeds a template outside the document.
    pub fn create_detached(
        &mut self,
        type_name: &str,
        name: &str,
        rect: Rect,
        label: &str,
    ) -> Result<ComponentId> {
        let mut ctx = Ctx::new(&mut self.tree, &mut self.components, &self.factories);
        factory::create_component(&mut ctx, type_name, name, rect, label)
    }

    /// Add a component to a group under a generated name. It goes inside
    /// `target` when that is a managed container, else at the group's top
    /// level. A type that would make the group's template contain itself is
    /// rejected.
    pub fn add_component(
        &mut self,
        group: &str,
        type_name: &str,
        rect: Option<Rect>,
        target: Option<ComponentId>,
    ) -> Result<ComponentId> {
        let root = self
            .group_root(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        if self.factories.has_dependency(type_name, group) {
            return Err(Error::CycleRejected {
                factory: type_name.to_string(),
                target: group.to_string(),
            });
        }
        let origin = self.tree.get(root)?.rect().tl;
        let rect =
            rect.unwrap_or_else(|| Rect::new(origin.x, origin.y, DEFAULT_SIZE, DEFAULT_SIZE));
        let parent = self.container_or(target, root);
        let name = self.unique_name();
        self.with_action(Action::AddComponent, |s| {
            s.create_component(parent, type_name, &name, rect, &name)
        })
    }

    /// `target` if it is a managed container inside the group rooted at
    /// `root`, else `root`.
    fn container_or(&mut self, target: Option<ComponentId>, root: ComponentId) -> ComponentId {
        target
            .filter(|t| self.tree.is_ancestor(root, *t))
            .filter(|t| self.components.is_managed(&self.tree, *t))
            .filter(|t| self.tree.node(*t).is_some_and(Node::is_container))
            .unwrap_or(root)
    }

    /// Fail with `CycleRejected` if moving `id` and its managed descendants
    /// into `group` would make the group's template contain itself.
    fn check_embedding(&mut self, id: ComponentId, group: &str) -> Result<()> {
        let mut ids = vec![id];
        ids.extend(self.components.child_components(&self.tree, id));
        for c in ids {
            if let Some(f) = self.factory_name(c)
                && self.factories.has_dependency(&f, group)
            {
                return Err(Error::CycleRejected {
                    factory: f,
                    target: group.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Delete components and everything under them.
    pub fn remove_components(&mut self, ids: &[ComponentId]) -> Result<()> {
        self.remove_with(ids, Action::Delete)
    }

    /// Delete the top-level members of `ids` inside an action.
    fn remove_with(&mut self, ids: &[ComponentId], action: Action) -> Result<()> {
        let tops = self.top_level(ids);
        if tops.is_empty() {
            return Ok(());
        }
        self.action_start(action);
        let removed = tops
            .into_iter()
            .try_for_each(|id| self.tree.remove_subtree(id));
        self.components.reap(&self.tree);
        self.action_end();
        removed
    }

    /// The managed members of `ids` that have no ancestor in `ids`, without
    /// duplicates, in the given order.
    pub(crate) fn top_level(&mut self, ids: &[ComponentId]) -> Vec<ComponentId> {
        let set: BTreeSet<ComponentId> = ids.iter().copied().collect();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for id in ids {
            if !self.components.is_managed(&self.tree, *id) || !seen.insert(*id) {
                continue;
            }
            if set.iter().any(|a| self.tree.is_ancestor(*a, *id)) {
                continue;
            }
            out.push(*id);
        }
        out
    }

    /// Move components, with their subtrees, by an offset.
    pub fn move_components(&mut self, ids: &[ComponentId], dx: i32, dy: i32) -> Result<()> {
        let tops = self.top_level(ids);
        if tops.is_empty() || (dx == 0 && dy == 0) {
            return Ok(());
        }
        self.action_start(Action::Move);
        let moved = tops.into_iter().try_for_each(|id| {
            let rect = self.tree.get(id)?.rect().shift(dx, dy);
            self.resize_raw(id, rect)
        });
        self.action_end();
        moved
    }

    /// Give a component a new rectangle.
    pub fn resize_component(&mut self, id: ComponentId, rect: Rect) -> Result<()> {
        if !self.components.is_managed(&self.tree, id) {
            return Err(Error::UnknownComponent(format!("{id:?}")));
        }
        if self.tree.get(id)?.rect() == rect {
            return Ok(());
        }
        self.with_action(Action::Resize, |s| s.resize_raw(id, rect))
    }

    /// Resize through the component's factory.
    fn resize_raw(&mut self, id: ComponentId, rect: Rect) -> Result<()> {
        let fid = self
            .components
            .factory_of(&self.tree, id)
            .ok_or_else(|| Error::UnknownComponent(format!("{id:?}")))?;
        let f = self
            .factories
            .get(fid)
            .ok_or_else(|| Error::UnknownFactory(format!("{fid:?}")))?;
        f.resize(&mut self.tree, id, rect)
    }

    /// Rename a component.
    pub fn rename_component(&mut self, id: ComponentId, name: &str) -> Result<()> {
        self.set_property(id, keys::NAME, name)
    }

    /// Read a property of a managed component.
    pub fn get_property(&mut self, id: ComponentId, key: &str) -> Option<String> {
        if !self.components.is_managed(&self.tree, id) {
            return None;
        }
        let mut ctx = Ctx::new(&mut self.tree, &mut self.components, &self.factories);
        factory::get_property(&mut ctx, id, key)
    }

    /// Write a property of a managed component. Setting the current value is
    /// a no-op; a change records an undo point and then runs the component's
    /// callback. Moving a component into a group whose template it (or one of
    /// its descendants) depends on is rejected.
    pub fn set_property(&mut self, id: ComponentId, key: &str, value: &str) -> Result<()> {
        if !self.components.is_managed(&self.tree, id) {
            return Err(Error::UnknownComponent(format!("{id:?}")));
        }
        if self.get_property(id, key).as_deref() == Some(value) {
            return Ok(());
        }
        if key == keys::PARENT
            && let Some(target) = self.components.lookup(&self.tree, value)
            && let Some(group) = self.group_of(target).map(str::to_string)
        {
            self.check_embedding(id, &group)?;
        }
        self.with_action(Action::SetProperty, |s| {
            let mut ctx = Ctx::new(&mut s.tree, &mut s.components, &s.factories);
            factory::set_property(&mut ctx, id, key, value)
        })?;
        self.components.notify(&self.tree, id, key, value);
        Ok(())
    }

    /// Every schema property of a managed component with its current value.
    pub fn properties(&mut self, id: ComponentId) -> Option<PropertyMap> {
        let fid = self.components.factory_of(&self.tree, id)?;
        let f = self.factories.get(fid)?;
        let mut ctx = Ctx::new(&mut self.tree, &mut self.components, &self.factories);
        let mut props = PropertyMap::new();
        for key in f.schema().keys() {
            if let Some(value) = f.get_property(&mut ctx, id, key) {
                props.insert(key, value);
            }
        }
        Some(props)
    }

    /// The property schema of a managed component.
    pub fn schema(&mut self, id: ComponentId) -> Option<&Schema> {
        let fid = self.components.factory_of(&self.tree, id)?;
        self.factories.get(fid).map(|f| f.schema())
    }

    /// The factory type name of a managed component.
    pub fn factory_name(&mut self, id: ComponentId) -> Option<String> {
        let fid = self.components.factory_of(&self.tree, id)?;
        self.factories.name_of(fid).map(str::to_string)
    }

    /// Managed components under `root` in pre-order.
    pub fn child_components(&mut self, root: ComponentId) -> Vec<ComponentId> {
        self.components.child_components(&self.tree, root)
    }

    /// The nearest managed ancestor of a component.
    pub fn parent_of(&mut self, id: ComponentId) -> Option<ComponentId> {
        self.components.parent_of(&self.tree, id)
    }

    /// The name of a managed component.
    pub fn name_of(&mut self, id: ComponentId) -> Option<String> {
        self.components
            .name_of(&self.tree, id)
            .map(str::to_string)
    }

    /// Find a managed component by name.
    pub fn lookup(&mut self, name: &str) -> Option<ComponentId> {
        self.components.lookup(&self.tree, name)
    }

    /// Names of every managed component, sorted.
    pub fn component_names(&mut self) -> Vec<String> {
        self.components.names(&self.tree)
    }

    /// Install or clear a component's mutation callback.
    pub fn set_callback(&mut self, id: ComponentId, callback: Option<Callback>) -> Result<()> {
        self.components.set_callback(&self.tree, id, callback)
    }

    /// Would placing factory `a` inside template `b` make `b` contain itself?
    pub fn has_dependency(&self, a: &str, b: &str) -> bool {
        self.factories.has_dependency(a, b)
    }

    /// A free component name built from the configured prefix.
    pub fn unique_name(&mut self) -> String {
        self.components
            .unique_name(&self.tree, &self.config.name_prefix)
    }

    /// Serialize every group: one line per managed component, tagged with its
    /// group, coordinates relative to the group origin. With `placeholders`,
    /// an empty group contributes a bare `layout=<group>` line.
    fn group_lines(&mut self, placeholders: bool) -> Vec<String> {
        let groups: Vec<(String, ComponentId)> = self
            .groups
            .iter()
            .map(|g| (g.name().to_string(), g.root()))
            .collect();
        let mut lines = Vec::new();
        for (name, root) in groups {
            let origin = self.tree.node(root).map_or(Point::zero(), |n| n.rect().tl);
            let ids = self.components.child_components(&self.tree, root);
            if ids.is_empty() && placeholders {
                lines.push(PropertyMap::from([(keys::LAYOUT, name.as_str())]).serialize());
                continue;
            }
            for id in ids {
                let Some(mut props) = self.properties(id) else {
                    continue;
                };
                props.insert(keys::LAYOUT, name.as_str());
                let x = props.int(keys::X).saturating_sub(origin.x);
                let y = props.int(keys::Y).saturating_sub(origin.y);
                props.insert(keys::X, x.to_string());
                props.insert(keys::Y, y.to_string());
                lines.push(props.serialize());
            }
        }
        lines
    }

    /// Create one serialized component under a group root, offset by the
    /// group origin, then set its remaining properties. With `strict`, the
    /// first property failure is returned; otherwise failures are logged and
    /// skipped.
    fn build_line(
        &mut self,
        root: ComponentId,
        origin: Point,
        props: &PropertyMap,
        strict: bool,
    ) -> Result<ComponentId> {
        let type_name = props.get(keys::FACTORY).ok_or(Error::MalformedLine)?;
        let rect = props.rect().shift(origin.x, origin.y);
        let id = self.create_component(
            root,
            type_name,
            props.value(keys::NAME),
            rect,
            props.value(keys::LABEL),
        )?;
        let mut ctx = Ctx::new(&mut self.tree, &mut self.components, &self.factories);
        for (key, value) in props.iter() {
            if keys::CREATION.contains(&key) {
                continue;
            }
            match factory::set_property(&mut ctx, id, key, value) {
                Ok(()) => {}
                Err(e) if strict => return Err(e),
                Err(e) => tracing::debug!("{key}={value} ignored: {e}"),
            }
        }
        Ok(id)
    }
}

/// Does a parsed line only name a group?
fn is_marker(props: &PropertyMap) -> bool {
    props.len() == 1 && props.contains_key(keys::LAYOUT)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_with_default_group() {
        let s = Session::new();
        assert_eq!(s.group_names(), vec!["Layout1"]);
        assert!(s.factories().template("Layout1").is_some());
        assert!(s.history().is_empty());
    }

    #[test]
    fn add_component_names_and_places() {
        let mut s = Session::new();
        let group = "Layout1";
        let a = s.add_component(group, "Group", None, None).unwrap();
        let b = s.add_component(group, "Button", Some(Rect::new(5, 5, 20, 10)), Some(a)).unwrap();
        let c = s.add_component(group, "Box", None, Some(b)).unwrap();
        assert_eq!(s.name_of(a).as_deref(), Some("w0"));
        assert_eq!(s.name_of(b).as_deref(), Some("w1"));
        assert_eq!(s.get_property(a, "w").as_deref(), Some("50"));
        assert_eq!(s.get_property(a, "label").as_deref(), Some("w0"));
        assert_eq!(s.parent_of(b), Some(a));
        // Buttons are not containers.
        assert_eq!(s.parent_of(c), None);
        assert_eq!(s.history().len(), 3);
        assert_eq!(
            s.add_component("Nope", "Box", None, None),
            Err(Error::UnknownGroup("Nope".into()))
        );
        assert_eq!(
            s.add_component(group, "Missing", None, None),
            Err(Error::UnknownFactory("Missing".into()))
        );
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn group_template_tracks_components() {
        let mut s = Session::new();
        let a = s.add_component("Layout1", "Box", None, None).unwrap();
        assert_eq!(
            s.factories().template("Layout1").unwrap().recipe().len(),
            1
        );
        s.remove_components(&[a]).unwrap();
        assert!(s.factories().template("Layout1").unwrap().recipe().is_empty());
    }

    #[test]
    fn set_property_records_and_notifies() {
        let mut s = Session::new();
        let a = s.add_component("Layout1", "Box", None, None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let cb: Callback = Box::new(move |_: ComponentId, k: &str, v: &str| {
            log.borrow_mut().push(format!("{k}={v}"));
        });
        s.set_callback(a, Some(cb)).unwrap();

        let before = s.history().len();
        s.set_property(a, "label", "hello").unwrap();
        s.set_property(a, "label", "hello").unwrap();
        assert_eq!(s.history().len(), before + 1);
        assert_eq!(
            s.set_property(a, "factory", "Button"),
            Err(Error::ReadOnly("factory".into()))
        );
        assert_eq!(s.history().len(), before + 1);
        assert_eq!(*seen.borrow(), vec!["label=hello".to_string()]);
    }

    #[test]
    fn move_translates_subtrees() {
        let mut s = Session::new();
        let g = s.add_component("Layout1", "Group", Some(Rect::new(10, 10, 100, 100)), None).unwrap();
        let b = s.add_component("Layout1", "Box", Some(Rect::new(20, 20, 5, 5)), Some(g)).unwrap();
        s.move_components(&[g, b], 5, -5).unwrap();
        assert_eq!(s.tree().get(g).unwrap().rect(), Rect::new(15, 5, 100, 100));
        assert_eq!(s.tree().get(b).unwrap().rect(), Rect::new(25, 15, 5, 5));
        s.resize_component(b, Rect::new(25, 15, 9, 9)).unwrap();
        assert_eq!(s.get_property(b, "w").as_deref(), Some("9"));
    }

    #[test]
    fn delete_then_undo_redo() {
        let mut s = Session::new();
        let x = s.add_component("Layout1", "Box", Some(Rect::new(10, 10, 30, 30)), None).unwrap();
        s.rename_component(x, "X").unwrap();
        s.remove_components(&[x]).unwrap();
        assert_eq!(s.lookup("X"), None);

        assert!(s.undo().unwrap());
        let x = s.lookup("X").unwrap();
        assert_eq!(s.get_property(x, "x").as_deref(), Some("10"));
        assert_eq!(s.get_property(x, "y").as_deref(), Some("10"));

        assert!(s.redo().unwrap());
        assert_eq!(s.lookup("X"), None);
        assert!(!s.redo().unwrap());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut s = Session::new();
        s.add_group(Some("Outer")).unwrap();
        s.add_component("Outer", "Layout1", None, None).unwrap();
        assert_eq!(
            s.add_component("Layout1", "Outer", None, None),
            Err(Error::CycleRejected {
                factory: "Outer".into(),
                target: "Layout1".into(),
            })
        );
        assert!(matches!(
            s.add_component("Layout1", "Layout1", None, None),
            Err(Error::CycleRejected { .. })
        ));
    }

    #[test]
    fn reparenting_cannot_embed_a_template_in_itself() {
        let mut s = Session::new();
        s.add_group(Some("Card")).unwrap();
        let g = s.add_component("Card", "Group", None, None).unwrap();
        s.rename_component(g, "g").unwrap();
        let c = s.add_component("Layout1", "Card", None, None).unwrap();
        let undo_points = s.history().len();

        assert_eq!(
            s.set_property(c, "parent", "g"),
            Err(Error::CycleRejected {
                factory: "Card".into(),
                target: "Card".into(),
            })
        );
        assert_eq!(s.group_of(c), Some("Layout1"));
        assert_eq!(s.history().len(), undo_points);
        assert!(!s.has_dependency("Card", "Layout1"));

        // A container holding an instance is checked through its subtree.
        let holder = s.add_component("Layout1", "Group", None, None).unwrap();
        let holder_name = s.name_of(holder).unwrap();
        s.set_property(c, "parent", &holder_name).unwrap();
        assert!(matches!(
            s.set_property(holder, "parent", "g"),
            Err(Error::CycleRejected { .. })
        ));

        let saved = s.save_to_string();
        let mut t = Session::new();
        t.load_str(&saved).unwrap();
        assert_eq!(t.save_to_string(), saved);
    }

    #[test]
    fn targets_outside_the_group_are_ignored() {
        let mut s = Session::new();
        s.add_group(Some("Card")).unwrap();
        let g = s.add_component("Card", "Group", None, None).unwrap();
        let b = s.add_component("Layout1", "Box", None, Some(g)).unwrap();
        assert_eq!(s.group_of(b), Some("Layout1"));
        assert_eq!(s.parent_of(b), None);

        let text = "factory=Card,name=c,x=0,y=0,w=10,h=10\n";
        let pasted = s.paste("Layout1", Some(g), Point::zero(), text).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(s.group_of(pasted[0]), Some("Layout1"));
        assert_eq!(s.group_components("Card").unwrap(), vec![g]);
    }

    #[test]
    fn instances_follow_their_group() {
        let mut s = Session::new();
        s.add_group(Some("Card")).unwrap();
        s.add_component("Card", "Box", Some(Rect::new(0, 0, 10, 10)), None)
            .unwrap();
        let card = s
            .add_component("Layout1", "Card", Some(Rect::new(100, 100, 10, 10)), None)
            .unwrap();
        assert_eq!(s.tree().children(card).len(), 1);

        s.add_component("Card", "Button", Some(Rect::new(20, 0, 10, 10)), None)
            .unwrap();
        let inner: Vec<Rect> = s
            .tree()
            .children(card)
            .iter()
            .map(|c| s.tree().get(*c).unwrap().rect())
            .collect();
        assert_eq!(
            inner,
            vec![Rect::new(100, 100, 10, 10), Rect::new(120, 100, 10, 10)]
        );

        s.remove_group("Card").unwrap();
        assert!(!s.tree().contains(card));
        assert!(s.factories().template("Card").is_none());
    }

    #[test]
    fn detached_components_are_managed() {
        let mut s = Session::new();
        let id = s
            .create_detached("Button", "free", Rect::new(1, 2, 3, 4), "Free")
            .unwrap();
        assert_eq!(s.tree().parent(id), None);
        assert_eq!(s.factory_name(id).as_deref(), Some("Button"));
        assert_eq!(s.properties(id).unwrap().value("label"), "Free");
        assert!(s.schema(id).unwrap().get("box").is_some());
    }
}
