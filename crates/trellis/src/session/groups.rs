//! Groups: the named top-level collections that double as templates.

use geom::Rect;

use super::{Action, Session};
use crate::{
    error::{Error, Result},
    tree::{ComponentId, Node},
};

/// A named top-level collection of components. Its root is an unmanaged
/// container placed at the configured origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group name, shared with the group's template.
    pub(super) name: String,
    /// Root container.
    pub(super) root: ComponentId,
}

impl Group {
    /// The group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root container.
    pub fn root(&self) -> ComponentId {
        self.root
    }
}

impl Session {
    /// Every group, in creation order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Every group name, in creation order.
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Find a group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// The root container of a group.
    pub fn group_root(&self, name: &str) -> Option<ComponentId> {
        self.group(name).map(Group::root)
    }

    /// The group a component belongs to.
    pub fn group_of(&self, id: ComponentId) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| self.tree.is_ancestor(g.root, id))
            .map(Group::name)
    }

    /// Managed components of a group in pre-order.
    pub fn group_components(&mut self, name: &str) -> Result<Vec<ComponentId>> {
        let root = self
            .group_root(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;
        Ok(self.components.child_components(&self.tree, root))
    }

    /// Add an empty group. Without a name, the first free `{prefix}N` from 1
    /// is used. The name must not be taken by a group or a factory.
    pub fn add_group(&mut self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(n) => {
                self.check_group_name(n)?;
                n.to_string()
            }
            None => self.next_group_name(),
        };
        self.action_start(Action::GroupAdd);
        self.insert_group(&name);
        self.action_end();
        Ok(name)
    }

    /// Rename a group and its template. Instances keep their link to the
    /// template.
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let index = self
            .groups
            .iter()
            .position(|g| g.name == old)
            .ok_or_else(|| Error::UnknownGroup(old.to_string()))?;
        self.check_group_name(new)?;
        self.with_action(Action::GroupRename, |s| {
            if s.factories.contains(old) {
                s.factories.rename(old, new)?;
            }
            let group = &mut s.groups[index];
            group.name = new.to_string();
            let root = group.root;
            s.tree.get_mut(root)?.label = new.to_string();
            Ok(())
        })
    }

    /// Delete a group and its components. A default group is created if no
    /// group remains.
    pub fn remove_group(&mut self, name: &str) -> Result<()> {
        if self.group(name).is_none() {
            return Err(Error::UnknownGroup(name.to_string()));
        }
        self.action_start(Action::GroupDelete);
        let removed = self.destroy_group(name);
        self.ensure_default_group();
        self.action_end();
        removed
    }

    /// Clear the document down to one empty default group. Templates loaded
    /// with [`Session::load_templates_str`] are kept.
    pub fn new_document(&mut self) -> Result<()> {
        self.action_start(Action::FileNew);
        let cleared = self.destroy_all_groups();
        self.ensure_default_group();
        self.action_end();
        cleared
    }

    /// Reject empty names and names taken by a group or a factory.
    fn check_group_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.group(name).is_some() || self.factories.contains(name) {
            return Err(Error::NameConflict(name.to_string()));
        }
        Ok(())
    }

    /// The first free generated group name.
    fn next_group_name(&self) -> String {
        (1usize..)
            .map(|i| format!("{}{i}", self.config.group_prefix))
            .find(|n| self.check_group_name(n).is_ok())
            .unwrap_or_default()
    }

    /// Create a group root at the configured origin and append the group.
    pub(super) fn insert_group(&mut self, name: &str) -> ComponentId {
        let c = &self.config;
        let rect = Rect::new(c.origin_x, c.origin_y, c.group_width, c.group_height);
        let root = self
            .tree
            .insert(Node::new(None, rect, name).with_container(true));
        self.groups.push(Group {
            name: name.to_string(),
            root,
        });
        root
    }

    /// Remove a group and everything in it.
    pub(super) fn destroy_group(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.groups.iter().position(|g| g.name == name) else {
            return Ok(());
        };
        let group = self.groups.remove(index);
        self.tree.remove_subtree(group.root)?;
        self.components.reap(&self.tree);
        Ok(())
    }

    /// Remove every group.
    pub(super) fn destroy_all_groups(&mut self) -> Result<()> {
        for name in self.group_names() {
            self.destroy_group(&name)?;
        }
        Ok(())
    }

    /// Create the default group if there are no groups.
    pub(super) fn ensure_default_group(&mut self) {
        if self.groups.is_empty() {
            let name = self.config.default_group.clone();
            self.insert_group(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn generated_names_skip_taken() {
        let mut s = Session::new();
        assert_eq!(s.add_group(None).unwrap(), "Layout2");
        s.add_group(Some("Layout4")).unwrap();
        assert_eq!(s.add_group(None).unwrap(), "Layout3");
        assert_eq!(s.add_group(None).unwrap(), "Layout5");
        assert_eq!(
            s.add_group(Some("Box")),
            Err(Error::NameConflict("Box".into()))
        );
        assert_eq!(s.add_group(Some("")), Err(Error::InvalidName(String::new())));
    }

    #[test]
    fn rename_renames_template() {
        let mut s = Session::new();
        s.add_group(Some("Card")).unwrap();
        let inst = s.add_component("Card", "Layout1", None, None).unwrap();
        s.rename_group("Layout1", "Layout2").unwrap();
        assert_eq!(s.group_names(), vec!["Layout2", "Card"]);
        assert!(s.factories().template("Layout1").is_none());
        assert_eq!(s.factories().template("Layout2").unwrap().name(), "Layout2");
        assert_eq!(s.factory_name(inst).as_deref(), Some("Layout2"));
        assert!(s.has_dependency("Layout2", "Layout2"));
        assert_eq!(
            s.rename_group("Layout2", "Card"),
            Err(Error::NameConflict("Card".into()))
        );
        assert_eq!(
            s.rename_group("Nope", "Other"),
            Err(Error::UnknownGroup("Nope".into()))
        );
    }

    #[test]
    fn removing_last_group_recreates_default() {
        let mut s = Session::new();
        let b = s.add_component("Layout1", "Box", None, None).unwrap();
        assert_eq!(s.group_of(b), Some("Layout1"));
        s.remove_group("Layout1").unwrap();
        assert_eq!(s.group_names(), vec!["Layout1"]);
        assert_eq!(s.lookup("w0"), None);
        assert_eq!(
            s.remove_group("Nope"),
            Err(Error::UnknownGroup("Nope".into()))
        );
    }

    #[test]
    fn new_document_resets() {
        let mut s = Session::new();
        s.add_group(Some("Other")).unwrap();
        s.add_component("Other", "Box", None, None).unwrap();
        s.new_document().unwrap();
        assert_eq!(s.group_names(), vec!["Layout1"]);
        assert_eq!(s.factories().templates(), vec!["Layout1"]);
        assert!(s.component_names().is_empty());
    }
}
