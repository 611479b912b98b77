//! The registry of component factories, by type name and by override.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use super::{Factory, FactoryId, Primitive, PrimitiveKind};
use crate::{
    codec::PropertyMap,
    deps::DependencyGraph,
    error::{Error, Result},
    template::Template,
};

/// A stored factory.
struct Entry {
    /// Type name.
    name: String,
    /// Factory implementation.
    factory: Box<dyn Factory>,
}

/// All known factories, indexed by type name and by instance-name override.
#[derive(Default)]
pub struct FactoryRegistry {
    /// Factory storage.
    entries: SlotMap<FactoryId, Entry>,
    /// Type name index.
    by_name: BTreeMap<String, FactoryId>,
    /// Override index, keyed by stripped instance name.
    overrides: BTreeMap<String, FactoryId>,
}

/// The override key of an instance name: everything before the first `.`,
/// `:` or digit. `myGrid:0` and `myGrid2` both map to `myGrid`.
pub fn override_key(instance_name: &str) -> &str {
    instance_name
        .find(|c: char| c == '.' || c == ':' || c.is_ascii_digit())
        .map_or(instance_name, |i| &instance_name[..i])
}

impl FactoryRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a registry holding every primitive kind.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        for kind in PrimitiveKind::ALL {
            r.add(kind.name(), Box::new(Primitive::new(kind)));
        }
        r
    }

    /// Register a factory under a type name, replacing any previous one.
    pub fn add(&mut self, name: &str, factory: Box<dyn Factory>) -> FactoryId {
        self.remove(name);
        let id = self.entries.insert(Entry {
            name: name.to_string(),
            factory,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Register a factory used for every component whose instance name strips
    /// to the same override key as `instance_name`, whatever type it asks for.
    pub fn add_override(
        &mut self,
        instance_name: &str,
        type_name: &str,
        factory: Box<dyn Factory>,
    ) -> FactoryId {
        let key = override_key(instance_name).to_string();
        if let Some(old) = self.overrides.remove(&key) {
            self.entries.remove(old);
        }
        let id = self.entries.insert(Entry {
            name: type_name.to_string(),
            factory,
        });
        self.overrides.insert(key, id);
        id
    }

    /// Remove the override registered for an instance name.
    pub fn remove_override(&mut self, instance_name: &str) -> bool {
        match self.overrides.remove(override_key(instance_name)) {
            Some(id) => {
                self.entries.remove(id);
                true
            }
            None => false,
        }
    }

    /// Find the factory for a component: an override matching the instance
    /// name wins over the type name.
    pub fn resolve(&self, type_name: &str, instance_name: &str) -> Option<FactoryId> {
        let key = override_key(instance_name);
        if !key.is_empty()
            && let Some(id) = self.overrides.get(key)
        {
            return Some(*id);
        }
        self.by_name.get(type_name).copied()
    }

    /// Return a factory by handle.
    pub fn get(&self, id: FactoryId) -> Option<&dyn Factory> {
        self.entries.get(id).map(|e| e.factory.as_ref())
    }

    /// Return a factory by type name.
    pub fn by_type(&self, name: &str) -> Option<&dyn Factory> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Return the handle registered under a type name.
    pub fn id_of(&self, name: &str) -> Option<FactoryId> {
        self.by_name.get(name).copied()
    }

    /// Return the type name of a factory.
    pub fn name_of(&self, id: FactoryId) -> Option<&str> {
        self.entries.get(id).map(|e| e.name.as_str())
    }

    /// Is a type name registered?
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Rename a type. Fails if the new name is taken.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if self.by_name.contains_key(new) {
            return Err(Error::NameConflict(new.to_string()));
        }
        let id = self
            .by_name
            .remove(old)
            .ok_or_else(|| Error::UnknownFactory(old.to_string()))?;
        self.by_name.insert(new.to_string(), id);
        if let Some(e) = self.entries.get_mut(id) {
            e.name = new.to_string();
            if let Some(t) = e.factory.as_template_mut() {
                t.set_name(new);
            }
        }
        Ok(())
    }

    /// Remove a type. Components already created keep their handle, which
    /// no longer resolves.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Factory>> {
        let id = self.by_name.remove(name)?;
        self.entries.remove(id).map(|e| e.factory)
    }

    /// Type names, sorted. Overrides are not included.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Names of every template type, sorted.
    pub fn templates(&self) -> Vec<String> {
        self.by_name
            .iter()
            .filter(|(_, id)| self.template_by_id(**id).is_some())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Return a template by type name.
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.by_type(name).and_then(|f| f.as_template())
    }

    /// Return a template by handle.
    pub fn template_by_id(&self, id: FactoryId) -> Option<&Template> {
        self.get(id).and_then(|f| f.as_template())
    }

    /// Remove every template type, keeping primitives and overrides.
    pub fn remove_templates(&mut self) {
        self.retain_templates(|_| false);
    }

    /// Remove the template types for which `keep` returns false.
    pub fn retain_templates(&mut self, mut keep: impl FnMut(&str) -> bool) {
        for name in self.templates() {
            if !keep(&name) {
                self.remove(&name);
            }
        }
    }

    /// Register a template. An existing template of the same name keeps its
    /// handle and only has its recipe replaced.
    pub fn add_template(&mut self, name: &str, recipe: Vec<PropertyMap>) -> FactoryId {
        if let Some(id) = self.id_of(name)
            && let Some(t) = self
                .entries
                .get_mut(id)
                .and_then(|e| e.factory.as_template_mut())
        {
            t.update_layout(recipe);
            return id;
        }
        self.add(name, Box::new(Template::new(name, recipe)))
    }

    /// Would placing factory `a` inside template `b` make `b` contain
    /// itself? True when `a == b` or `a` reaches `b` through template recipes.
    pub fn has_dependency(&self, a: &str, b: &str) -> bool {
        DependencyGraph::from_factories(self).has_dependency(a, b)
    }
}
