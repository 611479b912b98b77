//! Factories create components and give reflective, string-keyed access to
//! their properties.
//!
//! Primitive adapters and templates both implement [`Factory`]; everything
//! else in the crate talks to components only through this trait and the
//! [`Ctx`] it is handed.

/// Base property table shared by every factory.
pub mod base;
/// Built-in primitive component kinds.
pub mod primitive;
/// Factory storage and name resolution.
pub mod registry;

use geom::Rect;
use slotmap::new_key_type;

pub use base::base_schema;
pub use primitive::{Primitive, PrimitiveKind};
pub use registry::FactoryRegistry;

use crate::{
    error::{Error, Result},
    registry::ComponentRegistry,
    schema::Schema,
    template::Template,
    tree::{ComponentId, Tree},
};

new_key_type! {
    /// Stable handle of a factory inside a [`FactoryRegistry`].
    pub struct FactoryId;
}

/// The environment a factory operates in: the arena, the component registry
/// that names are resolved against, and the available factories.
pub struct Ctx<'a> {
    /// Component arena.
    pub tree: &'a mut Tree,
    /// Name scope for created components and `parent=` lookups.
    pub registry: &'a mut ComponentRegistry,
    /// Available factories.
    pub factories: &'a FactoryRegistry,
    /// Template nesting depth of this context.
    pub(crate) depth: usize,
}

impl<'a> Ctx<'a> {
    /// Construct a top-level context.
    pub fn new(
        tree: &'a mut Tree,
        registry: &'a mut ComponentRegistry,
        factories: &'a FactoryRegistry,
    ) -> Self {
        Self {
            tree,
            registry,
            factories,
            depth: 0,
        }
    }

    /// Template nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A component type.
pub trait Factory {
    /// Ordered property descriptors.
    fn schema(&self) -> &Schema;

    /// Can components of this type hold managed children?
    fn is_container(&self) -> bool;

    /// Do components of this type draw their own outline? Editors outline the
    /// ones that don't.
    fn border_visible(&self) -> bool {
        true
    }

    /// Build a new detached component.
    fn instantiate(&self, ctx: &mut Ctx<'_>, rect: Rect, label: &str) -> Result<ComponentId>;

    /// Read a property. `None` for keys outside the schema.
    fn get_property(&self, ctx: &mut Ctx<'_>, id: ComponentId, key: &str) -> Option<String> {
        base::get(self, ctx, id, key)
    }

    /// Write a property.
    fn set_property(
        &self,
        ctx: &mut Ctx<'_>,
        id: ComponentId,
        key: &str,
        value: &str,
    ) -> Result<()> {
        base::set(self, ctx, id, key, value)
    }

    /// Move or resize a component.
    fn resize(&self, tree: &mut Tree, id: ComponentId, rect: Rect) -> Result<()> {
        tree.set_rect(id, rect)
    }

    /// Downcast to a template.
    fn as_template(&self) -> Option<&Template> {
        None
    }

    /// Downcast to a mutable template.
    fn as_template_mut(&mut self) -> Option<&mut Template> {
        None
    }
}

/// Create a named component of type `type_name`, resolving instance-name
/// overrides first. The component is registered in `ctx.registry` and
/// returned detached.
pub fn create_component(
    ctx: &mut Ctx<'_>,
    type_name: &str,
    name: &str,
    rect: Rect,
    label: &str,
) -> Result<ComponentId> {
    check_name(ctx, name)?;
    let factory = ctx
        .factories
        .resolve(type_name, name)
        .ok_or_else(|| Error::UnknownFactory(type_name.to_string()))?;
    create_with(ctx, factory, name, rect, label)
}

/// Create a named component with a specific factory.
pub fn create_with(
    ctx: &mut Ctx<'_>,
    factory: FactoryId,
    name: &str,
    rect: Rect,
    label: &str,
) -> Result<ComponentId> {
    check_name(ctx, name)?;
    let factories = ctx.factories;
    let f = factories
        .get(factory)
        .ok_or_else(|| Error::UnknownFactory(format!("{factory:?}")))?;
    let id = f.instantiate(ctx, rect, label)?;
    ctx.tree.get_mut(id)?.factory = Some(factory);
    if let Err(e) = ctx.registry.insert(ctx.tree, name, factory, id) {
        ctx.tree.remove_subtree(id)?;
        return Err(e);
    }
    Ok(id)
}

/// Reject empty names and names already taken in the context's registry.
fn check_name(ctx: &mut Ctx<'_>, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName(name.to_string()));
    }
    if ctx.registry.lookup(ctx.tree, name).is_some() {
        return Err(Error::NameConflict(name.to_string()));
    }
    Ok(())
}

/// Read a property of a component through its own factory.
pub fn get_property(ctx: &mut Ctx<'_>, id: ComponentId, key: &str) -> Option<String> {
    let factories = ctx.factories;
    let f = factories.get(ctx.tree.node(id)?.factory()?)?;
    f.get_property(ctx, id, key)
}

/// Write a property of a component through its own factory.
pub fn set_property(ctx: &mut Ctx<'_>, id: ComponentId, key: &str, value: &str) -> Result<()> {
    let factories = ctx.factories;
    let fid = ctx
        .tree
        .get(id)?
        .factory()
        .ok_or_else(|| Error::UnknownComponent(format!("{id:?}")))?;
    let f = factories
        .get(fid)
        .ok_or_else(|| Error::UnknownFactory(format!("{fid:?}")))?;
    f.set_property(ctx, id, key, value)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn create_checks_names() {
        let factories = FactoryRegistry::with_builtins();
        let mut tree = Tree::new();
        let mut reg = ComponentRegistry::new();
        let mut ctx = Ctx::new(&mut tree, &mut reg, &factories);
        let r = Rect::new(0, 0, 10, 10);

        assert_eq!(
            create_component(&mut ctx, "Box", "", r, ""),
            Err(Error::InvalidName(String::new()))
        );
        let a = create_component(&mut ctx, "Box", "a", r, "A").unwrap();
        assert_eq!(
            create_component(&mut ctx, "Box", "a", r, ""),
            Err(Error::NameConflict("a".into()))
        );
        assert_eq!(
            create_component(&mut ctx, "Nope", "b", r, ""),
            Err(Error::UnknownFactory("Nope".into()))
        );
        assert_eq!(ctx.registry.lookup(ctx.tree, "a"), Some(a));
        assert_eq!(get_property(&mut ctx, a, "factory").as_deref(), Some("Box"));
        assert_eq!(get_property(&mut ctx, a, "label").as_deref(), Some("A"));
        assert_eq!(get_property(&mut ctx, a, "nonsense"), None);
    }
}
