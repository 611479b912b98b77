//! Templates: reusable component sub-trees described by a recipe of property
//! maps.
//!
//! A template instance is a single composite node. Its children are built from
//! the recipe into a registry local to the instance, so names inside one
//! instance never collide with names in the document or in other instances.
//! Templates may contain other templates.

use std::collections::BTreeSet;

use geom::{Point, Rect};

use crate::{
    codec::{PropertyMap, keys},
    error::{Error, Result},
    factory::{Ctx, Factory, FactoryRegistry, base_schema, create_component, set_property},
    registry::ComponentRegistry,
    schema::Schema,
    tree::{ComponentId, Node, Tree},
};

/// Maximum template nesting depth.
pub const MAX_DEPTH: usize = 32;

/// A factory that builds its components from a recipe.
#[derive(Debug, Clone)]
pub struct Template {
    /// The type name this template is registered under.
    name: String,
    /// Component lines, in build order.
    recipe: Vec<PropertyMap>,
    /// Property descriptors.
    schema: Schema,
}

impl Template {
    /// Construct a template.
    pub fn new(name: &str, recipe: Vec<PropertyMap>) -> Self {
        Self {
            name: name.to_string(),
            recipe,
            schema: base_schema(),
        }
    }

    /// The registered type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Track a rename in the factory registry.
    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// The component lines.
    pub fn recipe(&self) -> &[PropertyMap] {
        &self.recipe
    }

    /// Replace the recipe. Live instances keep their components until they
    /// are repopulated.
    pub fn update_layout(&mut self, recipe: Vec<PropertyMap>) {
        self.recipe = recipe;
    }

    /// Factory names the recipe refers to.
    pub fn references(&self) -> BTreeSet<String> {
        self.recipe
            .iter()
            .map(|p| p.value(keys::FACTORY))
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The bounding box of the recipe.
    pub fn bounds(&self) -> Rect {
        Rect::bounding(self.recipe.iter().map(PropertyMap::rect)).unwrap_or_default()
    }

    /// Clear an instance and rebuild its components from the recipe, placed
    /// relative to the instance's current origin.
    ///
    /// Entries whose factory does not resolve, whose creation fails, or whose
    /// `parent` is not an earlier container of this instance are skipped.
    /// Property failures are ignored. Nesting deeper than [`MAX_DEPTH`] fails
    /// with [`Error::CycleRejected`].
    pub fn populate(
        &self,
        tree: &mut Tree,
        factories: &FactoryRegistry,
        root: ComponentId,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::CycleRejected {
                factory: self.name.clone(),
                target: self.name.clone(),
            });
        }
        tree.clear_children(root)?;
        let origin = tree.get(root)?.rect().tl;
        let offset = origin - self.bounds().tl;
        let mut scope = tree.get_mut(root)?.scope.take().unwrap_or_default();
        scope.clear();

        let built = self.build(
            &mut Ctx {
                tree: &mut *tree,
                registry: &mut scope,
                factories,
                depth: depth + 1,
            },
            root,
            offset,
        );
        if let Some(node) = tree.node_mut(root) {
            node.scope = Some(scope);
        }
        built
    }

    /// Create the recipe's components under `root`.
    fn build(&self, ctx: &mut Ctx<'_>, root: ComponentId, offset: Point) -> Result<()> {
        for props in &self.recipe {
            let factory = props.value(keys::FACTORY);
            let name = props.value(keys::NAME);
            let rect = props.rect().shift(offset.x, offset.y);
            let id = match create_component(ctx, factory, name, rect, props.value(keys::LABEL)) {
                Ok(id) => id,
                Err(e @ Error::CycleRejected { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!("{}: skipping {name}: {e}", self.name);
                    continue;
                }
            };

            let parent_name = props.value(keys::PARENT);
            let parent = if parent_name.is_empty() {
                Some(root)
            } else {
                ctx.registry
                    .lookup(ctx.tree, parent_name)
                    .filter(|p| ctx.tree.node(*p).is_some_and(Node::is_container))
            };
            let Some(parent) = parent else {
                tracing::debug!("{}: {name} has no usable parent {parent_name}", self.name);
                ctx.registry.remove(id);
                ctx.tree.remove_subtree(id)?;
                continue;
            };
            ctx.tree.attach(parent, id)?;

            for (key, value) in props.iter() {
                if keys::STRUCTURAL.contains(&key) {
                    continue;
                }
                if let Err(e) = set_property(ctx, id, key, value) {
                    tracing::debug!("{}: {name}.{key}={value} ignored: {e}", self.name);
                }
            }
        }
        Ok(())
    }
}

impl Factory for Template {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn is_container(&self) -> bool {
        false
    }

    fn border_visible(&self) -> bool {
        false
    }

    fn instantiate(&self, ctx: &mut Ctx<'_>, rect: Rect, label: &str) -> Result<ComponentId> {
        if ctx.depth > MAX_DEPTH {
            return Err(Error::CycleRejected {
                factory: self.name.clone(),
                target: self.name.clone(),
            });
        }
        let mut node = Node::new(None, rect, label);
        node.scope = Some(ComponentRegistry::new());
        let id = ctx.tree.insert(node);
        if let Err(e) = self.populate(ctx.tree, ctx.factories, id, ctx.depth) {
            ctx.tree.remove_subtree(id)?;
            return Err(e);
        }
        Ok(id)
    }

    fn as_template(&self) -> Option<&Template> {
        Some(self)
    }

    fn as_template_mut(&mut self) -> Option<&mut Template> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::factory::{create_component, get_property};

    fn card() -> Vec<PropertyMap> {
        vec![
            PropertyMap::from([
                ("factory", "Group"),
                ("name", "frame"),
                ("x", "100"),
                ("y", "100"),
                ("w", "200"),
                ("h", "100"),
            ]),
            PropertyMap::from([
                ("factory", "Button"),
                ("name", "ok"),
                ("parent", "frame"),
                ("label", "OK"),
                ("x", "110"),
                ("y", "150"),
                ("w", "40"),
                ("h", "20"),
            ]),
            PropertyMap::from([
                ("factory", "Nope"),
                ("name", "skipped"),
                ("x", "0"),
                ("y", "0"),
            ]),
            PropertyMap::from([
                ("factory", "Box"),
                ("name", "orphan"),
                ("parent", "missing"),
            ]),
        ]
    }

    #[test]
    fn populate_offsets_and_skips() {
        let mut factories = FactoryRegistry::with_builtins();
        factories.add_template("Card", card());
        let mut tree = Tree::new();
        let mut reg = ComponentRegistry::new();
        let mut ctx = Ctx::new(&mut tree, &mut reg, &factories);

        let inst =
            create_component(&mut ctx, "Card", "c1", Rect::new(10, 20, 200, 100), "").unwrap();
        // The skipped entry at (0, 0) widens the bounding box.
        let node = ctx.tree.get(inst).unwrap();
        let frame = node.children()[0];
        assert_eq!(node.children().len(), 1);
        assert_eq!(
            ctx.tree.get(frame).unwrap().rect(),
            Rect::new(110, 120, 200, 100)
        );
        let ok = ctx.tree.children(frame)[0];
        assert_eq!(ctx.tree.get(ok).unwrap().rect(), Rect::new(120, 170, 40, 20));
        assert_eq!(ctx.tree.get(ok).unwrap().label(), "OK");

        // Instance internals are not visible in the outer registry.
        assert_eq!(ctx.registry.names(ctx.tree), vec!["c1"]);
        assert_eq!(ctx.registry.child_components(ctx.tree, inst), Vec::new());
        let mut scope = ctx.tree.node_mut(inst).unwrap().scope.take().unwrap();
        assert_eq!(scope.names(ctx.tree), vec!["frame", "ok"]);
        assert_eq!(
            get_property(&mut ctx, inst, "factory").as_deref(),
            Some("Card")
        );
    }

    #[test]
    fn self_reference_is_rejected() {
        let mut factories = FactoryRegistry::with_builtins();
        factories.add_template(
            "Loop",
            vec![PropertyMap::from([("factory", "Loop"), ("name", "inner")])],
        );
        let mut tree = Tree::new();
        let mut reg = ComponentRegistry::new();
        let mut ctx = Ctx::new(&mut tree, &mut reg, &factories);
        let r = create_component(&mut ctx, "Loop", "l", Rect::zero(), "");
        assert!(matches!(r, Err(Error::CycleRejected { .. })));
        assert!(ctx.tree.is_empty());
        assert!(ctx.registry.is_empty(ctx.tree));
    }

    #[test]
    fn references_and_bounds() {
        let t = Template::new("Card", card());
        assert_eq!(
            t.references().into_iter().collect::<Vec<_>>(),
            vec!["Box", "Button", "Group", "Nope"]
        );
        assert_eq!(t.bounds(), Rect::new(0, 0, 300, 200));
    }
}
