//! Properties shared by every factory, dispatched through a static table.

use geom::{Point, Rect};

use super::{Ctx, Factory};
use crate::{
    error::{Error, Result},
    schema::Schema,
    tree::ComponentId,
};

/// Where a base property is stored on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Name of the creating factory.
    Factory,
    /// Name of the managed parent.
    Parent,
    /// Registry name.
    Name,
    /// Label text.
    Label,
    /// Whether the parent resizes through this component.
    Resizable,
    /// Active flag.
    Active,
    /// Visible flag.
    Visible,
    /// Output flag.
    Output,
    /// Left edge.
    X,
    /// Top edge.
    Y,
    /// Width.
    W,
    /// Height.
    H,
    /// Anything else, stored in the node's attribute map.
    Attr,
}

/// Alignment flags.
const ALIGN: &str = "bitmask{TOP=1,BOTTOM=2,LEFT=4,RIGHT=8,INSIDE=16,TEXT_OVER_IMAGE=32,\
                     CLIP=64,WRAP=128,IMAGE_NEXT_TO_TEXT=256,IMAGE_BACKDROP=512}";

/// Label fonts.
const LABEL_FONT: &str = "enum{HELVETICA,HELVETICA_BOLD,HELVETICA_ITALIC,HELVETICA_BOLD_ITALIC,\
                          COURIER,COURIER_BOLD,COURIER_ITALIC,COURIER_BOLD_ITALIC,TIMES,\
                          TIMES_BOLD,TIMES_ITALIC,TIMES_BOLD_ITALIC,SYMBOL,SCREEN,SCREEN_BOLD,\
                          ZAPF_DINGBATS}";

/// Label rendering styles.
const LABEL_TYPE: &str = "enum{NORMAL,NO_LABEL,SHADOW,ENGRAVED,EMBOSSED}";

/// Box styles.
const BOX_TYPE: &str = "enum{NO,FLAT,UP,DOWN,UP_FRAME,DOWN_FRAME,THIN_UP,THIN_DOWN,THIN_UP_FRAME,\
                        THIN_DOWN_FRAME,ENGRAVED,EMBOSSED,ENGRAVED_FRAME,EMBOSSED_FRAME,BORDER,\
                        SHADOW,BORDER_FRAME,SHADOW_FRAME,ROUNDED,RSHADOW,ROUNDED_FRAME,RFLAT,\
                        ROUND_UP,ROUND_DOWN,DIAMOND_UP,DIAMOND_DOWN,OVAL,OSHADOW,OVAL_FRAME,OFLAT,\
                        PLASTIC_UP,PLASTIC_DOWN,PLASTIC_UP_FRAME,PLASTIC_DOWN_FRAME,\
                        PLASTIC_THIN_UP,PLASTIC_THIN_DOWN,PLASTIC_ROUND_UP,PLASTIC_ROUND_DOWN,\
                        GTK_UP,GTK_DOWN,GTK_UP_FRAME,GTK_DOWN_FRAME,GTK_THIN_UP,GTK_THIN_DOWN,\
                        GTK_THIN_UP_FRAME,GTK_THIN_DOWN_FRAME,GTK_ROUND_UP,GTK_ROUND_DOWN,\
                        GLEAM_UP,GLEAM_DOWN,GLEAM_UP_FRAME,GLEAM_DOWN_FRAME,GLEAM_THIN_UP,\
                        GLEAM_THIN_DOWN,GLEAM_ROUND_UP,GLEAM_ROUND_DOWN}";

/// The base property table: key, schema tag, storage slot.
const BASE: &[(&str, &str, Slot)] = &[
    ("factory", "readonly", Slot::Factory),
    ("parent", "string", Slot::Parent),
    ("name", "string", Slot::Name),
    ("label", "string", Slot::Label),
    ("resizable", "bool", Slot::Resizable),
    ("active", "bool", Slot::Active),
    ("visible", "bool", Slot::Visible),
    ("color", "color", Slot::Attr),
    ("labelcolor", "color", Slot::Attr),
    ("align", ALIGN, Slot::Attr),
    ("labelfont", LABEL_FONT, Slot::Attr),
    ("labelsize", "int", Slot::Attr),
    ("labeltype", LABEL_TYPE, Slot::Attr),
    ("selection_color", "color", Slot::Attr),
    ("output", "bool", Slot::Output),
    ("box", BOX_TYPE, Slot::Attr),
    ("x", "int", Slot::X),
    ("y", "int", Slot::Y),
    ("w", "int", Slot::W),
    ("h", "int", Slot::H),
];

/// The schema of the properties every factory supports.
pub fn base_schema() -> Schema {
    let mut schema = Schema::new();
    for (key, tag, _) in BASE {
        match tag.parse() {
            Ok(kind) => schema.push(*key, kind),
            Err(e) => tracing::error!("bad base property tag for {key}: {e}"),
        }
    }
    schema
}

/// The storage slot of a key.
fn slot(key: &str) -> Slot {
    BASE.iter()
        .find(|(k, _, _)| *k == key)
        .map_or(Slot::Attr, |(_, _, s)| *s)
}

/// Render a flag.
fn flag(b: bool) -> String {
    String::from(if b { "1" } else { "0" })
}

/// Read a property through the base table.
pub fn get<F: Factory + ?Sized>(
    factory: &F,
    ctx: &mut Ctx<'_>,
    id: ComponentId,
    key: &str,
) -> Option<String> {
    let info = factory.schema().get(key)?;
    let node = ctx.tree.node(id)?;
    Some(match slot(key) {
        Slot::Factory => node
            .factory()
            .and_then(|f| ctx.factories.name_of(f))
            .unwrap_or_default()
            .to_string(),
        Slot::Parent => match ctx.registry.parent_of(ctx.tree, id) {
            Some(p) => ctx
                .registry
                .name_of(ctx.tree, p)
                .unwrap_or_default()
                .to_string(),
            None => String::new(),
        },
        Slot::Name => ctx
            .registry
            .name_of(ctx.tree, id)
            .unwrap_or_default()
            .to_string(),
        Slot::Label => node.label().to_string(),
        Slot::Resizable => flag(
            node.parent()
                .and_then(|p| ctx.tree.node(p))
                .is_some_and(|p| p.resizable() == Some(id)),
        ),
        Slot::Active => flag(node.active()),
        Slot::Visible => flag(node.visible()),
        Slot::Output => flag(node.output()),
        Slot::X => node.rect().tl.x.to_string(),
        Slot::Y => node.rect().tl.y.to_string(),
        Slot::W => node.rect().w.to_string(),
        Slot::H => node.rect().h.to_string(),
        Slot::Attr => match node.attr(key) {
            Some(v) => v.to_string(),
            None if info.kind.is_numeric() => "0".to_string(),
            None => String::new(),
        },
    })
}

/// Write a property through the base table.
pub fn set<F: Factory + ?Sized>(
    factory: &F,
    ctx: &mut Ctx<'_>,
    id: ComponentId,
    key: &str,
    value: &str,
) -> Result<()> {
    let info = factory
        .schema()
        .get(key)
        .ok_or_else(|| Error::UnknownProperty(key.to_string()))?;
    info.kind.validate(key, value)?;
    let n = value.trim().parse::<i32>().unwrap_or_default();
    let rect = ctx.tree.get(id)?.rect();
    match slot(key) {
        Slot::Factory => Err(Error::ReadOnly(key.to_string())),
        Slot::Parent => set_parent(ctx, id, value),
        Slot::Name => ctx.registry.rename(ctx.tree, id, value),
        Slot::Label => {
            ctx.tree.get_mut(id)?.label = value.to_string();
            Ok(())
        }
        Slot::Resizable => {
            let parent = ctx.tree.parent(id).ok_or_else(|| Error::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })?;
            let p = ctx.tree.get_mut(parent)?;
            if n != 0 {
                p.resizable = Some(id);
            } else if p.resizable == Some(id) {
                p.resizable = None;
            }
            Ok(())
        }
        Slot::Active => {
            ctx.tree.get_mut(id)?.active = n != 0;
            Ok(())
        }
        Slot::Visible => {
            ctx.tree.get_mut(id)?.visible = n != 0;
            Ok(())
        }
        Slot::Output => {
            ctx.tree.get_mut(id)?.output = n != 0;
            Ok(())
        }
        Slot::X => factory.resize(ctx.tree, id, rect.at(Point::new(n, rect.tl.y))),
        Slot::Y => factory.resize(ctx.tree, id, rect.at(Point::new(rect.tl.x, n))),
        Slot::W => factory.resize(ctx.tree, id, Rect { w: n, ..rect }),
        Slot::H => factory.resize(ctx.tree, id, Rect { h: n, ..rect }),
        Slot::Attr => {
            let stored = if info.kind.is_numeric() {
                n.to_string()
            } else {
                value.to_string()
            };
            ctx.tree.get_mut(id)?.attrs.insert(key.to_string(), stored);
            Ok(())
        }
    }
}

/// Re-parent a component under a managed container of the same registry. An
/// empty name leaves the component where it is.
fn set_parent(ctx: &mut Ctx<'_>, id: ComponentId, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let parent = ctx
        .registry
        .lookup(ctx.tree, value)
        .ok_or_else(|| Error::MissingParent(value.to_string()))?;
    if !ctx.tree.get(parent)?.is_container() {
        return Err(Error::NotAContainer(value.to_string()));
    }
    if parent == id || ctx.tree.is_ancestor(id, parent) {
        return Err(Error::InvalidValue {
            key: "parent".to_string(),
            value: value.to_string(),
        });
    }
    ctx.tree.attach(parent, id)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        factory::{FactoryRegistry, create_component, get_property, set_property},
        registry::ComponentRegistry,
        schema::PropertyKind,
        tree::Tree,
    };

    #[test]
    fn every_tag_parses() {
        let schema = base_schema();
        assert_eq!(schema.len(), BASE.len());
        let boxes = &schema.get("box").unwrap().kind;
        assert_eq!(boxes.choices().len(), 56);
        assert_eq!(boxes.describe(30), "PLASTIC_UP");
        assert_eq!(boxes.describe(38), "GTK_UP");
        assert_eq!(boxes.describe(55), "GLEAM_ROUND_DOWN");
        assert_eq!(
            schema.get("align").unwrap().kind,
            ALIGN.parse::<PropertyKind>().unwrap()
        );
    }

    #[test]
    fn reflective_access() {
        let factories = FactoryRegistry::with_builtins();
        let mut tree = Tree::new();
        let mut reg = ComponentRegistry::new();
        let mut ctx = Ctx::new(&mut tree, &mut reg, &factories);

        let g = create_component(&mut ctx, "Group", "g", Rect::new(0, 0, 100, 100), "").unwrap();
        let b = create_component(&mut ctx, "Button", "b", Rect::new(10, 10, 20, 20), "").unwrap();
        let c = create_component(&mut ctx, "Box", "c", Rect::new(0, 0, 5, 5), "").unwrap();

        assert_eq!(
            set_property(&mut ctx, b, "parent", "nope"),
            Err(Error::MissingParent("nope".into()))
        );
        assert_eq!(
            set_property(&mut ctx, b, "parent", "c"),
            Err(Error::NotAContainer("c".into()))
        );
        set_property(&mut ctx, b, "parent", "g").unwrap();
        assert_eq!(get_property(&mut ctx, b, "parent").as_deref(), Some("g"));
        assert_eq!(get_property(&mut ctx, g, "parent").as_deref(), Some(""));
        assert_eq!(
            set_property(&mut ctx, g, "parent", "g"),
            Err(Error::InvalidValue {
                key: "parent".into(),
                value: "g".into()
            })
        );

        assert_eq!(
            set_property(&mut ctx, c, "resizable", "1"),
            Err(Error::InvalidValue {
                key: "resizable".into(),
                value: "1".into()
            })
        );
        set_property(&mut ctx, b, "resizable", "1").unwrap();
        assert_eq!(get_property(&mut ctx, b, "resizable").as_deref(), Some("1"));
        set_property(&mut ctx, b, "resizable", "0").unwrap();
        assert_eq!(get_property(&mut ctx, b, "resizable").as_deref(), Some("0"));

        assert_eq!(
            set_property(&mut ctx, b, "factory", "Box"),
            Err(Error::ReadOnly("factory".into()))
        );
        assert_eq!(
            set_property(&mut ctx, b, "bogus", "1"),
            Err(Error::UnknownProperty("bogus".into()))
        );
        assert_eq!(
            set_property(&mut ctx, b, "color", "red"),
            Err(Error::InvalidValue {
                key: "color".into(),
                value: "red".into()
            })
        );
        set_property(&mut ctx, b, "color", " 88").unwrap();
        assert_eq!(get_property(&mut ctx, b, "color").as_deref(), Some("88"));

        set_property(&mut ctx, b, "name", "ok").unwrap();
        assert_eq!(
            set_property(&mut ctx, b, "name", "g"),
            Err(Error::NameConflict("g".into()))
        );
        assert_eq!(get_property(&mut ctx, b, "name").as_deref(), Some("ok"));
    }

    #[test]
    fn geometry_moves_subtree() {
        let factories = FactoryRegistry::with_builtins();
        let mut tree = Tree::new();
        let mut reg = ComponentRegistry::new();
        let mut ctx = Ctx::new(&mut tree, &mut reg, &factories);

        let g = create_component(&mut ctx, "Group", "g", Rect::new(0, 0, 100, 100), "").unwrap();
        let b = create_component(&mut ctx, "Button", "b", Rect::new(10, 10, 20, 20), "").unwrap();
        set_property(&mut ctx, b, "parent", "g").unwrap();
        set_property(&mut ctx, g, "x", "50").unwrap();
        set_property(&mut ctx, g, "h", "40").unwrap();
        assert_eq!(get_property(&mut ctx, b, "x").as_deref(), Some("60"));
        assert_eq!(get_property(&mut ctx, b, "y").as_deref(), Some("10"));
        assert_eq!(get_property(&mut ctx, g, "h").as_deref(), Some("40"));
    }
}
