//! Built-in component kinds.

use geom::Rect;

use super::{Ctx, Factory, base_schema};
use crate::{
    error::Result,
    schema::{Choice, PropertyKind, Schema},
    tree::{ComponentId, Node},
};

/// The built-in component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Plain container.
    Group,
    /// Scrolling container.
    Scroll,
    /// Container that stacks its children.
    Pack,
    /// Decorative box with a label.
    Box,
    /// Push button.
    Button,
    /// Check box.
    CheckButton,
    /// Single-line text input.
    Input,
    /// Multi-line text input.
    MultilineInput,
    /// Single-line text output.
    Output,
    /// Multi-line text output.
    MultilineOutput,
    /// Menu bar.
    MenuBar,
    /// String table.
    Table,
    /// Bar that splits neighbours vertically.
    VerticalResizer,
    /// Bar that splits neighbours horizontally.
    HorizontalResizer,
}

impl PrimitiveKind {
    /// Every built-in kind.
    pub const ALL: [Self; 14] = [
        Self::Group,
        Self::Scroll,
        Self::Pack,
        Self::Box,
        Self::Button,
        Self::CheckButton,
        Self::Input,
        Self::MultilineInput,
        Self::Output,
        Self::MultilineOutput,
        Self::MenuBar,
        Self::Table,
        Self::VerticalResizer,
        Self::HorizontalResizer,
    ];

    /// The registered type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Scroll => "Scroll",
            Self::Pack => "Pack",
            Self::Box => "Box",
            Self::Button => "Button",
            Self::CheckButton => "CheckButton",
            Self::Input => "Input",
            Self::MultilineInput => "MultilineInput",
            Self::Output => "Output",
            Self::MultilineOutput => "MultilineOutput",
            Self::MenuBar => "MenuBar",
            Self::Table => "Table",
            Self::VerticalResizer => "VerticalResizer",
            Self::HorizontalResizer => "HorizontalResizer",
        }
    }

    /// Can this kind hold children?
    pub fn is_container(self) -> bool {
        matches!(self, Self::Group | Self::Scroll | Self::Pack)
    }

    /// Does this kind draw its own outline?
    pub fn border_visible(self) -> bool {
        matches!(
            self,
            Self::Button
                | Self::Input
                | Self::MultilineInput
                | Self::Output
                | Self::MultilineOutput
                | Self::MenuBar
        )
    }

    /// Initial style attributes: `(box, color, align, selection_color)`.
    fn style(self) -> (i32, i32, i32, i32) {
        match self {
            Self::Group | Self::Scroll | Self::Pack | Self::Box => (0, 49, 0, 49),
            Self::Button | Self::MenuBar => (2, 49, 0, 49),
            Self::CheckButton => (0, 49, 20, 2),
            Self::Input | Self::MultilineInput | Self::Output | Self::MultilineOutput => {
                (3, 7, 4, 15)
            }
            Self::Table => (5, 49, 0, 15),
            Self::VerticalResizer | Self::HorizontalResizer => (1, 49, 0, 49),
        }
    }

    /// Build the node for a fresh component of this kind.
    fn node(self, rect: Rect, label: &str) -> Node {
        let (boxtype, color, align, selection) = self.style();
        let node = Node::new(None, rect, label)
            .with_container(self.is_container())
            .with_attr("box", boxtype)
            .with_attr("color", color)
            .with_attr("align", align)
            .with_attr("selection_color", selection)
            .with_attr("labelcolor", 0)
            .with_attr("labelfont", 0)
            .with_attr("labelsize", 14)
            .with_attr("labeltype", 0);
        if self == Self::Pack {
            node.with_attr("type", 0)
        } else {
            node
        }
    }
}

/// Factory for a built-in kind.
#[derive(Debug, Clone)]
pub struct Primitive {
    /// Component kind.
    kind: PrimitiveKind,
    /// Property descriptors.
    schema: Schema,
}

impl Primitive {
    /// Construct the factory for a kind.
    pub fn new(kind: PrimitiveKind) -> Self {
        let mut schema = base_schema();
        if kind == PrimitiveKind::Pack {
            schema.push(
                "type",
                PropertyKind::Enum(Choice::sequence(&["VERTICAL", "HORIZONTAL"])),
            );
        }
        Self { kind, schema }
    }

    /// The component kind.
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }
}

impl Factory for Primitive {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    fn border_visible(&self) -> bool {
        self.kind.border_visible()
    }

    fn instantiate(&self, ctx: &mut Ctx<'_>, rect: Rect, label: &str) -> Result<ComponentId> {
        Ok(ctx.tree.insert(self.kind.node(rect, label)))
    }
}
