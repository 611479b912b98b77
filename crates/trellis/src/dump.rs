//! Debug rendering of component subtrees.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use geom::Rect;
use serde::Serialize;

use crate::{
    error::Result,
    session::Session,
    tree::{ComponentId, Node, Tree},
};

/// One node of a subtree outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineRow {
    /// Distance from the outlined root.
    pub depth: usize,
    /// Component name; group roots show their label.
    pub name: String,
    /// Factory type name, empty for group roots.
    pub factory: String,
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
    /// Label text.
    pub label: String,
    /// Status words.
    pub flags: Vec<&'static str>,
}

/// Walk a subtree in pre-order, template internals included.
pub fn outline(session: &mut Session, root: ComponentId) -> Result<Vec<OutlineRow>> {
    session.tree().get(root)?;
    let mut order = vec![(root, 0)];
    let mut stack: Vec<(ComponentId, usize)> = session
        .tree()
        .children(root)
        .iter()
        .rev()
        .map(|c| (*c, 1))
        .collect();
    while let Some((id, depth)) = stack.pop() {
        order.push((id, depth));
        stack.extend(session.tree().children(id).iter().rev().map(|c| (*c, depth + 1)));
    }

    let mut rows = Vec::with_capacity(order.len());
    for (id, depth) in order {
        let name = display_name(session, id);
        let tree = session.tree();
        let node = tree.get(id)?;
        let rect = node.rect();
        rows.push(OutlineRow {
            depth,
            name,
            factory: node
                .factory()
                .and_then(|f| session.factories().name_of(f))
                .unwrap_or_default()
                .to_string(),
            x: rect.tl.x,
            y: rect.tl.y,
            w: rect.w,
            h: rect.h,
            label: node.label().to_string(),
            flags: flags(tree, id, node),
        });
    }
    Ok(rows)
}

/// Renders a component subtree as a table: one row per node in pre-order,
/// names indented by depth. This is a debug function.
pub fn dump(session: &mut Session, root: ComponentId) -> Result<String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["name", "factory", "rect", "label", "flags"]);
    for row in outline(session, root)? {
        let rect = Rect::new(row.x, row.y, row.w, row.h);
        table.add_row(vec![
            Cell::new(format!("{}{}", "  ".repeat(row.depth), row.name)).fg(Color::Green),
            Cell::new(if row.factory.is_empty() { "-" } else { row.factory.as_str() }),
            Cell::new(rect),
            Cell::new(&row.label),
            Cell::new(row.flags.join(" ")),
        ]);
    }
    Ok(table.to_string())
}

/// The name of a node: its document name, its name inside the nearest
/// template instance, or the label of an unmanaged root.
fn display_name(session: &mut Session, id: ComponentId) -> String {
    if let Some(name) = session.name_of(id) {
        return name;
    }
    let tree = session.tree();
    let mut current = tree.parent(id);
    while let Some(p) = current {
        if let Some(scope) = tree.node(p).and_then(Node::scope) {
            return scope
                .get(tree, id)
                .map(|r| r.name().to_string())
                .unwrap_or_default();
        }
        current = tree.parent(p);
    }
    tree.node(id).map(|n| n.label().to_string()).unwrap_or_default()
}

/// Status words for a node.
fn flags(tree: &Tree, id: ComponentId, node: &Node) -> Vec<&'static str> {
    let mut out = Vec::new();
    if node.is_container() {
        out.push("container");
    }
    if node.scope().is_some() {
        out.push("instance");
    }
    if !node.visible() {
        out.push("hidden");
    }
    if !node.active() {
        out.push("inactive");
    }
    if node.output() {
        out.push("output");
    }
    if tree
        .parent(id)
        .and_then(|p| tree.node(p))
        .is_some_and(|p| p.resizable() == Some(id))
    {
        out.push("resizable");
    }
    out
}
