//! Bounded full-snapshot undo history.

use std::collections::BTreeMap;

use crate::codec::{PropertyMap, keys};

/// Default number of retained undo points.
pub const DEFAULT_LIMIT: usize = 50;

/// The serialized state of every group at one point in time: one line per
/// component, tagged with `layout=<group>`, coordinates relative to the group
/// origin. An empty group contributes a single `layout=<group>` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Serialized component lines.
    lines: Vec<String>,
}

impl Snapshot {
    /// Construct a snapshot from serialized lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// The serialized lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Partition the lines by group, preserving line order.
    pub fn groups(&self) -> BTreeMap<String, Vec<PropertyMap>> {
        let mut out: BTreeMap<String, Vec<PropertyMap>> = BTreeMap::new();
        for line in &self.lines {
            let props = PropertyMap::deserialize(line);
            out.entry(props.value(keys::LAYOUT).to_string())
                .or_default()
                .push(props);
        }
        out
    }
}

/// A cursor into a bounded stack of snapshots.
///
/// `cursor` is the number of snapshots that lie behind the present state. At
/// the top of history (`cursor == len`) the present state is not yet stored;
/// undo saves it first so that redo can return to it.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    /// Stored snapshots, oldest first.
    points: Vec<Snapshot>,
    /// Position of the present state.
    cursor: usize,
    /// Maximum number of stored snapshots.
    limit: usize,
    /// What the newest push displaced, so that it can be taken back.
    displaced: Option<Displaced>,
}

/// Snapshots removed by a push.
#[derive(Debug, Clone)]
struct Displaced {
    /// Evicted from the front.
    head: Vec<Snapshot>,
    /// Redo points truncated from the back.
    tail: Vec<Snapshot>,
    /// Cursor before the push.
    cursor: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl UndoHistory {
    /// Construct an empty history keeping at most `limit` snapshots.
    pub fn new(limit: usize) -> Self {
        Self {
            points: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
            displaced: None,
        }
    }

    /// Record a new point: redo history beyond the cursor is discarded, and
    /// the oldest point is evicted once the limit is exceeded.
    pub fn push(&mut self, snapshot: Snapshot) {
        let cursor = self.cursor;
        let tail = self.points.split_off(cursor.min(self.points.len()));
        self.points.push(snapshot);
        let excess = self.points.len().saturating_sub(self.limit);
        let head: Vec<Snapshot> = self.points.drain(..excess).collect();
        self.cursor = self.points.len();
        self.displaced = Some(Displaced { head, tail, cursor });
    }

    /// Is the present state beyond the last stored point?
    pub fn at_top(&self) -> bool {
        self.cursor == self.points.len()
    }

    /// Store the present state before the first undo from the top. The cursor
    /// stays on the stored point.
    pub fn save_top(&mut self, snapshot: Snapshot) {
        if self.at_top() {
            self.push(snapshot);
            self.displaced = None;
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// Take back the newest push if the cursor is still at the top: the point
    /// is dropped and any evicted or truncated points are restored. Used when
    /// an action that recorded a point fails before changing anything.
    pub fn discard_last(&mut self) {
        if !self.at_top() {
            return;
        }
        let Some(displaced) = self.displaced.take() else {
            return;
        };
        if self.points.pop().is_none() {
            return;
        }
        let mut points = displaced.head;
        points.append(&mut self.points);
        points.extend(displaced.tail);
        self.points = points;
        self.cursor = displaced.cursor;
    }

    /// Can [`Self::step_back`] succeed?
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Can [`Self::step_forward`] succeed?
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.points.len()
    }

    /// Move back one point and return it.
    pub fn step_back(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.points.get(self.cursor)
    }

    /// Move forward one point and return it.
    pub fn step_forward(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.points.get(self.cursor)
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Return true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The retention limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Return a stored point.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.points.get(index)
    }

    /// Drop every stored point.
    pub fn clear(&mut self) {
        self.points.clear();
        self.cursor = 0;
        self.displaced = None;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn snap(n: usize) -> Snapshot {
        Snapshot::new(vec![format!("layout=L,name=w{n}")])
    }

    #[test]
    fn bounded() {
        let mut h = UndoHistory::new(50);
        for i in 0..60 {
            h.push(snap(i));
        }
        assert_eq!(h.len(), 50);
        assert_eq!(h.cursor(), 50);
        assert_eq!(h.get(0), Some(&snap(10)));
    }

    #[test]
    fn undo_redo_cursor() {
        let mut h = UndoHistory::new(10);
        h.push(snap(0));
        h.push(snap(1));
        assert!(h.at_top());
        h.save_top(snap(2));
        assert_eq!(h.len(), 3);
        assert_eq!(h.step_back(), Some(&snap(1)));
        assert_eq!(h.step_back(), Some(&snap(0)));
        assert_eq!(h.step_back(), None);
        assert_eq!(h.step_forward(), Some(&snap(1)));
        assert_eq!(h.step_forward(), Some(&snap(2)));
        assert_eq!(h.step_forward(), None);

        // A new point discards redo history.
        h.step_back();
        h.push(snap(3));
        assert_eq!(h.len(), 2);
        assert_eq!(h.get(1), Some(&snap(3)));
        assert!(h.at_top());
        assert!(!h.can_redo());
    }

    #[test]
    fn discard_restores_displaced_points() {
        let mut h = UndoHistory::new(3);
        for i in 0..3 {
            h.push(snap(i));
        }
        h.push(snap(3));
        assert_eq!(h.get(0), Some(&snap(1)));
        h.discard_last();
        assert_eq!(h.len(), 3);
        assert_eq!(h.get(0), Some(&snap(0)));
        assert_eq!(h.get(2), Some(&snap(2)));
        assert!(h.at_top());

        // Redo points cut by the discarded push come back too.
        h.save_top(snap(9));
        h.step_back();
        h.step_back();
        let cursor = h.cursor();
        h.push(snap(4));
        h.discard_last();
        assert_eq!(h.cursor(), cursor);
        assert_eq!(h.step_forward(), Some(&snap(2)));

        // Only the newest push can be taken back.
        h.discard_last();
        assert_eq!(h.cursor(), cursor + 1);
    }

    #[test]
    fn groups_partition() {
        let s = Snapshot::new(vec![
            "layout=A,name=a".into(),
            "layout=B".into(),
            "layout=A,name=b".into(),
        ]);
        let g = s.groups();
        assert_eq!(g["A"].len(), 2);
        assert_eq!(g["A"][1].value("name"), "b");
        assert_eq!(g["B"].len(), 1);
    }
}
