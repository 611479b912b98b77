//! Copy, cut and paste of component lines.

use std::collections::BTreeMap;

use geom::Point;

use super::{Action, Session};
use crate::{
    codec::{PropertyMap, keys, parse_lines},
    error::{Error, Result},
    factory::{self, Ctx},
    tree::ComponentId,
};

impl Session {
    /// Serialize components for the clipboard. Each selected component is
    /// followed by its managed descendants; components whose ancestor is also
    /// selected are not repeated. Coordinates are absolute.
    pub fn copy(&mut self, ids: &[ComponentId]) -> String {
        let mut out = String::new();
        for top in self.top_level(ids) {
            let mut all = vec![top];
            all.extend(self.components.child_components(&self.tree, top));
            for id in all {
                if let Some(props) = self.properties(id) {
                    out.push_str(&props.serialize());
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Copy components, then delete them.
    pub fn cut(&mut self, ids: &[ComponentId]) -> Result<String> {
        let text = self.copy(ids);
        self.remove_with(ids, Action::Cut)?;
        Ok(text)
    }

    /// Paste clipboard text into a group.
    ///
    /// Lines whose factory does not resolve, or whose factory would make the
    /// group's template contain itself, are skipped. The pasted block is
    /// placed with its top-left corner at `at`, inside `target` when that is
    /// a managed container, else at the group's top level. Taken names are
    /// replaced by stripping trailing digits and appending the smallest free
    /// number; `parent` references follow the renames. Returns the created
    /// components.
    pub fn paste(
        &mut self,
        group: &str,
        target: Option<ComponentId>,
        at: Point,
        text: &str,
    ) -> Result<Vec<ComponentId>> {
        let root = self
            .group_root(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        let lines: Vec<PropertyMap> = parse_lines(text)
            .into_iter()
            .map(|l| l.props)
            .filter(|p| {
                let f = p.value(keys::FACTORY);
                self.factories.resolve(f, p.value(keys::NAME)).is_some()
                    && !self.factories.has_dependency(f, group)
            })
            .collect();
        let (Some(min_x), Some(min_y)) = (
            lines.iter().map(|p| p.int(keys::X)).min(),
            lines.iter().map(|p| p.int(keys::Y)).min(),
        ) else {
            return Ok(Vec::new());
        };
        let parent = self.container_or(target, root);
        let (dx, dy) = (at.x.saturating_sub(min_x), at.y.saturating_sub(min_y));

        self.action_start(Action::Paste);
        let mut renames: BTreeMap<String, String> = BTreeMap::new();
        let mut created = Vec::new();
        for props in &lines {
            let old = props.value(keys::NAME);
            let name = self.free_name(old);
            let rect = props.rect().shift(dx, dy);
            let id = match self.create_component(
                parent,
                props.value(keys::FACTORY),
                &name,
                rect,
                props.value(keys::LABEL),
            ) {
                Ok(id) => id,
                Err(e) => {
                    tracing::debug!("paste: skipping {old}: {e}");
                    continue;
                }
            };
            renames.insert(old.to_string(), name);
            created.push(id);

            let mut ctx = Ctx::new(&mut self.tree, &mut self.components, &self.factories);
            if let Some(p) = props.get(keys::PARENT).and_then(|p| renames.get(p))
                && let Err(e) = factory::set_property(&mut ctx, id, keys::PARENT, p)
            {
                tracing::debug!("paste: {old} keeps its parent: {e}");
            }
            for (key, value) in props.iter() {
                if keys::STRUCTURAL.contains(&key) {
                    continue;
                }
                if let Err(e) = factory::set_property(&mut ctx, id, key, value) {
                    tracing::debug!("paste: {old}.{key}={value} ignored: {e}");
                }
            }
        }
        self.action_end();
        Ok(created)
    }

    /// `name` if it is free, else its stem with the smallest free number
    /// appended.
    fn free_name(&mut self, name: &str) -> String {
        if !name.is_empty() && self.components.lookup(&self.tree, name).is_none() {
            return name.to_string();
        }
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        let stem = if stem.is_empty() {
            self.config.name_prefix.clone()
        } else {
            stem.to_string()
        };
        self.components.unique_name(&self.tree, &stem)
    }
}
