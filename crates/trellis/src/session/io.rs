//! Saving and loading documents, and registering templates from files.

use std::{collections::BTreeSet, fs, path::Path};

use super::{Action, Session, is_marker};
use crate::{
    codec::{Layouts, PropertyMap, SourceLine, keys, parse_document},
    error::{Error, Result},
};

/// The recipe described by a layout's lines.
fn recipe(lines: &[SourceLine]) -> Vec<PropertyMap> {
    lines
        .iter()
        .filter(|l| !is_marker(&l.props))
        .map(|l| l.props.clone())
        .collect()
}

impl Session {
    /// Serialize the document: one line per managed component, tagged with
    /// its group, coordinates relative to the group origin.
    pub fn save_to_string(&mut self) -> String {
        let mut out = String::new();
        for line in self.group_lines(false) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write the document to a file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = self.save_to_string();
        fs::write(path.as_ref(), &text)?;
        tracing::info!(
            "saved {} components to {}",
            text.lines().count(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a document file, replacing the current document.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = fs::read_to_string(path.as_ref())?;
        self.load_str(&text)
    }

    /// Replace the document with serialized text.
    ///
    /// Every layout becomes a group, and a template for every layout is
    /// registered before any group is built, so layouts may embed each other.
    /// Lines without a layout go to the default group. The first failing line
    /// aborts the load with the line attached to the error; components built
    /// before it remain.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        let mut layouts = parse_document(text);
        if layouts.is_empty() {
            return Err(Error::EmptyDocument);
        }
        if let Some(lines) = layouts.remove("") {
            layouts
                .entry(self.config.default_group.clone())
                .or_default()
                .extend(lines);
        }
        for name in layouts.keys() {
            if self.factories.contains(name) && self.factories.template(name).is_none() {
                return Err(Error::NameConflict(name.clone()));
            }
        }

        self.action_start(Action::FileLoad);
        let loaded = self.build_layouts(&layouts);
        self.ensure_default_group();
        self.action_end();
        let count = loaded?;
        tracing::info!("loaded {count} components in {} groups", layouts.len());
        Ok(())
    }

    /// Rebuild the document from parsed layouts. Returns the number of
    /// components created.
    fn build_layouts(&mut self, layouts: &Layouts) -> Result<usize> {
        self.destroy_all_groups()?;
        let external = &self.external;
        self.factories.retain_templates(|n| external.contains(n));
        for (name, lines) in layouts {
            self.factories.add_template(name, recipe(lines));
        }

        let mut count = 0;
        for (name, lines) in layouts {
            let root = self.insert_group(name);
            let origin = self.tree.get(root)?.rect().tl;
            let lines: Vec<&SourceLine> = lines.iter().filter(|l| !is_marker(&l.props)).collect();

            let mut seen = BTreeSet::new();
            for line in &lines {
                let n = line.props.value(keys::NAME);
                if !n.is_empty() && !seen.insert(n) {
                    return Err(Error::NameConflict(n.to_string()).at_line(line.text.as_str()));
                }
            }
            for line in lines {
                self.build_line(root, origin, &line.props, true)
                    .map_err(|e| e.at_line(line.text.as_str()))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Read a file of layouts and register each as a template, leaving the
    /// document alone.
    pub fn load_templates(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let text = fs::read_to_string(path.as_ref())?;
        self.load_templates_str(&text)
    }

    /// Register every named layout in `text` as a template. Returns the
    /// registered names. Existing instances are refreshed.
    pub fn load_templates_str(&mut self, text: &str) -> Result<Vec<String>> {
        let layouts = parse_document(text);
        let names: Vec<String> = layouts.keys().filter(|n| !n.is_empty()).cloned().collect();
        for name in &names {
            let taken = self.group(name).is_some()
                || (self.factories.contains(name) && self.factories.template(name).is_none());
            if taken {
                return Err(Error::NameConflict(name.clone()));
            }
        }
        for name in &names {
            if let Some(lines) = layouts.get(name) {
                self.factories.add_template(name, recipe(lines));
                self.external.insert(name.clone());
            }
        }
        self.regenerate_templates();
        tracing::info!("registered {} templates", names.len());
        Ok(names)
    }
}
