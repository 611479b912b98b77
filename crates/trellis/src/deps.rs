//! Template containment graph.
//!
//! Each template depends on the factories its recipe names. The graph answers
//! two questions: would an edit make a template contain itself, and in what
//! order must templates be refreshed so that inner ones come first.

use std::collections::{BTreeMap, BTreeSet};

use crate::factory::FactoryRegistry;

/// Edges from each template to the factory names in its recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Template name to referenced factory names.
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Construct an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph over every template in a factory registry.
    pub fn from_factories(factories: &FactoryRegistry) -> Self {
        let mut g = Self::new();
        for name in factories.templates() {
            if let Some(t) = factories.template(&name) {
                g.insert(&name, t.references());
            }
        }
        g
    }

    /// Add or replace a template's edges.
    pub fn insert(&mut self, template: &str, deps: BTreeSet<String>) {
        self.edges.insert(template.to_string(), deps);
    }

    /// The factories a template refers to.
    pub fn dependencies(&self, template: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(template)
    }

    /// Is `b` reachable from `a`? Every name reaches itself.
    pub fn has_dependency(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let mut visited = BTreeSet::new();
        let mut stack = vec![a];
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            let Some(deps) = self.edges.get(n) else {
                continue;
            };
            for d in deps {
                if d == b {
                    return true;
                }
                stack.push(d);
            }
        }
        false
    }

    /// Templates ordered so that every template follows the templates it
    /// contains. Ties are broken by name. Templates caught in a cycle cannot
    /// be ordered and are appended by name.
    pub fn order(&self) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (t, deps) in &self.edges {
            let entry = in_degree.entry(t.as_str()).or_insert(0);
            for d in deps.iter().filter(|d| self.edges.contains_key(*d)) {
                *entry += 1;
                dependents.entry(d.as_str()).or_default().push(t.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(t, _)| *t)
            .collect();
        let mut out = Vec::with_capacity(self.edges.len());
        while let Some(t) = ready.pop_first() {
            out.push(t.to_string());
            for d in dependents.get(t).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(d) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(*d);
                    }
                }
            }
        }

        if out.len() < self.edges.len() {
            let cyclic: Vec<String> = in_degree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(t, _)| t.to_string())
                .collect();
            tracing::warn!("template cycle among: {}", cyclic.join(", "));
            out.extend(cyclic);
        }
        out
    }
}
