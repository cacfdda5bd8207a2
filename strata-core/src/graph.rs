//! Workspace-internal dependency graph and layered ordering.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::workspace::Workspace;

/// Edges from each package to the workspace members it depends on.
///
/// Only dependencies that name another member survive; external registry
/// dependencies are irrelevant to ordering.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph from a workspace, intersecting each package's
    /// declared dependencies and devDependencies with the member set.
    pub fn build(workspace: &Workspace) -> Self {
        let mut edges = IndexMap::with_capacity(workspace.packages.len());
        for (name, package) in &workspace.packages {
            let mut deps: Vec<String> = package
                .dependencies
                .iter()
                .chain(package.dev_dependencies.iter())
                .filter(|dep| workspace.packages.contains_key(dep.as_str()))
                .cloned()
                .collect();
            deps.sort();
            deps.dedup();
            edges.insert(name.clone(), deps);
        }
        Self { edges }
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Orders the packages into layers where every package's dependencies
    /// live in strictly earlier layers. Packages within a layer are
    /// independent of each other and sorted by name.
    ///
    /// Fails with `CyclicDependency` when no progress can be made, reporting
    /// the unresolved remainder.
    pub fn layers(&self) -> Result<Vec<Vec<String>>> {
        let mut remaining: IndexMap<String, Vec<String>> = self.edges.clone();
        let mut layers = Vec::new();
        while !remaining.is_empty() {
            let mut ready: Vec<String> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| name.clone())
                .collect();
            if ready.is_empty() {
                return Err(Error::CyclicDependency {
                    remainder: render_remainder(&remaining),
                });
            }
            ready.sort();
            for name in &ready {
                remaining.shift_remove(name);
            }
            for deps in remaining.values_mut() {
                deps.retain(|dep| !ready.contains(dep));
            }
            layers.push(ready);
        }
        Ok(layers)
    }
}

fn render_remainder(remaining: &IndexMap<String, Vec<String>>) -> String {
    let mut lines: Vec<String> = remaining
        .iter()
        .map(|(name, deps)| format!("  {} -> [{}]", name, deps.join(", ")))
        .collect();
    lines.sort();
    lines.join("\n")
}
