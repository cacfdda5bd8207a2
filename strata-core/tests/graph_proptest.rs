use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use proptest::prelude::*;

use strata_core::graph::DependencyGraph;
use strata_core::package::Package;
use strata_core::workspace::Workspace;
use strata_core::Error;

fn workspace_from_deps(deps_by_index: &[Vec<usize>]) -> Workspace {
    let name = |i: usize| format!("pkg-{}", i);
    let mut packages = IndexMap::new();
    for (i, deps) in deps_by_index.iter().enumerate() {
        let pkg = Package::new(
            name(i),
            PathBuf::from(format!("/ws/pkg-{}", i)),
            HashMap::new(),
            deps.iter().map(|d| name(*d)).collect(),
            vec![],
        );
        packages.insert(name(i), pkg);
    }
    Workspace {
        root_dir: PathBuf::from("/ws"),
        packages,
    }
}

/// Each package may only depend on lower-numbered packages, so the graph is
/// acyclic by construction.
fn gen_acyclic_deps() -> impl Strategy<Value = Vec<Vec<usize>>> {
    proptest::collection::vec(any::<u8>(), 1..=6).prop_map(|masks| {
        masks
            .iter()
            .enumerate()
            .map(|(i, mask)| (0..i).filter(|j| mask >> j & 1 == 1).collect())
            .collect()
    })
}

proptest! {
    #[test]
    fn test_layers_partition_the_packages(deps in gen_acyclic_deps()) {
        let workspace = workspace_from_deps(&deps);
        let graph = DependencyGraph::build(&workspace);
        let layers = graph.layers().unwrap();

        let mut seen = std::collections::HashSet::new();
        for name in layers.iter().flatten() {
            prop_assert!(seen.insert(name.clone()), "duplicate package {} in layers", name);
        }
        prop_assert_eq!(seen.len(), workspace.packages.len());
    }

    #[test]
    fn test_dependencies_land_in_earlier_layers(deps in gen_acyclic_deps()) {
        let workspace = workspace_from_deps(&deps);
        let graph = DependencyGraph::build(&workspace);
        let layers = graph.layers().unwrap();

        let mut layer_of = HashMap::new();
        for (index, layer) in layers.iter().enumerate() {
            for name in layer {
                layer_of.insert(name.clone(), index);
            }
        }
        for name in workspace.packages.keys() {
            for dep in graph.dependencies_of(name) {
                prop_assert!(
                    layer_of[dep] < layer_of[name],
                    "{} (layer {}) depends on {} (layer {})",
                    name, layer_of[name], dep, layer_of[dep]
                );
            }
        }
    }

    #[test]
    fn test_rings_always_report_a_cycle(n in 2usize..=6) {
        let deps: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + 1) % n]).collect();
        let workspace = workspace_from_deps(&deps);
        let graph = DependencyGraph::build(&workspace);
        match graph.layers() {
            Err(Error::CyclicDependency { remainder }) => {
                for i in 0..n {
                    prop_assert!(remainder.contains(&format!("pkg-{}", i)), "expected remainder to contain pkg-{}", i);
                }
            }
            other => prop_assert!(false, "expected CyclicDependency, got {:?}", other),
        }
    }
}
