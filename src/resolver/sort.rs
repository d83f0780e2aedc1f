//! Activation ordering for the resolved graph
//!
//! Produces a topological order with leaves first, so a dependency's code is
//! always activated before any of its dependents'. Ties are broken by
//! coordinate lexical order, which makes the output deterministic for any
//! given graph.
//!
//! The resolver already rejects cycles during traversal; the check here is a
//! defensive invariant, not a recovery path.

use std::collections::{BTreeSet, HashMap};

use crate::domain::Coordinate;
use crate::error::{JumpstartError, Result};
use crate::resolver::ResolvedGraph;

/// Compute the activation order for `graph`: every node's children precede
/// it, and among simultaneously ready nodes the lexically smallest
/// coordinate goes first.
pub fn activation_order(graph: &ResolvedGraph) -> Result<Vec<Coordinate>> {
    // Pending dependency count per node, and reverse adjacency (child ->
    // dependents) for decrementing once a child activates
    let mut pending: HashMap<&Coordinate, usize> = HashMap::new();
    let mut dependents: HashMap<&Coordinate, Vec<&Coordinate>> = HashMap::new();

    for (coordinate, node) in &graph.nodes {
        pending.entry(coordinate).or_insert(0);
        for child in &node.children {
            *pending.entry(coordinate).or_insert(0) += 1;
            dependents.entry(child).or_default().push(coordinate);
        }
    }

    // BTreeSet pops the lexically smallest ready coordinate first
    let mut ready: BTreeSet<&Coordinate> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(coordinate, _)| *coordinate)
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next.clone());
        for dependent in dependents.get(next).into_iter().flatten() {
            let count = pending
                .get_mut(dependent)
                .ok_or_else(|| JumpstartError::DependencyCycle {
                    path: format!("edge into unknown node {dependent}"),
                })?;
            *count -= 1;
            if *count == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != graph.nodes.len() {
        let stuck: Vec<String> = graph
            .nodes
            .keys()
            .filter(|c| !order.contains(c))
            .map(ToString::to_string)
            .collect();
        return Err(JumpstartError::DependencyCycle {
            path: stuck.join(" -> "),
        });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ResolvedNode, SelectionReason};
    use std::collections::BTreeMap;

    fn coord(s: &str) -> Coordinate {
        Coordinate::parse(s).unwrap()
    }

    fn graph_from(edges: &[(&str, &[&str])]) -> ResolvedGraph {
        let mut nodes = BTreeMap::new();
        for (name, children) in edges {
            let coordinate = coord(name);
            nodes.insert(
                coordinate.clone(),
                ResolvedNode {
                    coordinate,
                    children: children.iter().map(|c| coord(c)).collect(),
                    depth: 0,
                    selected_by: SelectionReason::Nearest { depth: 0 },
                },
            );
        }
        ResolvedGraph {
            roots: vec![],
            nodes,
        }
    }

    #[test]
    fn test_chain_loads_leaves_first() {
        // A depends on B depends on C: C activates before B before A
        let graph = graph_from(&[
            ("g:a:1.0", &["g:b:1.0"][..]),
            ("g:b:1.0", &["g:c:1.0"][..]),
            ("g:c:1.0", &[][..]),
        ]);
        let order = activation_order(&graph).unwrap();
        let rendered: Vec<String> = order.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["g:c:1.0", "g:b:1.0", "g:a:1.0"]);
    }

    #[test]
    fn test_independent_nodes_order_lexically() {
        let graph = graph_from(&[
            ("g:zeta:1.0", &[][..]),
            ("g:alpha:1.0", &[][..]),
            ("g:mid:1.0", &[][..]),
        ]);
        let order = activation_order(&graph).unwrap();
        let rendered: Vec<String> = order.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["g:alpha:1.0", "g:mid:1.0", "g:zeta:1.0"]);
    }

    #[test]
    fn test_diamond_dependencies() {
        let graph = graph_from(&[
            ("g:top:1.0", &["g:left:1.0", "g:right:1.0"][..]),
            ("g:left:1.0", &["g:base:1.0"][..]),
            ("g:right:1.0", &["g:base:1.0"][..]),
            ("g:base:1.0", &[][..]),
        ]);
        let order = activation_order(&graph).unwrap();
        let index = |name: &str| order.iter().position(|c| c == &coord(name)).unwrap();

        assert_eq!(index("g:base:1.0"), 0);
        assert!(index("g:left:1.0") < index("g:top:1.0"));
        assert!(index("g:right:1.0") < index("g:top:1.0"));
        // Lexical tie between left and right once base is done
        assert!(index("g:left:1.0") < index("g:right:1.0"));
    }

    #[test]
    fn test_defensive_cycle_detection() {
        let graph = graph_from(&[
            ("g:a:1.0", &["g:b:1.0"][..]),
            ("g:b:1.0", &["g:a:1.0"][..]),
        ]);
        let result = activation_order(&graph);
        assert!(matches!(
            result,
            Err(JumpstartError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_empty_graph() {
        let graph = graph_from(&[]);
        assert!(activation_order(&graph).unwrap().is_empty());
    }
}
