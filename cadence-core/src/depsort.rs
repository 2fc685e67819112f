//! Topological sort for the Reconciliation phase (spec §4.J).
//!
//! Kahn's algorithm, grounded on the teacher's subgraph scheduling pass
//! over its `SystemId` dependency graph
//! (`examples/0x112233-legion/src/schedule`-adjacent sort in
//! `other_examples/69bc40e8_viandoxdev-sg_ecs-src-scheduler.rs`). On cycle
//! detection, returns the cycle membership rather than panicking — the
//! Reconciliation phase is documented to report and skip rather than
//! propagate a fatal error (spec §4.J, §7).

use crate::error::CycleError;
use fxhash::{FxHashMap, FxHashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Order `nodes` so that every edge `(from, to)` in `edges` (read "from
/// depends on to": `to` must precede `from`) is satisfied. Returns the
/// membership of any cycle found rather than a partial order.
pub fn sort<N: Eq + Hash + Clone + Debug>(
    nodes: &[N],
    edges: &[(N, N)],
) -> Result<Vec<N>, CycleError<N>> {
    // dependents[to] = the set of nodes that depend on `to`.
    let mut dependents: FxHashMap<N, Vec<N>> = FxHashMap::default();
    let mut in_degree: FxHashMap<N, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();

    for (from, to) in edges {
        dependents.entry(to.clone()).or_default().push(from.clone());
        *in_degree.entry(from.clone()).or_insert(0) += 1;
        in_degree.entry(to.clone()).or_insert(0);
    }

    let mut ready: Vec<N> = nodes
        .iter()
        .filter(|n| in_degree.get(*n).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut remaining = in_degree.clone();

    while let Some(node) = ready.pop() {
        ordered.push(node.clone());
        if let Some(deps) = dependents.get(&node) {
            for dependent in deps {
                if let Some(degree) = remaining.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(dependent.clone());
                    }
                }
            }
        }
    }

    if ordered.len() == nodes.len() {
        Ok(ordered)
    } else {
        let ordered_set: FxHashSet<&N> = ordered.iter().collect();
        let cycle = nodes
            .iter()
            .filter(|n| !ordered_set.contains(n))
            .cloned()
            .collect();
        Err(CycleError { cycle })
    }
}
