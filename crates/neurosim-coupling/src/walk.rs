// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Coupling Walk
// ─────────────────────────────────────────────────────────────────────
//! Deterministic traversal order over a coupling forest. Each edge is
//! visited exactly once, parent before child, so kernels always read
//! an already-final parent waveform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use neurosim_types::NeurosimResult;
use serde::{Deserialize, Serialize};

use crate::graph::CouplingGraph;

/// One directed step of the walk: apply `edge`'s kernel to the
/// waveform of `parent` and store the result in `child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStep {
    pub parent: usize,
    pub child: usize,
    pub edge: usize,
}

/// Order the edges of `graph` for execution.
///
/// The graph must be a forest. Within each connected component a root
/// is picked (the explicit `start` node for its own component, a
/// seeded random member otherwise) and the component is walked depth
/// first from there. Components are processed in ascending order of
/// their smallest node id, neighbors in ascending id order, so the
/// result depends only on the graph, `start` and `seed`.
pub fn traversal_order(
    graph: &CouplingGraph,
    start: Option<usize>,
    seed: u64,
) -> NeurosimResult<Vec<WalkStep>> {
    graph.validate_forest()?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut visited = vec![false; graph.node_count()];
    let mut steps = Vec::with_capacity(graph.edge_count());

    for component in graph.components() {
        let root = match start {
            Some(s) if component.contains(&s) => s,
            _ => component[rng.gen_range(0..component.len())],
        };

        // Entries are (parent, node, edge); the root carries no edge.
        let mut stack = vec![(usize::MAX, root, usize::MAX)];
        while let Some((parent, node, edge)) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            if parent != usize::MAX {
                steps.push(WalkStep {
                    parent,
                    child: node,
                    edge,
                });
            }
            // Reverse push so the smallest neighbor is expanded first.
            for &(nb, e) in graph.adjacency(node).iter().rev() {
                if !visited[nb] {
                    stack.push((node, nb, e));
                }
            }
        }
    }
    Ok(steps)
}

// ── Tests ────────────────────────────────────────────────────────────
