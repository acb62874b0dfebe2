// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Coupling Synthesis
// ─────────────────────────────────────────────────────────────────────
//! Executes a coupling graph over simulated source waveforms. The walk
//! visits each edge once with the parent already final, so coupling
//! relations compose along the paths of the forest.

use std::collections::BTreeMap;

use neurosim_types::{NeurosimError, NeurosimResult, SeedSequence, Source};

use crate::graph::CouplingGraph;
use crate::walk::{traversal_order, WalkStep};

/// Rewrite the waveforms of coupled sources in place.
///
/// Draws one seed for the walk and one per step from `seeds`, so the
/// whole synthesis replays from a single master seed. Root sources keep
/// their waveforms untouched; every other coupled source is replaced by
/// its parent's waveform transformed through the connecting kernel.
/// With no edges declared this is a no-op that consumes no seeds.
pub fn synthesize(
    sources: &mut BTreeMap<String, Source>,
    graph: &CouplingGraph,
    sfreq: f64,
    seeds: &mut SeedSequence,
) -> NeurosimResult<()> {
    if graph.edge_count() == 0 {
        return Ok(());
    }
    let walk_seed = seeds.next_seed();
    let steps = traversal_order(graph, None, walk_seed)?;
    for step in steps {
        // A seed per step regardless of the kernel, so the stream stays
        // aligned when methods change between runs.
        let kernel_seed = seeds.next_seed();
        apply_step(sources, graph, step, sfreq, kernel_seed)?;
    }
    Ok(())
}

fn apply_step(
    sources: &mut BTreeMap<String, Source>,
    graph: &CouplingGraph,
    step: WalkStep,
    sfreq: f64,
    seed: u64,
) -> NeurosimResult<()> {
    let parent_name = graph.name(step.parent);
    let child_name = graph.name(step.child);
    let waveform = sources
        .get(parent_name)
        .ok_or_else(|| NeurosimError::UnknownSource(parent_name.to_string()))?
        .waveform
        .clone();
    let edge = &graph.edges()[step.edge];
    let coupled = edge
        .kernel
        .apply(&waveform, sfreq, seed)
        .map_err(|e| NeurosimError::CouplingExecution {
            source: parent_name.to_string(),
            target: child_name.to_string(),
            reason: e.to_string(),
        })?;
    let child = sources
        .get_mut(child_name)
        .ok_or_else(|| NeurosimError::UnknownSource(child_name.to_string()))?;
    child.waveform = coupled;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
