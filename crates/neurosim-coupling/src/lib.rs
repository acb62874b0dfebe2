// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Coupling Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Controlled phase coupling between simulated sources: kernel
//! definitions, eager validation of the coupling graph, seeded
//! traversal order, and the synthesis pass that rewrites child
//! waveforms from their parents.

pub mod graph;
pub mod kernels;
pub mod synthesis;
pub mod walk;

pub use graph::{CouplingEdge, CouplingGraph, CouplingGraphBuilder, CouplingSpec};
pub use kernels::{CouplingKernel, CouplingMethod, Harmonic};
pub use synthesis::synthesize;
pub use walk::{traversal_order, WalkStep};
