// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Simulation Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Simulation core for the NeuroSim source engine: source placement,
//! waveform generation, the declarative simulation session, and
//! sensor-space SNR calibration through a forward model.
//!
//! # Simulation Invariants
//!
//! 1. **One seed replays one run**: every randomized stage draws its
//!    child seed from the master `SeedSequence` in a fixed order —
//!    noise groups first, then signal groups (locations before
//!    waveforms within each group), then the coupling walk, then one
//!    seed per coupling step. Identical declarations and an identical
//!    seed reproduce the run bit for bit.
//!
//! 2. **Noise draws precede signal draws**: adding or editing signal
//!    groups never shifts the noise realization of a given seed, so a
//!    study can vary its signals against a frozen noise background.
//!
//! 3. **Coupling rewrites children only**: each tree of the coupling
//!    forest keeps exactly one waveform untouched (the traversal root);
//!    every other coupled source is replaced by its parent's waveform
//!    transformed through the connecting kernel.
//!
//! 4. **Calibration rescales, never reshapes**: SNR adjustment
//!    multiplies waveforms by per-source (local) or shared (global)
//!    scalars. Phase relations established by coupling survive the
//!    calibration unchanged.

pub mod estimate;
pub mod forward;
pub mod generators;
pub mod location;
pub mod session;
pub mod snr;

pub use estimate::SourceEstimate;
pub use forward::ForwardModel;
pub use generators::{NarrowbandSource, OneOverFSource, WaveformSource, WhiteNoiseSource};
pub use location::{select_random, LocationSampler, RandomLocations};
pub use session::{
    LocationSpec, SourceConfiguration, SourceOptions, SourceSimulator, WaveformSpec,
};
pub use snr::{
    adjust_snr_global, adjust_snr_local, amplitude_adjustment_factor, sensor_space_variance,
    LocalSnrTarget,
};
