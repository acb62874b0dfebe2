// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Signal Processing
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Signal-processing primitives shared by the coupling and SNR layers:
//! analytic signals, zero-phase band-pass filtering, circular statistics
//! and waveform generators.

pub mod analytic;
pub mod circular;
pub mod filter;
pub mod waveform;

pub use analytic::{analytic_signal, envelope, instantaneous_phase};
pub use circular::{mean_phase_difference, phase_locking_value, von_mises_plv, wrap_angle};
pub use filter::BandPass;
pub use waveform::{
    narrowband_oscillation, normalize_variance, one_over_f_noise, sampling_frequency,
    white_noise,
};
