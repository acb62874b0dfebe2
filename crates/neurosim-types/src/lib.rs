// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Source Engine Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! NeuroSim source engine — simulated M/EEG source activity with
//! controlled coupling and SNR.

pub mod config;
pub mod error;
pub mod seed;
pub mod source;

pub use config::{Band, SimulationParams};
pub use error::{NeurosimError, NeurosimResult};
pub use seed::SeedSequence;
pub use source::{Location, Source, SourceSpaces};
