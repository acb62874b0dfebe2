// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Simulation Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{NeurosimError, NeurosimResult};

/// Timing grid of a simulation run.
///
/// All waveforms produced for one run share this grid: `n_samples()`
/// points spaced `1 / sfreq` seconds apart, starting at t = 0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Sampling frequency in Hz.
    /// Default: 250.0.
    pub sfreq: f64,

    /// Duration of the simulated recording in seconds.
    /// Default: 60.0.
    pub duration: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            sfreq: 250.0,
            duration: 60.0,
        }
    }
}

impl SimulationParams {
    pub fn new(sfreq: f64, duration: f64) -> Self {
        Self { sfreq, duration }
    }

    /// Validate simulation parameters.
    pub fn validate(&self) -> NeurosimResult<()> {
        if !self.sfreq.is_finite() || self.sfreq <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "sfreq must be a positive finite number, got {}",
                self.sfreq
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "duration must be a positive finite number, got {}",
                self.duration
            )));
        }
        if self.n_samples() < 2 {
            return Err(NeurosimError::Config(format!(
                "sfreq * duration must yield at least 2 samples, got {}",
                self.n_samples()
            )));
        }
        Ok(())
    }

    /// Number of samples in the run.
    pub fn n_samples(&self) -> usize {
        let exact = self.sfreq * self.duration;
        if (exact - exact.round()).abs() > 1e-9 {
            log::warn!(
                "sfreq * duration = {exact} is not an integer sample count, rounding to {}",
                exact.round()
            );
        }
        exact.round() as usize
    }

    /// Sample instants in seconds: `[0, 1/sfreq, 2/sfreq, ...]`.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_samples()).map(|i| i as f64 / self.sfreq).collect()
    }

    /// Spacing between consecutive samples in seconds.
    pub fn tstep(&self) -> f64 {
        1.0 / self.sfreq
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> NeurosimResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| NeurosimError::Config(format!("JSON parse error: {e}")))
    }
}

/// Frequency band of interest, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Lower band edge in Hz.
    pub fmin: f64,

    /// Upper band edge in Hz.
    pub fmax: f64,
}

impl Band {
    pub fn new(fmin: f64, fmax: f64) -> Self {
        Self { fmin, fmax }
    }

    /// Validate band edges. The Nyquist bound is checked separately at
    /// filter-design time, when the sampling frequency is known.
    pub fn validate(&self) -> NeurosimResult<()> {
        if !self.fmin.is_finite() || self.fmin <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "fmin must be a positive finite number, got {}",
                self.fmin
            )));
        }
        if !self.fmax.is_finite() || self.fmax <= self.fmin {
            return Err(NeurosimError::Config(format!(
                "fmax must be finite and greater than fmin = {}, got {}",
                self.fmin, self.fmax
            )));
        }
        Ok(())
    }

    /// Band with both edges multiplied by `ratio` (harmonic scaling).
    pub fn scaled(&self, ratio: f64) -> Band {
        Band {
            fmin: self.fmin * ratio,
            fmax: self.fmax * ratio,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
