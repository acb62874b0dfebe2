// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Waveform Generators
// ─────────────────────────────────────────────────────────────────────
//! Base-activity generators behind the waveform interface of the
//! simulation session. A generator fills a (n_series, n_samples) block
//! row by row; the coupling and SNR stages rework those rows later.

use neurosim_dsp::{narrowband_oscillation, one_over_f_noise, white_noise};
use neurosim_types::{Band, NeurosimError, NeurosimResult};

/// Deterministic, seedable producer of base waveforms.
///
/// Returns a flat row-major block of shape (n_series, times.len()).
pub trait WaveformSource: Send + Sync {
    fn generate(&self, n_series: usize, times: &[f64], seed: u64) -> NeurosimResult<Vec<f64>>;
}

/// Band-limited oscillatory activity.
#[derive(Debug, Clone, Copy)]
pub struct NarrowbandSource {
    pub band: Band,
}

impl WaveformSource for NarrowbandSource {
    fn generate(&self, n_series: usize, times: &[f64], seed: u64) -> NeurosimResult<Vec<f64>> {
        narrowband_oscillation(n_series, times, self.band, seed)
    }
}

/// Power-law (1/f^slope) background activity, the default for noise
/// sources.
#[derive(Debug, Clone, Copy)]
pub struct OneOverFSource {
    pub slope: f64,
}

impl Default for OneOverFSource {
    fn default() -> Self {
        Self { slope: 1.0 }
    }
}

impl WaveformSource for OneOverFSource {
    fn generate(&self, n_series: usize, times: &[f64], seed: u64) -> NeurosimResult<Vec<f64>> {
        if !self.slope.is_finite() {
            return Err(NeurosimError::Config(format!(
                "spectral slope must be finite, got {}",
                self.slope
            )));
        }
        Ok(one_over_f_noise(n_series, times, self.slope, seed))
    }
}

/// Spectrally flat noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhiteNoiseSource;

impl WaveformSource for WhiteNoiseSource {
    fn generate(&self, n_series: usize, times: &[f64], seed: u64) -> NeurosimResult<Vec<f64>> {
        Ok(white_noise(n_series, times, seed))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_times() -> Vec<f64> {
        (0..500).map(|i| i as f64 / 250.0).collect()
    }

    #[test]
    fn test_generators_fill_the_requested_shape() {
        let times = make_times();
        let sources: Vec<Arc<dyn WaveformSource>> = vec![
            Arc::new(NarrowbandSource {
                band: Band::new(8.0, 12.0),
            }),
            Arc::new(OneOverFSource::default()),
            Arc::new(WhiteNoiseSource),
        ];
        for source in sources {
            let data = source.generate(3, &times, 11).unwrap();
            assert_eq!(data.len(), 3 * times.len());
            assert!(data.iter().all(|v| v.is_finite()));
            assert!(data.iter().any(|&v| v != 0.0));
        }
    }

    #[test]
    fn test_generators_are_deterministic() {
        let times = make_times();
        let source = NarrowbandSource {
            band: Band::new(8.0, 12.0),
        };
        assert_eq!(
            source.generate(2, &times, 5).unwrap(),
            source.generate(2, &times, 5).unwrap()
        );
        assert_ne!(
            source.generate(2, &times, 5).unwrap(),
            source.generate(2, &times, 6).unwrap()
        );
    }

    #[test]
    fn test_default_noise_slope() {
        assert_eq!(OneOverFSource::default().slope, 1.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let times = make_times();
        let bad_band = NarrowbandSource {
            band: Band::new(12.0, 8.0),
        };
        assert!(bad_band.generate(1, &times, 1).is_err());

        let bad_slope = OneOverFSource { slope: f64::NAN };
        assert!(bad_slope.generate(1, &times, 1).is_err());
    }
}
