// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Waveform Generators
// ─────────────────────────────────────────────────────────────────────
//! Stock source activity: white noise, 1/f noise and band-limited
//! oscillations. Generators return `n_series` rows of `times.len()`
//! samples in one flat row-major buffer, each row normalized to unit
//! total power so different sources start from comparable amplitudes.

use num_complex::Complex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rustfft::FftPlanner;

use neurosim_types::{Band, NeurosimError, NeurosimResult};

use crate::filter::BandPass;

/// Sampling frequency implied by a uniform time grid.
///
/// Requires at least two samples with uniform positive spacing.
pub fn sampling_frequency(times: &[f64]) -> NeurosimResult<f64> {
    if times.len() < 2 {
        return Err(NeurosimError::Config(format!(
            "at least 2 time points are required to infer the sampling frequency, got {}",
            times.len()
        )));
    }
    let tstep = times[1] - times[0];
    if !(tstep.is_finite() && tstep > 0.0) {
        return Err(NeurosimError::Config(format!(
            "time points must be strictly increasing, got step {tstep}"
        )));
    }
    for (i, w) in times.windows(2).enumerate() {
        if ((w[1] - w[0]) - tstep).abs() > 1e-9 * tstep.max(1.0) {
            return Err(NeurosimError::Config(format!(
                "time points must be uniformly spaced, step at index {i} is {}",
                w[1] - w[0]
            )));
        }
    }
    Ok(1.0 / tstep)
}

/// Scale each row of `data` to unit total power (L2 norm 1).
/// Rows of all zeros are left untouched.
pub fn normalize_power(data: &mut [f64], n_samples: usize) {
    if n_samples == 0 {
        return;
    }
    for row in data.chunks_exact_mut(n_samples) {
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in row.iter_mut() {
                *v /= norm;
            }
        }
    }
}

/// Scale a waveform in place to unit variance (mean square 1).
/// A zero waveform is left untouched.
pub fn normalize_variance(x: &mut [f64]) {
    if x.is_empty() {
        return;
    }
    let rms = (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt();
    if rms > 0.0 {
        for v in x.iter_mut() {
            *v /= rms;
        }
    }
}

/// Gaussian white noise, one row per series.
pub fn white_noise(n_series: usize, times: &[f64], seed: u64) -> Vec<f64> {
    let n = times.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data: Vec<f64> = (0..n_series * n)
        .map(|_| StandardNormal.sample(&mut rng))
        .collect();
    normalize_power(&mut data, n);
    data
}

/// Aperiodic background activity with a 1/f^slope power spectrum.
///
/// White noise is shaped in the frequency domain; the DC component is
/// removed. `slope = 1` gives pink noise.
pub fn one_over_f_noise(n_series: usize, times: &[f64], slope: f64, seed: u64) -> Vec<f64> {
    let n = times.len();
    if n == 0 || n_series == 0 {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut data = Vec::with_capacity(n_series * n);
    let mut buf: Vec<Complex<f64>> = Vec::with_capacity(n);
    for _ in 0..n_series {
        buf.clear();
        buf.extend((0..n).map(|_| {
            let v: f64 = StandardNormal.sample(&mut rng);
            Complex::new(v, 0.0)
        }));
        fft.process(&mut buf);

        // Spectral shaping: amplitude ~ f^(-slope/2), so power follows
        // 1/f^slope. The absolute frequency scale cancels under the
        // final normalization, so bin indices stand in for Hz.
        buf[0] = Complex::new(0.0, 0.0);
        for (k, v) in buf.iter_mut().enumerate().skip(1) {
            let f_bin = k.min(n - k) as f64;
            *v *= f_bin.powf(-slope / 2.0);
        }

        ifft.process(&mut buf);
        let scale = 1.0 / n as f64;
        data.extend(buf.iter().map(|v| v.re * scale));
    }
    normalize_power(&mut data, n);
    data
}

/// Band-limited oscillatory activity: white noise filtered to `band`
/// with a zero-phase Butterworth band-pass.
pub fn narrowband_oscillation(
    n_series: usize,
    times: &[f64],
    band: Band,
    seed: u64,
) -> NeurosimResult<Vec<f64>> {
    let n = times.len();
    let sfreq = sampling_frequency(times)?;
    let filter = BandPass::design(band, sfreq)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(n_series * n);
    for _ in 0..n_series {
        let row: Vec<f64> = (0..n).map(|_| StandardNormal.sample(&mut rng)).collect();
        data.extend(filter.filtfilt(&row)?);
    }
    normalize_power(&mut data, n);
    Ok(data)
}

// ── Tests ────────────────────────────────────────────────────────────
