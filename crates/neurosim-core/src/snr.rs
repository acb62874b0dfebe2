// ─────────────────────────────────────────────────────────────────────
// NeuroSim — SNR Calibration
// ─────────────────────────────────────────────────────────────────────
//! Sensor-space SNR calibration. Signal amplitudes are rescaled so that
//! the ratio of projected signal variance to projected noise variance
//! hits a requested target, either per source (local) or for all signal
//! sources at once (global). Variances are measured within a frequency
//! band through a zero-phase Butterworth filter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neurosim_dsp::BandPass;
use neurosim_types::{Band, NeurosimError, NeurosimResult, Source, SourceSpaces};

use crate::estimate::SourceEstimate;
use crate::forward::ForwardModel;

/// Per-source SNR request: scale `name` so that its band-limited
/// sensor-space variance relates to the combined noise variance by
/// `snr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSnrTarget {
    pub name: String,
    pub snr: f64,
    pub band: Band,
}

/// Sensor-space variance of the estimate projected through the forward
/// model: the trace of the projected covariance divided by the sensor
/// count.
///
/// With `filter` set, rows are band-passed (order 2 Butterworth, zero
/// phase) before projection; `band` is then required.
pub fn sensor_space_variance(
    estimate: &SourceEstimate,
    fwd: &ForwardModel,
    band: Option<Band>,
    filter: bool,
) -> NeurosimResult<f64> {
    let n_rows = estimate.n_rows();
    let n_samples = estimate.n_samples();

    let filtered: Vec<f64>;
    let data: &[f64] = if filter {
        let band = band.ok_or_else(|| {
            NeurosimError::Config(
                "frequency band limits are required for the adjustment of SNR".to_string(),
            )
        })?;
        let bandpass = BandPass::design(band, estimate.sfreq())?;
        let mut out = Vec::with_capacity(n_rows * n_samples);
        for row in 0..n_rows {
            out.extend(bandpass.filtfilt(estimate.row(row))?);
        }
        filtered = out;
        &filtered
    } else {
        estimate.data()
    };

    let leadfield = fwd.restrict(&estimate.vertex_pairs())?;
    let n_sensors = fwd.n_sensors();
    let mut projected = vec![0.0; n_samples];
    let mut sum_squares = 0.0;
    for sensor in 0..n_sensors {
        projected.iter_mut().for_each(|v| *v = 0.0);
        let gain_row = &leadfield[sensor * n_rows..(sensor + 1) * n_rows];
        for (row, &g) in gain_row.iter().enumerate() {
            let series = &data[row * n_samples..(row + 1) * n_samples];
            for (p, &x) in projected.iter_mut().zip(series) {
                *p += g * x;
            }
        }
        sum_squares += projected.iter().map(|y| y * y).sum::<f64>();
    }
    Ok(sum_squares / (n_samples as f64 * n_sensors as f64))
}

/// Multiplier that brings a signal with sensor-space variance
/// `signal_var` to `target_snr` against `noise_var`.
///
/// A zero target yields a zero factor (the source is silenced), never
/// an error. Zero noise variance leaves the SNR undefined and zero
/// signal variance would require an infinite factor; both are reported
/// as errors instead of being clamped.
pub fn amplitude_adjustment_factor(
    signal_var: f64,
    noise_var: f64,
    target_snr: f64,
) -> NeurosimResult<f64> {
    if !target_snr.is_finite() || target_snr < 0.0 {
        return Err(NeurosimError::Config(format!(
            "target SNR must be finite and non-negative, got {target_snr}"
        )));
    }
    if noise_var <= 0.0 {
        return Err(NeurosimError::ZeroNoiseVariance);
    }
    let factor = (target_snr * noise_var / signal_var).sqrt();
    if !factor.is_finite() {
        return Err(NeurosimError::ZeroSignalVariance);
    }
    Ok(factor)
}

/// Adjust each targeted source against the combined noise variance,
/// rescaling waveforms in place.
///
/// The noise variance is measured within each target's own band, so
/// sources calibrated in different bands see different noise floors.
pub fn adjust_snr_local(
    sources: &mut BTreeMap<String, Source>,
    targets: &[LocalSnrTarget],
    noise_sources: &BTreeMap<String, Source>,
    spaces: &SourceSpaces,
    fwd: &ForwardModel,
    sfreq: f64,
) -> NeurosimResult<()> {
    if targets.is_empty() {
        return Ok(());
    }
    if noise_sources.is_empty() {
        return Err(NeurosimError::NoNoiseSources);
    }
    let noise_estimate = SourceEstimate::from_sources(noise_sources.values(), spaces, sfreq)?;

    for target in targets {
        let noise_var = sensor_space_variance(&noise_estimate, fwd, Some(target.band), true)?;
        let source = sources.get(&target.name).ok_or_else(|| {
            NeurosimError::Config(format!(
                "SNR target references unknown source '{}'",
                target.name
            ))
        })?;
        let estimate = SourceEstimate::from_sources([source], spaces, sfreq)?;
        let signal_var = sensor_space_variance(&estimate, fwd, Some(target.band), true)?;
        let factor = amplitude_adjustment_factor(signal_var, noise_var, target.snr)?;
        if let Some(source) = sources.get_mut(&target.name) {
            for w in source.waveform.iter_mut() {
                *w *= factor;
            }
        }
    }
    Ok(())
}

/// Adjust the combined signal power against the combined noise power,
/// applying one shared factor to every signal source.
///
/// With no signal sources the request is skipped with a warning, since
/// there is nothing to rescale.
pub fn adjust_snr_global(
    sources: &mut BTreeMap<String, Source>,
    target_snr: f64,
    band: Band,
    noise_sources: &BTreeMap<String, Source>,
    spaces: &SourceSpaces,
    fwd: &ForwardModel,
    sfreq: f64,
) -> NeurosimResult<()> {
    if sources.is_empty() {
        log::warn!("no signal sources were added, skipping the requested adjustment of global SNR");
        return Ok(());
    }
    if noise_sources.is_empty() {
        return Err(NeurosimError::NoNoiseSources);
    }
    let signal_estimate = SourceEstimate::from_sources(sources.values(), spaces, sfreq)?;
    let noise_estimate = SourceEstimate::from_sources(noise_sources.values(), spaces, sfreq)?;
    let noise_var = sensor_space_variance(&noise_estimate, fwd, Some(band), true)?;
    let signal_var = sensor_space_variance(&signal_estimate, fwd, Some(band), true)?;
    let factor = amplitude_adjustment_factor(signal_var, noise_var, target_snr)?;

    for source in sources.values_mut() {
        for w in source.waveform.iter_mut() {
            *w *= factor;
        }
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
