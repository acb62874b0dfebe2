// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Analytic Signal
// ─────────────────────────────────────────────────────────────────────
//! Hilbert analytic signal via FFT: the real input becomes the real
//! part, its Hilbert transform the imaginary part. Envelope and
//! instantaneous phase fall out as magnitude and argument.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Analytic signal of a real waveform.
///
/// Computed by zeroing the negative-frequency half of the spectrum and
/// doubling the positive half, keeping DC (and Nyquist, for even
/// lengths) at unit weight.
pub fn analytic_signal(x: &[f64]) -> Vec<Complex<f64>> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buf);

    // One-sided spectrum weights: DC stays, positive frequencies double,
    // negative frequencies vanish. Nyquist (even n) stays single.
    let half = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    for v in buf.iter_mut().take(half).skip(1) {
        *v *= 2.0;
    }
    let zero_from = if n % 2 == 0 { n / 2 + 1 } else { half };
    for v in buf.iter_mut().skip(zero_from) {
        *v = Complex::new(0.0, 0.0);
    }

    planner.plan_fft_inverse(n).process(&mut buf);
    let scale = 1.0 / n as f64;
    for v in buf.iter_mut() {
        *v *= scale;
    }
    buf
}

/// Instantaneous amplitude envelope, |analytic_signal(x)|.
pub fn envelope(x: &[f64]) -> Vec<f64> {
    analytic_signal(x).iter().map(|c| c.norm()).collect()
}

/// Instantaneous phase in radians, arg(analytic_signal(x)).
pub fn instantaneous_phase(x: &[f64]) -> Vec<f64> {
    analytic_signal(x).iter().map(|c| c.arg()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────
