// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Zero-Phase Band-Pass Filter
// ─────────────────────────────────────────────────────────────────────
//! Second-order Butterworth band-pass with forward-backward (zero-phase)
//! application. Designed in the analog domain (prototype poles, low-pass
//! to band-pass transform) and discretized with the bilinear transform,
//! with steady-state initial conditions so short transients do not leak
//! into the filtered waveform.

use std::f64::consts::PI;

use num_complex::Complex;

use neurosim_types::{Band, NeurosimError, NeurosimResult};

/// Poles beyond the two prototype pairs never arise for order 2, so the
/// transfer function is fixed at length 5 (degree 4).
const NTAPS: usize = 5;
const NSTATE: usize = NTAPS - 1;

/// Edge padding used by [`BandPass::filtfilt`], three filter lengths.
pub const PAD_LEN: usize = 3 * NTAPS;

/// Second-order Butterworth band-pass filter in transfer-function form.
#[derive(Debug, Clone)]
pub struct BandPass {
    b: [f64; NTAPS],
    a: [f64; NTAPS],
}

impl BandPass {
    /// Design the filter for `band` at sampling frequency `sfreq`.
    ///
    /// Fails if the band is empty, non-positive, or does not fit below
    /// the Nyquist frequency.
    pub fn design(band: Band, sfreq: f64) -> NeurosimResult<Self> {
        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(NeurosimError::Config(format!(
                "sfreq must be a positive finite number, got {sfreq}"
            )));
        }
        band.validate()?;
        let nyquist = sfreq / 2.0;
        if band.fmax >= nyquist {
            return Err(NeurosimError::Config(format!(
                "band [{}, {}] Hz must lie below the Nyquist frequency {} Hz",
                band.fmin, band.fmax, nyquist
            )));
        }

        // Pre-warp the digital edges onto the analog axis. The factor 4
        // pairs with the bilinear constant below.
        let w1 = 4.0 * (PI * band.fmin / sfreq).tan();
        let w2 = 4.0 * (PI * band.fmax / sfreq).tan();
        let bw = w2 - w1;
        let wo = (w1 * w2).sqrt();

        // Order-2 Butterworth prototype poles on the unit circle.
        let prototype = [
            Complex::from_polar(1.0, 3.0 * PI / 4.0),
            Complex::from_polar(1.0, 5.0 * PI / 4.0),
        ];

        // Low-pass to band-pass: each prototype pole splits into two.
        let mut analog_poles = [Complex::new(0.0, 0.0); 4];
        for (i, &p) in prototype.iter().enumerate() {
            let plp = p * (bw / 2.0);
            let disc = (plp * plp - Complex::new(wo * wo, 0.0)).sqrt();
            analog_poles[2 * i] = plp + disc;
            analog_poles[2 * i + 1] = plp - disc;
        }

        // Bilinear transform z = (fs2 + s) / (fs2 - s).
        let fs2 = Complex::new(4.0, 0.0);
        let mut digital_poles = [Complex::new(0.0, 0.0); 4];
        let mut denom = Complex::new(1.0, 0.0);
        for (zp, &sp) in digital_poles.iter_mut().zip(analog_poles.iter()) {
            *zp = (fs2 + sp) / (fs2 - sp);
            denom *= fs2 - sp;
        }
        // Two analog zeros at s = 0 map to z = 1; the two excess poles
        // contribute zeros at z = -1. Gain follows the pole product.
        let k = bw * bw * (fs2 * fs2 / denom).re;

        let b = [k, 0.0, -2.0 * k, 0.0, k];
        let acoef = real_poly(&digital_poles);
        let a = [acoef[0], acoef[1], acoef[2], acoef[3], acoef[4]];

        if !b.iter().chain(a.iter()).all(|v| v.is_finite()) {
            return Err(NeurosimError::Numerical(format!(
                "filter design produced non-finite coefficients for band [{}, {}] Hz at sfreq {} Hz",
                band.fmin, band.fmax, sfreq
            )));
        }
        Ok(Self { b, a })
    }

    /// Transfer-function coefficients (numerator, denominator).
    pub fn coefficients(&self) -> (&[f64; NTAPS], &[f64; NTAPS]) {
        (&self.b, &self.a)
    }

    /// Single-pass magnitude response at `freq` Hz.
    pub fn response_at(&self, freq: f64, sfreq: f64) -> f64 {
        let w = 2.0 * PI * freq / sfreq;
        let mut num = Complex::new(0.0, 0.0);
        let mut den = Complex::new(0.0, 0.0);
        for k in 0..NTAPS {
            let e = Complex::from_polar(1.0, -w * k as f64);
            num += self.b[k] * e;
            den += self.a[k] * e;
        }
        (num / den).norm()
    }

    /// Forward-backward filtering with odd edge extension.
    ///
    /// The result has zero phase distortion and the squared magnitude
    /// response of the single-pass filter. Requires more than
    /// [`PAD_LEN`] samples.
    pub fn filtfilt(&self, x: &[f64]) -> NeurosimResult<Vec<f64>> {
        let n = x.len();
        if n <= PAD_LEN {
            return Err(NeurosimError::Config(format!(
                "filtfilt needs more than {PAD_LEN} samples, got {n}"
            )));
        }

        // Odd extension on both edges damps startup transients.
        let mut ext = Vec::with_capacity(n + 2 * PAD_LEN);
        for i in (1..=PAD_LEN).rev() {
            ext.push(2.0 * x[0] - x[i]);
        }
        ext.extend_from_slice(x);
        for i in 1..=PAD_LEN {
            ext.push(2.0 * x[n - 1] - x[n - 1 - i]);
        }

        let zi = lfilter_zi(&self.b, &self.a)?;

        let mut z0 = zi;
        for z in z0.iter_mut() {
            *z *= ext[0];
        }
        let forward = lfilter(&self.b, &self.a, &ext, &z0);

        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let mut z1 = zi;
        for z in z1.iter_mut() {
            *z *= reversed[0];
        }
        let backward = lfilter(&self.b, &self.a, &reversed, &z1);

        reversed.clear();
        reversed.extend(backward.into_iter().rev());
        Ok(reversed[PAD_LEN..PAD_LEN + n].to_vec())
    }
}

/// Real coefficients of the monic polynomial with the given roots.
/// Roots come in conjugate pairs, so imaginary residue is discarded.
fn real_poly(roots: &[Complex<f64>; 4]) -> [f64; 5] {
    let mut c = vec![Complex::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex::new(0.0, 0.0); c.len() + 1];
        for (i, &ci) in c.iter().enumerate() {
            next[i] += ci;
            next[i + 1] -= r * ci;
        }
        c = next;
    }
    let mut out = [0.0; 5];
    for (o, v) in out.iter_mut().zip(c.iter()) {
        *o = v.re;
    }
    out
}

/// Direct-form II transposed filter with initial state `zi`.
fn lfilter(b: &[f64; NTAPS], a: &[f64; NTAPS], x: &[f64], zi: &[f64; NSTATE]) -> Vec<f64> {
    let mut z = *zi;
    let mut y = Vec::with_capacity(x.len());
    for &xv in x {
        let yv = b[0] * xv + z[0];
        z[0] = b[1] * xv + z[1] - a[1] * yv;
        z[1] = b[2] * xv + z[2] - a[2] * yv;
        z[2] = b[3] * xv + z[3] - a[3] * yv;
        z[3] = b[4] * xv - a[4] * yv;
        y.push(yv);
    }
    y
}

/// Steady-state initial filter state for a unit-amplitude input.
///
/// With this state, a constant input produces the constant steady-state
/// output from the very first sample, which is what keeps the
/// forward-backward pass free of startup transients.
fn lfilter_zi(b: &[f64; NTAPS], a: &[f64; NTAPS]) -> NeurosimResult<[f64; NSTATE]> {
    let mut m = [[0.0; NSTATE]; NSTATE];
    let mut rhs = [0.0; NSTATE];
    for i in 0..NSTATE {
        m[i][0] = a[i + 1] + if i == 0 { 1.0 } else { 0.0 };
        for j in 1..NSTATE {
            m[i][j] = if i == j { 1.0 } else { 0.0 } - if i == j - 1 { 1.0 } else { 0.0 };
        }
        rhs[i] = b[i + 1] - a[i + 1] * b[0];
    }
    solve4(&mut m, &mut rhs)?;
    Ok(rhs)
}

/// In-place Gaussian elimination with partial pivoting for the 4x4
/// steady-state system.
fn solve4(m: &mut [[f64; NSTATE]; NSTATE], rhs: &mut [f64; NSTATE]) -> NeurosimResult<()> {
    for col in 0..NSTATE {
        let mut pivot = col;
        for row in col + 1..NSTATE {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col].abs() < 1e-300 {
            return Err(NeurosimError::Numerical(
                "singular steady-state system in filter initialization".to_string(),
            ));
        }
        if pivot != col {
            m.swap(pivot, col);
            rhs.swap(pivot, col);
        }
        for row in col + 1..NSTATE {
            let factor = m[row][col] / m[col][col];
            for k in col..NSTATE {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    for col in (0..NSTATE).rev() {
        let mut acc = rhs[col];
        for k in col + 1..NSTATE {
            acc -= m[col][k] * rhs[k];
        }
        rhs[col] = acc / m[col][col];
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
