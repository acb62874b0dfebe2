// ─────────────────────────────────────────────────────────────────────
// NeuroSim — Circular Statistics
// ─────────────────────────────────────────────────────────────────────
//! Angle wrapping, phase-locking measures, modified Bessel functions
//! and a von Mises sampler. Everything phase-valued in the engine goes
//! through here so wrapping conventions stay in one place.

use std::f64::consts::PI;

use rand::Rng;

/// Wrap an angle into (-PI, PI].
#[inline]
pub fn wrap_angle(x: f64) -> f64 {
    let mut w = x % (2.0 * PI);
    if w <= -PI {
        w += 2.0 * PI;
    } else if w > PI {
        w -= 2.0 * PI;
    }
    w
}

/// Phase-locking value between two phase time courses.
///
/// Magnitude of the mean resultant of the phase differences: 1.0 for a
/// constant lag, near 0 for independent phases.
pub fn phase_locking_value(phase_a: &[f64], phase_b: &[f64]) -> f64 {
    let mut cos_sum = 0.0;
    let mut sin_sum = 0.0;
    let mut n = 0usize;
    for (&pa, &pb) in phase_a.iter().zip(phase_b.iter()) {
        let d = pa - pb;
        cos_sum += d.cos();
        sin_sum += d.sin();
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    ((cos_sum / nf).powi(2) + (sin_sum / nf).powi(2)).sqrt()
}

/// Circular mean of the phase differences `phase_a - phase_b`, in
/// (-PI, PI]. Zero when the inputs are empty.
pub fn mean_phase_difference(phase_a: &[f64], phase_b: &[f64]) -> f64 {
    let mut cos_sum = 0.0;
    let mut sin_sum = 0.0;
    for (&pa, &pb) in phase_a.iter().zip(phase_b.iter()) {
        let d = pa - pb;
        cos_sum += d.cos();
        sin_sum += d.sin();
    }
    if cos_sum == 0.0 && sin_sum == 0.0 {
        return 0.0;
    }
    sin_sum.atan2(cos_sum)
}

/// Modified Bessel function of the first kind, order 0.
///
/// Polynomial approximations, accurate to ~1e-7 relative.
pub fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        1.0 + t
            * (3.515_622_9
                + t * (3.089_942_4
                    + t * (1.206_749_2
                        + t * (0.265_973_2 + t * (0.036_076_8 + t * 0.004_581_3)))))
    } else {
        let t = 3.75 / ax;
        (ax.exp() / ax.sqrt()) * bessel_i0_scaled_tail(t)
    }
}

/// Modified Bessel function of the first kind, order 1.
pub fn bessel_i1(x: f64) -> f64 {
    let ax = x.abs();
    let value = if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        ax * (0.5
            + t * (0.878_905_94
                + t * (0.514_988_69
                    + t * (0.150_849_34
                        + t * (0.026_587_33 + t * (0.003_015_32 + t * 0.000_324_11))))))
    } else {
        let t = 3.75 / ax;
        (ax.exp() / ax.sqrt()) * bessel_i1_scaled_tail(t)
    };
    if x < 0.0 {
        -value
    } else {
        value
    }
}

#[inline]
fn bessel_i0_scaled_tail(t: f64) -> f64 {
    0.398_942_28
        + t * (0.013_285_92
            + t * (0.002_253_19
                + t * (-0.001_575_65
                    + t * (0.009_162_81
                        + t * (-0.020_577_06
                            + t * (0.026_355_37 + t * (-0.016_476_33 + t * 0.003_923_77)))))))
}

#[inline]
fn bessel_i1_scaled_tail(t: f64) -> f64 {
    0.398_942_28
        + t * (-0.039_880_24
            + t * (-0.003_620_18
                + t * (0.001_638_01
                    + t * (-0.010_315_55
                        + t * (0.022_829_67
                            + t * (-0.028_953_12 + t * (0.017_876_54 - t * 0.004_200_59)))))))
}

/// Theoretical phase-locking value of von Mises phase coupling with
/// concentration `kappa`: I1(kappa) / I0(kappa).
///
/// The large-argument branch works on exponentially scaled tails so the
/// ratio stays finite for any concentration.
pub fn von_mises_plv(kappa: f64) -> f64 {
    if kappa <= 0.0 {
        return 0.0;
    }
    if kappa < 3.75 {
        bessel_i1(kappa) / bessel_i0(kappa)
    } else {
        let t = 3.75 / kappa;
        bessel_i1_scaled_tail(t) / bessel_i0_scaled_tail(t)
    }
}

/// Draw one angle from a von Mises distribution centred at `mu` with
/// concentration `kappa`, using Best & Fisher rejection sampling.
///
/// `kappa` near zero degenerates to the uniform distribution on the
/// circle.
pub fn draw_von_mises<R: Rng>(rng: &mut R, mu: f64, kappa: f64) -> f64 {
    if kappa < 1e-8 {
        return wrap_angle(mu + PI * (2.0 * rng.gen::<f64>() - 1.0));
    }

    let tau = 1.0 + (1.0 + 4.0 * kappa * kappa).sqrt();
    let rho = (tau - (2.0 * tau).sqrt()) / (2.0 * kappa);
    let r = (1.0 + rho * rho) / (2.0 * rho);

    let f = loop {
        let u1: f64 = rng.gen();
        let z = (PI * u1).cos();
        let f = (1.0 + r * z) / (r + z);
        let c = kappa * (r - f);
        let u2: f64 = rng.gen();
        if c * (2.0 - c) - u2 > 0.0 || (c / u2).ln() + 1.0 - c >= 0.0 {
            break f;
        }
    };

    let u3: f64 = rng.gen();
    let theta = if u3 > 0.5 {
        mu + f.acos()
    } else {
        mu - f.acos()
    };
    wrap_angle(theta)
}

/// Draw `n` independent von Mises angles.
pub fn von_mises_phases<R: Rng>(rng: &mut R, mu: f64, kappa: f64, n: usize) -> Vec<f64> {
    (0..n).map(|_| draw_von_mises(rng, mu, kappa)).collect()
}

// ── Tests ────────────────────────────────────────────────────────────
