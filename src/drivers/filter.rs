// src/drivers/filter.rs
use std::f64::consts::{FRAC_1_SQRT_2, PI};
#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
/// Second-order (Butterworth) low-pass filter.
///
/// Each logical channel owns its own instance; the state carries over between
/// calls. Coefficients are designed from `cutoff_hz` and `dt_s` on first use and
/// redesigned only when either parameter changes.
#[derive(Clone, Debug, Default)]
pub struct SecondOrderLowPass {
    design: Option<(f64, f64, BiquadCoeffs)>,
    state: BiquadState,
    primed: bool,
}
impl SecondOrderLowPass {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn process(&mut self, raw: f64, cutoff_hz: f64, dt_s: f64) -> f64 {
        let coeffs = self.coeffs(cutoff_hz, dt_s);
        if !self.primed {
            // Start from the DC steady state of the first input.
            self.state.z1 = raw * (1.0 - coeffs.b0);
            self.state.z2 = raw * (coeffs.b2 - coeffs.a2);
            self.primed = true;
        }
        // Transposed direct form II
        let y = coeffs.b0 * raw + self.state.z1;
        self.state.z1 = coeffs.b1 * raw - coeffs.a1 * y + self.state.z2;
        self.state.z2 = coeffs.b2 * raw - coeffs.a2 * y;
        y
    }
    fn coeffs(&mut self, cutoff_hz: f64, dt_s: f64) -> BiquadCoeffs {
        match self.design {
            Some((c, d, coeffs)) if c == cutoff_hz && d == dt_s => coeffs,
            _ => {
                let coeffs = lowpass(cutoff_hz, 1.0 / dt_s, FRAC_1_SQRT_2);
                self.design = Some((cutoff_hz, dt_s, coeffs));
                coeffs
            }
        }
    }
}
fn lowpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let nyquist = sample_rate_hz * 0.5;
    let freq_hz = freq_hz.clamp(0.01, nyquist - 0.01);
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 - cos_w0) * 0.5;
    let b1 = 1.0 - cos_w0;
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}
