// src/drivers/frontend.rs
use std::f64::consts::PI;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::config::SimulatorConfig;
use crate::drivers::DeviceError;
use crate::types::Lead;
/// Analog front end yielding one voltage per measured channel.
///
/// Only `Lead::I` and `Lead::II` are measured; `Lead::III` is derived downstream.
pub trait FrontEnd: Send {
    fn init(&mut self) -> Result<(), DeviceError>;
    fn wake(&mut self, channel: Lead) -> Result<(), DeviceError>;
    fn sample(&mut self, channel: Lead) -> Result<f64, DeviceError>;
}
/// Synthetic two-channel ECG source.
///
/// Each beat is a sum of Gaussian bumps (P, Q, R, S, T) riding on a DC
/// baseline, plus mains hum and white noise. Time advances by `dt_s` on every
/// read of a channel, so the waveform is reproducible for a given seed.
pub struct SimulatedFrontEnd {
    config: SimulatorConfig,
    dt_s: f64,
    ticks: [u64; 2],
    awake: [bool; 2],
    rng: StdRng,
}
// (relative position in the beat, width in seconds, amplitude relative to R)
const WAVES: [(f64, f64, f64); 5] = [
    (-0.20, 0.025, 0.12),  // P
    (-0.035, 0.010, -0.10), // Q
    (0.0, 0.012, 1.00),    // R
    (0.035, 0.012, -0.20), // S
    (0.28, 0.040, 0.25),   // T
];
impl SimulatedFrontEnd {
    pub fn new(config: SimulatorConfig, dt_s: f64) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            dt_s,
            ticks: [0; 2],
            awake: [false; 2],
            rng,
        }
    }
    fn heartbeat(&self, t: f64) -> f64 {
        let period = 60.0 / self.config.heart_rate_bpm.max(1.0);
        // centre the R wave a third of the way into each period
        let phase = (t % period) - period / 3.0;
        WAVES
            .iter()
            .map(|(at, width, amp)| {
                let d = phase - at;
                amp * (-(d * d) / (2.0 * width * width)).exp()
            })
            .sum()
    }
}
impl FrontEnd for SimulatedFrontEnd {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.ticks = [0; 2];
        Ok(())
    }
    fn wake(&mut self, channel: Lead) -> Result<(), DeviceError> {
        match channel {
            Lead::I | Lead::II => {
                self.awake[channel.index()] = true;
                Ok(())
            }
            Lead::III => Err(DeviceError::FrontEndRead(channel)),
        }
    }
    fn sample(&mut self, channel: Lead) -> Result<f64, DeviceError> {
        let idx = match channel {
            Lead::I | Lead::II => channel.index(),
            Lead::III => return Err(DeviceError::FrontEndRead(channel)),
        };
        if !self.awake[idx] {
            return Err(DeviceError::FrontEndRead(channel));
        }
        let t = self.ticks[idx] as f64 * self.dt_s;
        self.ticks[idx] += 1;
        let gain = if idx == 0 { 1.0 } else { self.config.lead2_gain };
        let hum = self.config.mains_v * (2.0 * PI * self.config.mains_hz * t).sin();
        let noise = if self.config.noise_v > 0.0 {
            self.rng.gen_range(-self.config.noise_v..self.config.noise_v)
        } else {
            0.0
        };
        Ok(self.config.baseline_v + gain * self.config.r_amplitude_v * self.heartbeat(t) + hum + noise)
    }
}
#[cfg(test)]
pub use scripted::ScriptedFrontEnd;
#[cfg(test)]
mod tests {
    use super::*;
    fn quiet_config(bpm: f64) -> SimulatorConfig {
        SimulatorConfig {
            heart_rate_bpm: bpm,
            noise_v: 0.0,
            mains_v: 0.0,
            ..SimulatorConfig::default()
        }
    }
    #[test]
    fn simulator_requires_wake() {
        let mut fe = SimulatedFrontEnd::new(quiet_config(60.0), 0.001);
        fe.init().unwrap();
        assert!(fe.sample(Lead::I).is_err());
        fe.wake(Lead::I).unwrap();
        assert!(fe.sample(Lead::I).is_ok());
    }
    #[test]
    fn simulator_produces_one_r_peak_per_beat() {
        let config = quiet_config(60.0);
        let threshold = config.baseline_v + 0.5 * config.r_amplitude_v;
        let mut fe = SimulatedFrontEnd::new(config, 0.001);
        fe.init().unwrap();
        fe.wake(Lead::I).unwrap();
        let mut above = false;
        let mut peaks = 0;
        for _ in 0..5000 {
            let v = fe.sample(Lead::I).unwrap();
            if v > threshold && !above {
                peaks += 1;
            }
            above = v > threshold;
        }
        assert_eq!(peaks, 5);
    }
    #[test]
    fn scripted_front_end_reports_failed_reads() {
        let mut fe = ScriptedFrontEnd::new(vec![(Some(1.0), None), (None, Some(2.0))]);
        assert_eq!(fe.sample(Lead::I).unwrap(), 1.0);
        assert!(fe.sample(Lead::II).is_err());
        assert!(fe.sample(Lead::I).is_err());
        assert_eq!(fe.sample(Lead::II).unwrap(), 2.0);
        assert!(fe.sample(Lead::I).is_err());
    }
}
