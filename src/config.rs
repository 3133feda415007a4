// src/config.rs
use std::path::Path;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::drivers::DeviceError;

/// Instrument configuration. Every section falls back to its defaults, so a
/// JSON file only needs the keys it wants to change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub acquisition: AcquisitionConfig,
    pub detector: DetectorConfig,
    pub session: SessionConfig,
    pub display: DisplayConfig,
    pub catalog: CatalogConfig,
    pub input: InputConfig,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Scheduler period of the acquisition context.
    pub period_ms: u64,
    pub cutoff_hz: f64,
    /// Time step handed to the filter primitive.
    pub dt_s: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            period_ms: 1,
            cutoff_hz: 40.0,
            dt_s: 0.001,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// A sample at or above this value counts as a beat while armed.
    pub upper_threshold: f64,
    /// A sample below this value re-arms the detector.
    pub lower_threshold: f64,
    /// No estimate is produced before this much time since boot.
    pub warmup_ms: u64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Number of accepted estimates averaged for display.
    pub ring_size: usize,
    /// Start every capture with an empty estimate ring.
    pub reset_between_sessions: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            upper_threshold: 2.60,
            lower_threshold: 2.40,
            warmup_ms: 2000,
            min_bpm: 29.0,
            max_bpm: 330.0,
            ring_size: 7,
            reset_between_sessions: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Samples captured per measurement; also the recording buffer capacity.
    pub sample_budget: usize,
    /// Delay between capture iterations.
    pub pace_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_budget: 1500,
            pace_ms: 5,
        }
    }
}

/// Smallest and largest accepted screen side, in pixels.
pub const MIN_DISPLAY_SIDE: u32 = 128;
pub const MAX_DISPLAY_SIDE: u32 = 4096;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Volts are multiplied by this before mapping onto the band.
    pub gain: f64,
    pub domain_min: f64,
    pub domain_max: f64,
    /// Half height in pixels of each lead's trace band.
    pub band_half_height: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            gain: 15000.0,
            domain_min: -11000.0,
            domain_max: 2000.0,
            band_half_height: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub max_files: usize,
    pub extension: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 8,
            max_files: 50,
            extension: ".txt".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub debounce_ms: u64,
    pub long_press_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            long_press_ms: 4000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub credits_ms: u64,
    /// How long save results and storage warnings stay on screen.
    pub notice_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            credits_ms: 7000,
            notice_ms: 2000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: String,
    pub create_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "sd_card".to_owned(),
            create_if_missing: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub heart_rate_bpm: f64,
    pub baseline_v: f64,
    pub r_amplitude_v: f64,
    pub lead2_gain: f64,
    pub noise_v: f64,
    pub mains_hz: f64,
    pub mains_v: f64,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72.0,
            baseline_v: 1.65,
            r_amplitude_v: 1.1,
            lead2_gain: 1.3,
            noise_v: 0.01,
            mains_hz: 50.0,
            mains_v: 0.02,
            seed: 7,
        }
    }
}

impl InstrumentConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: InstrumentConfig =
            serde_json::from_str(text).context("failed to parse instrument config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` if given, else `instrument.json` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Path::new("instrument.json");
        let path = match path {
            Some(p) => p,
            None if default_path.exists() => default_path,
            None => {
                info!("no config file, using built-in defaults");
                return Ok(Self::default());
            }
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DeviceError> {
        let invalid = |msg: &str| Err(DeviceError::InvalidConfig(msg.to_owned()));
        if self.session.sample_budget == 0 {
            return invalid("session.sample_budget must be at least 1");
        }
        if self.detector.ring_size == 0 {
            return invalid("detector.ring_size must be at least 1");
        }
        if self.catalog.page_size == 0 || self.catalog.max_files == 0 {
            return invalid("catalog.page_size and catalog.max_files must be at least 1");
        }
        let sides = MIN_DISPLAY_SIDE..=MAX_DISPLAY_SIDE;
        if !sides.contains(&self.display.width) || !sides.contains(&self.display.height) {
            return invalid(
                format!("display width and height must be between {MIN_DISPLAY_SIDE} and {MAX_DISPLAY_SIDE}")
                    .as_str(),
            );
        }
        // Each lead owns a third of the screen; its band must fit inside that strip.
        let strip = self.display.height as i32 / 3;
        if self.display.band_half_height < 1 || 2 * self.display.band_half_height >= strip {
            return invalid(
                format!("display.band_half_height must be between 1 and {}", (strip - 1) / 2).as_str(),
            );
        }
        if !self.display.gain.is_finite() || self.display.gain <= 0.0 {
            return invalid("display.gain must be a positive number");
        }
        if self.display.domain_min >= self.display.domain_max {
            return invalid("display.domain_min must be below display.domain_max");
        }
        if self.detector.min_bpm >= self.detector.max_bpm {
            return invalid("detector.min_bpm must be below detector.max_bpm");
        }
        if self.acquisition.dt_s <= 0.0 || self.acquisition.cutoff_hz <= 0.0 {
            return invalid("acquisition.dt_s and acquisition.cutoff_hz must be positive");
        }
        if self.detector.upper_threshold < self.detector.lower_threshold {
            warn!(
                "detector.upper_threshold ({}) is below detector.lower_threshold ({}); \
                 samples between them re-arm immediately and may double count beats",
                self.detector.upper_threshold, self.detector.lower_threshold
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = InstrumentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.sample_budget, 1500);
        assert_eq!(config.detector.ring_size, 7);
        assert_eq!(config.catalog.page_size, 8);
        assert_eq!(config.input.debounce_ms, 200);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            InstrumentConfig::from_json(r#"{ "session": { "sample_budget": 300 } }"#).unwrap();
        assert_eq!(config.session.sample_budget, 300);
        assert_eq!(config.session.pace_ms, 5);
        assert_eq!(config.display, DisplayConfig::default());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = InstrumentConfig::from_json(r#"{ "detector": { "ring_size": 0 } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn out_of_range_display_is_rejected() {
        let err = InstrumentConfig::from_json(r#"{ "display": { "width": 3000000000 } }"#).unwrap_err();
        assert!(matches!(err.downcast_ref::<DeviceError>(), Some(DeviceError::InvalidConfig(_))));
        let tiny = InstrumentConfig::from_json(r#"{ "display": { "height": 40 } }"#);
        assert!(tiny.is_err());
    }

    #[test]
    fn bands_must_be_positive_and_apart() {
        for half in [0, -5, 40, 200] {
            let json = format!(r#"{{ "display": {{ "band_half_height": {half} }} }}"#);
            assert!(InstrumentConfig::from_json(&json).is_err(), "half height {half}");
        }
        let widest = InstrumentConfig::from_json(r#"{ "display": { "band_half_height": 39 } }"#);
        assert!(widest.is_ok());
    }

    #[test]
    fn inverted_thresholds_are_accepted() {
        let config = InstrumentConfig::from_json(
            r#"{ "detector": { "upper_threshold": 2.45, "lower_threshold": 2.60 } }"#,
        )
        .unwrap();
        assert!(config.detector.upper_threshold < config.detector.lower_threshold);
    }

    #[test]
    fn round_trips_through_json() {
        let config = InstrumentConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(InstrumentConfig::from_json(&text).unwrap(), config);
    }
}
