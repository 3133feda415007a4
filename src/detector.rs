// src/detector.rs
use log::debug;
use crate::config::DetectorConfig;

/// Four most recent beat timestamps (ms), oldest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseWindow {
    slots: [u64; 4],
}

impl PulseWindow {
    /// Shifts left and appends `at_ms` in the newest slot.
    pub fn push(&mut self, at_ms: u64) {
        self.shift_left();
        self.slots[3] = at_ms;
    }

    /// Drops the oldest timestamp; the newest slot keeps its value until the next push.
    pub fn shift_left(&mut self) {
        self.slots.copy_within(1.., 0);
    }

    /// Time covered by the three intervals between the four slots.
    pub fn span_ms(&self) -> u64 {
        self.slots[3].saturating_sub(self.slots[0])
    }

    #[cfg(test)]
    pub fn slots(&self) -> [u64; 4] {
        self.slots
    }
}

/// Fixed-capacity ring of accepted BPM estimates. Unwritten slots hold zero
/// and are left out of the average.
#[derive(Clone, Debug, PartialEq)]
pub struct BpmRing {
    slots: Vec<f64>,
    cursor: usize,
}

impl BpmRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn push(&mut self, bpm: f64) {
        self.slots[self.cursor] = bpm;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    pub fn average(&self) -> f64 {
        let (sum, count) = self
            .slots
            .iter()
            .filter(|v| **v > 0.0)
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }

    #[cfg(test)]
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|v| **v > 0.0).count()
    }

    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.cursor = 0;
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[f64] {
        &self.slots
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BpmEstimate {
    Accepted(f64),
    /// Out of band; the newest edge was treated as spurious.
    Rejected(f64),
}

/// Hysteresis beat detector with a running BPM average.
#[derive(Clone, Debug)]
pub struct PeakDetector {
    config: DetectorConfig,
    ignoring: bool,
    pulse_count: u32,
    window: PulseWindow,
    ring: BpmRing,
}

impl PeakDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let ring = BpmRing::new(config.ring_size);
        Self {
            config,
            ignoring: false,
            pulse_count: 0,
            window: PulseWindow::default(),
            ring,
        }
    }

    /// Called when a capture starts. The pulse window is never cleared; it ages out naturally.
    pub fn begin_session(&mut self) {
        if self.config.reset_between_sessions {
            self.ring.clear();
        }
    }

    /// Feeds one filtered lead I sample taken at `now_ms` (time since boot).
    pub fn update(&mut self, sample: f64, now_ms: u64) -> Option<BpmEstimate> {
        if !self.ignoring && sample >= self.config.upper_threshold {
            self.window.push(now_ms);
            self.pulse_count = self.pulse_count.saturating_add(1);
            self.ignoring = true;
        }
        if sample < self.config.lower_threshold {
            self.ignoring = false;
        }
        if self.pulse_count < 4 || now_ms <= self.config.warmup_ms {
            return None;
        }
        let span_ms = self.window.span_ms();
        let bpm = if span_ms == 0 {
            f64::INFINITY
        } else {
            3.0 / (span_ms as f64 / 1000.0) * 60.0
        };
        if bpm >= self.config.min_bpm && bpm <= self.config.max_bpm {
            self.ring.push(bpm);
            Some(BpmEstimate::Accepted(bpm))
        } else {
            debug!("rejected {bpm:.1} BPM estimate (span {span_ms} ms)");
            self.window.shift_left();
            self.pulse_count = 3;
            Some(BpmEstimate::Rejected(bpm))
        }
    }

    /// Mean of the populated ring slots, 0 when nothing was accepted yet.
    pub fn average_bpm(&self) -> f64 {
        self.ring.average()
    }

    #[cfg(test)]
    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    #[cfg(test)]
    pub fn window(&self) -> &PulseWindow {
        &self.window
    }

    #[cfg(test)]
    pub fn ring(&self) -> &BpmRing {
        &self.ring
    }
}
