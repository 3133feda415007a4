// src/acquisition.rs
use std::hint::spin_loop;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{info, warn};
use crate::config::AcquisitionConfig;
use crate::drivers::{DeviceError, FrontEnd, SecondOrderLowPass};
use crate::types::{FilteredSample, Lead};

/// Single-writer, multi-reader slot holding the latest filtered triple.
///
/// The acquisition context is the only writer. Readers never block the writer
/// and never see a triple mixing two publishes; a reader may be at most one
/// acquisition period behind. Internally a sequence lock: the counter is odd
/// while a publish is in flight.
#[derive(Debug, Default)]
pub struct SharedSample {
    seq: AtomicU64,
    leads: [AtomicU64; 3],
}

impl SharedSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, sample: FilteredSample) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        self.leads[0].store(sample.lead1.to_bits(), Ordering::Relaxed);
        self.leads[1].store(sample.lead2.to_bits(), Ordering::Relaxed);
        self.leads[2].store(sample.lead3.to_bits(), Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    pub fn latest(&self) -> FilteredSample {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }
            let lead1 = f64::from_bits(self.leads[0].load(Ordering::Relaxed));
            let lead2 = f64::from_bits(self.leads[1].load(Ordering::Relaxed));
            let lead3 = f64::from_bits(self.leads[2].load(Ordering::Relaxed));
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return FilteredSample { lead1, lead2, lead3 };
            }
        }
    }

    /// Number of completed publishes.
    pub fn publishes(&self) -> u64 {
        self.seq.load(Ordering::Acquire) / 2
    }
}

/// Reads both measured channels, filters them, derives lead III and publishes.
pub struct LeadPipeline<F: FrontEnd> {
    front_end: F,
    config: AcquisitionConfig,
    filters: [SecondOrderLowPass; 3],
    last_raw: [f64; 2],
    stale_reads: u64,
}

impl<F: FrontEnd> LeadPipeline<F> {
    pub fn new(mut front_end: F, config: AcquisitionConfig) -> Result<Self, DeviceError> {
        front_end.init()?;
        front_end.wake(Lead::I)?;
        front_end.wake(Lead::II)?;
        Ok(Self {
            front_end,
            config,
            filters: Default::default(),
            last_raw: [0.0; 2],
            stale_reads: 0,
        })
    }

    /// One acquisition period. A failed channel read holds that channel's last raw value.
    pub fn step(&mut self) -> FilteredSample {
        let raw1 = self.read(Lead::I);
        let raw2 = self.read(Lead::II);
        let (cutoff, dt) = (self.config.cutoff_hz, self.config.dt_s);
        let lead1 = self.filters[0].process(raw1, cutoff, dt);
        let lead2 = self.filters[1].process(raw2, cutoff, dt);
        let lead3 = self.filters[2].process(lead2 - lead1, cutoff, dt);
        FilteredSample { lead1, lead2, lead3 }
    }

    pub fn step_and_publish(&mut self, shared: &SharedSample) {
        shared.publish(self.step());
    }

    pub fn stale_reads(&self) -> u64 {
        self.stale_reads
    }

    fn read(&mut self, channel: Lead) -> f64 {
        let idx = channel.index();
        match self.front_end.sample(channel) {
            Ok(v) => {
                self.last_raw[idx] = v;
                v
            }
            Err(err) => {
                if self.stale_reads % 1000 == 0 {
                    warn!("{err}; holding last value ({} stale reads so far)", self.stale_reads);
                }
                self.stale_reads += 1;
                self.last_raw[idx]
            }
        }
    }
}

/// Runs the pipeline on its own thread at `period_ms` until `running` is cleared.
pub fn spawn_acquisition<F: FrontEnd + 'static>(
    mut pipeline: LeadPipeline<F>,
    shared: Arc<SharedSample>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let period = Duration::from_millis(pipeline.config.period_ms.max(1));
    thread::spawn(move || {
        info!("acquisition running every {period:?}");
        while running.load(Ordering::Relaxed) {
            pipeline.step_and_publish(&shared);
            thread::sleep(period);
        }
        info!(
            "acquisition stopped after {} publishes ({} stale reads)",
            shared.publishes(),
            pipeline.stale_reads()
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ScriptedFrontEnd;

    #[test]
    fn derives_lead_three_from_filtered_difference() {
        let fe = ScriptedFrontEnd::constant(1.0, 1.5, 500);
        let mut pipeline = LeadPipeline::new(fe, AcquisitionConfig::default()).unwrap();
        let mut out = FilteredSample::default();
        for _ in 0..500 {
            out = pipeline.step();
        }
        assert!((out.lead1 - 1.0).abs() < 1e-9);
        assert!((out.lead2 - 1.5).abs() < 1e-9);
        assert!((out.lead3 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn failed_read_holds_last_value() {
        let fe = ScriptedFrontEnd::new(vec![(Some(2.0), Some(2.0)), (None, None), (None, Some(2.0))]);
        let mut pipeline = LeadPipeline::new(fe, AcquisitionConfig::default()).unwrap();
        let first = pipeline.step();
        let second = pipeline.step();
        let third = pipeline.step();
        assert_eq!(pipeline.stale_reads(), 3);
        assert!((first.lead1 - 2.0).abs() < 1e-9);
        assert!((second.lead1 - 2.0).abs() < 1e-9);
        assert!((third.lead2 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn publish_is_visible_to_readers() {
        let shared = SharedSample::new();
        assert_eq!(shared.latest(), FilteredSample::default());
        shared.publish(FilteredSample::new(0.1, 0.2, 0.3));
        assert_eq!(shared.latest(), FilteredSample::new(0.1, 0.2, 0.3));
        assert_eq!(shared.publishes(), 1);
    }

    #[test]
    fn concurrent_reader_never_sees_torn_triple() {
        let shared = Arc::new(SharedSample::new());
        let writer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for k in 0..200_000u32 {
                    let v = k as f64;
                    shared.publish(FilteredSample::new(v, v, v));
                }
            })
        };
        let mut last = -1.0;
        while !writer.is_finished() {
            let s = shared.latest();
            assert_eq!(s.lead1, s.lead2);
            assert_eq!(s.lead2, s.lead3);
            assert!(s.lead1 >= last);
            last = s.lead1;
        }
        writer.join().unwrap();
        assert_eq!(shared.latest().lead1, 199_999.0);
    }

    #[test]
    fn acquisition_thread_publishes_until_stopped() {
        let fe = ScriptedFrontEnd::constant(1.0, 1.0, 10_000);
        let pipeline = LeadPipeline::new(fe, AcquisitionConfig::default()).unwrap();
        let shared = Arc::new(SharedSample::new());
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_acquisition(pipeline, Arc::clone(&shared), Arc::clone(&running));
        while shared.publishes() < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
        assert!((shared.latest().lead1 - 1.0).abs() < 1e-9);
    }
}
