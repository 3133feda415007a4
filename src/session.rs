// src/session.rs
use log::{info, trace};
use crate::acquisition::SharedSample;
use crate::config::{DisplayConfig, SessionConfig};
use crate::detector::PeakDetector;
use crate::drivers::{Color, Display, TextStyle};
use crate::recorder::RecordingBuffer;
use crate::renderer::{draw_axes, SweepRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Complete,
}

/// Draws the averaged heart rate in the top-left box.
pub fn draw_bpm<D: Display + ?Sized>(display: &mut D, bpm: f64) {
    display.fill_rect(10, 10, 120, 20, Color::BLACK);
    display.draw_text(10, 10, &format!("BPM: {bpm:.0}"), TextStyle::new(Color::GREEN, 2));
}

/// One bounded capture: pulls the latest published triple every `pace_ms`,
/// plots it, feeds lead I to the detector and records it until the buffer is full.
pub struct MeasurementSession {
    config: SessionConfig,
    buffer: RecordingBuffer,
    renderer: SweepRenderer,
    next_due_ms: u64,
    active: bool,
}

impl MeasurementSession {
    pub fn new(config: SessionConfig, display: DisplayConfig) -> Self {
        let buffer = RecordingBuffer::with_capacity(config.sample_budget);
        Self {
            config,
            buffer,
            renderer: SweepRenderer::new(display),
            next_due_ms: 0,
            active: false,
        }
    }

    pub fn start<D: Display + ?Sized>(&mut self, display: &mut D, detector: &mut PeakDetector, now_ms: u64) {
        self.buffer.clear();
        self.renderer.reset();
        detector.begin_session();
        display.fill_screen(Color::BLACK);
        draw_axes(display);
        draw_bpm(display, detector.average_bpm());
        self.next_due_ms = now_ms;
        self.active = true;
        info!("capture started, {} samples every {} ms", self.config.sample_budget, self.config.pace_ms);
    }

    /// Runs at most one capture iteration if it is due.
    pub fn poll<D: Display + ?Sized>(
        &mut self,
        display: &mut D,
        detector: &mut PeakDetector,
        shared: &SharedSample,
        now_ms: u64,
    ) -> SessionStatus {
        if !self.active {
            return SessionStatus::Complete;
        }
        if now_ms >= self.next_due_ms {
            self.next_due_ms = now_ms + self.config.pace_ms;
            let sample = shared.latest();
            trace!("{},{},{}", sample.lead1, sample.lead2, sample.lead3);
            self.renderer.push(display, &sample);
            detector.update(sample.lead1, now_ms);
            self.buffer.push(sample);
            draw_bpm(display, detector.average_bpm());
        }
        if self.buffer.is_full() {
            self.active = false;
            info!(
                "capture complete: {} samples, {:.0} BPM",
                self.buffer.len(),
                detector.average_bpm()
            );
            return SessionStatus::Complete;
        }
        SessionStatus::Running
    }

    /// Abandons the capture. Nothing has been written anywhere yet.
    pub fn cancel(&mut self) {
        if self.active {
            info!("capture cancelled after {} samples", self.buffer.len());
        }
        self.active = false;
        self.buffer.clear();
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn buffer(&self) -> &RecordingBuffer {
        &self.buffer
    }
}
