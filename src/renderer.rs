// src/renderer.rs
use crate::config::DisplayConfig;
use crate::drivers::{Color, Display, TextStyle};
use crate::types::{FilteredSample, Lead};

const AXIS_COLOR: Color = Color::WHITE;

pub fn lead_color(lead: Lead) -> Color {
    match lead {
        Lead::I => Color::RED,
        Lead::II => Color::GREEN,
        Lead::III => Color::BLUE,
    }
}

/// Rows of the three horizontal axes: one under each lead's band.
pub fn axis_rows(height: i32) -> [i32; 3] {
    [height / 3, 2 * height / 3, height - 1]
}

/// Centre row of a lead's band. The screen is split in three equal strips.
pub fn band_center(lead: Lead, height: i32) -> i32 {
    height * (2 * lead.index() as i32 + 1) / 6
}

/// Maps a filtered value (volts) onto its lead's band.
///
/// The value is multiplied by the display gain, clamped to the configured
/// domain and interpolated linearly; higher values land on smaller rows.
pub fn map_to_band(value: f64, lead: Lead, config: &DisplayConfig, height: i32) -> i32 {
    let (lo, hi) = (config.domain_min, config.domain_max);
    let scaled = (value * config.gain).clamp(lo, hi);
    let t = (scaled - lo) / (hi - lo);
    let half = config.band_half_height;
    let bottom = band_center(lead, height) + half;
    bottom - (t * (2 * half) as f64).round() as i32
}

/// Draws the axes and lead legends on top of whatever is on screen.
pub fn draw_axes<D: Display + ?Sized>(display: &mut D) {
    let (w, h) = (display.width(), display.height());
    for (lead, row) in Lead::ALL.into_iter().zip(axis_rows(h)) {
        display.draw_line(0, row, w - 1, row, AXIS_COLOR);
        display.draw_text(0, row - 10, lead.label(), TextStyle::new(AXIS_COLOR, 1));
    }
}

/// Live strip chart that sweeps left to right and wraps.
#[derive(Debug, Clone)]
pub struct SweepRenderer {
    config: DisplayConfig,
    cursor: i32,
    previous: Option<[i32; 3]>,
}

impl SweepRenderer {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            cursor: 0,
            previous: None,
        }
    }

    /// Back to column zero with no pending segment.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.previous = None;
    }

    #[cfg(test)]
    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    pub fn push<D: Display + ?Sized>(&mut self, display: &mut D, sample: &FilteredSample) {
        let (w, h) = (display.width(), display.height());
        if self.cursor >= w {
            display.fill_screen(Color::BLACK);
            draw_axes(display);
            self.reset();
        }
        let x = self.cursor;
        display.draw_line(x, 0, x, h - 1, Color::BLACK);
        for row in axis_rows(h) {
            display.draw_line(x, row, x, row, AXIS_COLOR);
        }
        let rows = Lead::ALL.map(|lead| map_to_band(sample.get(lead), lead, &self.config, h));
        if let Some(prev) = self.previous {
            for lead in Lead::ALL {
                let i = lead.index();
                display.draw_line(x - 1, prev[i], x, rows[i], lead_color(lead));
            }
        }
        self.previous = Some(rows);
        self.cursor += 1;
    }
}

/// Redraws a stored recording from column zero.
///
/// Stops at whichever runs out first, the canvas width or the samples.
/// Returns how many points were plotted.
pub fn replay<D: Display + ?Sized>(
    display: &mut D,
    config: &DisplayConfig,
    samples: &[FilteredSample],
) -> usize {
    display.fill_screen(Color::BLACK);
    draw_axes(display);
    let (w, h) = (display.width(), display.height());
    let mut previous: Option<[i32; 3]> = None;
    let mut plotted = 0;
    for (x, sample) in samples.iter().take(w.max(0) as usize).enumerate() {
        let x = x as i32;
        let rows = Lead::ALL.map(|lead| map_to_band(sample.get(lead), lead, config, h));
        if let Some(prev) = previous {
            for lead in Lead::ALL {
                let i = lead.index();
                display.draw_line(x - 1, prev[i], x, rows[i], lead_color(lead));
            }
        }
        previous = Some(rows);
        plotted += 1;
    }
    plotted
}
