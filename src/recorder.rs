// src/recorder.rs
use std::fmt::Write as _;
use std::io::BufRead;
use log::{debug, info};
use crate::drivers::{DeviceError, Storage};
use crate::types::FilteredSample;

/// Samples of one capture, one vector per lead.
///
/// Capacity is the sample budget; pushes past it are refused, never reallocated.
pub struct RecordingBuffer {
    lead1: Vec<f64>,
    lead2: Vec<f64>,
    lead3: Vec<f64>,
    capacity: usize,
}

impl RecordingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lead1: Vec::with_capacity(capacity),
            lead2: Vec::with_capacity(capacity),
            lead3: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a triple; `false` when the buffer is already full.
    pub fn push(&mut self, sample: FilteredSample) -> bool {
        if self.is_full() {
            return false;
        }
        self.lead1.push(sample.lead1);
        self.lead2.push(sample.lead2);
        self.lead3.push(sample.lead3);
        true
    }

    pub fn clear(&mut self) {
        self.lead1.clear();
        self.lead2.clear();
        self.lead3.clear();
    }

    pub fn len(&self) -> usize {
        self.lead1.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lead1.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = FilteredSample> + '_ {
        self.lead1
            .iter()
            .zip(&self.lead2)
            .zip(&self.lead3)
            .map(|((a, b), c)| FilteredSample::new(*a, *b, *c))
    }
}

/// One `lead1,lead2,lead3` line per sample, no header.
pub fn format_record(buffer: &RecordingBuffer) -> String {
    let mut out = String::with_capacity(buffer.len() * 24);
    for s in buffer.samples() {
        // writing into a String cannot fail
        let _ = writeln!(out, "{},{},{}", s.lead1, s.lead2, s.lead3);
    }
    out
}

/// Parses one stored line. Anything but exactly three numeric fields is malformed.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<FilteredSample, DeviceError> {
    let malformed = || DeviceError::MalformedRecordLine {
        line_no,
        line: line.to_string(),
    };
    let mut fields = line.trim().split(',');
    let mut next = || -> Result<f64, DeviceError> {
        fields
            .next()
            .and_then(|f| f.trim().parse::<f64>().ok())
            .ok_or_else(malformed)
    };
    let sample = FilteredSample::new(next()?, next()?, next()?);
    if fields.next().is_some() {
        return Err(malformed());
    }
    Ok(sample)
}

/// Reads up to `limit` valid samples from a stored recording, skipping malformed lines.
pub fn load_recording(
    storage: &dyn Storage,
    name: &str,
    limit: usize,
) -> Result<Vec<FilteredSample>, DeviceError> {
    let mut reader = storage.open_read(name)?;
    let mut samples = Vec::with_capacity(limit.min(4096));
    let mut raw = Vec::new();
    let mut line_no = 0;
    while samples.len() < limit {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_no += 1;
        // Invalid bytes become U+FFFD and fail the numeric parse like any other bad field.
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }
        match parse_record_line(&line, line_no) {
            Ok(sample) => samples.push(sample),
            Err(err) => debug!("{name}: skipping {err}"),
        }
    }
    Ok(samples)
}

/// `ECG_<ms>.txt`, bumping the stamp until the name is free.
pub fn unique_record_name(storage: &dyn Storage, now_ms: u64) -> String {
    let mut stamp = now_ms;
    loop {
        let name = format!("ECG_{stamp}.txt");
        if !storage.exists(&name) {
            return name;
        }
        stamp += 1;
    }
}

/// Writes the buffer under a fresh name and returns that name.
pub fn save_recording(
    storage: &mut dyn Storage,
    buffer: &RecordingBuffer,
    now_ms: u64,
) -> Result<String, DeviceError> {
    let name = unique_record_name(storage, now_ms);
    storage.write_file(&name, format_record(buffer).as_bytes())?;
    info!("saved {} samples to {name}", buffer.len());
    Ok(name)
}
