// src/engine.rs
use crate::acquisition::SharedSample;
use crate::config::InstrumentConfig;
use crate::drivers::{FrameBuffer, Storage};
use crate::instrument::Instrument;
use crate::types::*;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const FRAME_INTERVAL_MS: u64 = 33;
const BPM_INTERVAL_MS: u64 = 250;

// Main context: polls button levels from the window, ticks the instrument and
// streams frames back. Runs until `Shutdown`, a closed channel, or `running` clears.
pub fn spawn_thread(
    tx: Sender<DeviceMessage>,
    rx_cmd: Receiver<DeviceCommand>,
    config: InstrumentConfig,
    shared: Arc<SharedSample>,
    storage: Option<Box<dyn Storage>>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let boot = Instant::now();
        let screen = FrameBuffer::new(config.display.width, config.display.height);
        let mut instrument = Instrument::new(config, screen, storage, shared);
        tx.send(DeviceMessage::Log("Instrument ready.".to_owned())).ok();
        tx.send(DeviceMessage::StorageStatus(instrument.storage_available())).ok();

        let mut levels = ButtonLevels::default();
        let mut last_state = None;
        let mut last_revision = None;
        let mut last_frame_ms = 0;
        let mut last_bpm_ms = 0;

        'main: while running.load(Ordering::Relaxed) {
            let now = boot.elapsed().as_millis() as u64;

            // 1. commands from the window; every level change gets its own tick
            loop {
                match rx_cmd.try_recv() {
                    Ok(DeviceCommand::Buttons(new_levels)) => {
                        if new_levels != levels {
                            levels = new_levels;
                            instrument.tick(now, levels);
                        }
                    }
                    Ok(DeviceCommand::Shutdown) | Err(TryRecvError::Disconnected) => break 'main,
                    Err(TryRecvError::Empty) => break,
                }
            }

            // 2. regular tick
            instrument.tick(now, levels);

            // 3. feedback
            for line in instrument.take_messages() {
                tx.send(DeviceMessage::Log(line)).ok();
            }
            let state = instrument.menu_state();
            if last_state != Some(state) {
                last_state = Some(state);
                tx.send(DeviceMessage::State(state)).ok();
            }
            if state == MenuState::Measuring && now.saturating_sub(last_bpm_ms) >= BPM_INTERVAL_MS {
                last_bpm_ms = now;
                tx.send(DeviceMessage::Bpm(instrument.average_bpm())).ok();
            }
            let revision = instrument.display().revision();
            if last_revision != Some(revision) && now.saturating_sub(last_frame_ms) >= FRAME_INTERVAL_MS {
                last_revision = Some(revision);
                last_frame_ms = now;
                if tx.send(DeviceMessage::Frame(instrument.display().clone())).is_err() {
                    break;
                }
            }

            thread::sleep(Duration::from_millis(1));
        }
        running.store(false, Ordering::Relaxed);
        info!("engine stopped");
    })
}
