// src/main.rs
mod acquisition;
mod catalog;
mod config;
mod detector;
mod drivers;
mod engine;
mod gui;
mod input;
mod instrument;
mod recorder;
mod renderer;
mod screens;
mod session;
mod types;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use anyhow::{anyhow, Context};
use eframe::egui;
use log::{info, warn};
use crate::acquisition::{spawn_acquisition, LeadPipeline, SharedSample};
use crate::config::InstrumentConfig;
use crate::drivers::{DirStorage, SimulatedFrontEnd, Storage};
// Entry point: config, storage, acquisition thread, engine thread, window.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = InstrumentConfig::load(config_path.as_deref())?;

    // Storage is checked once at startup; without it saving and browsing stay disabled.
    let storage: Option<Box<dyn Storage>> =
        match DirStorage::mount(&config.storage.root, config.storage.create_if_missing) {
            Ok(dir) => {
                info!("storage mounted at {}", dir.root().display());
                Some(Box::new(dir))
            }
            Err(err) => {
                warn!("{err} ({}); continuing without storage", config.storage.root);
                None
            }
        };

    let running = Arc::new(AtomicBool::new(true));
    let shared = Arc::new(SharedSample::new());
    let front_end = SimulatedFrontEnd::new(config.simulator.clone(), config.acquisition.dt_s);
    let pipeline = LeadPipeline::new(front_end, config.acquisition.clone())
        .context("analog front end failed to start")?;
    let acquisition = spawn_acquisition(pipeline, Arc::clone(&shared), Arc::clone(&running));

    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    let engine = engine::spawn_thread(tx, rx_cmd, config, shared, storage, Arc::clone(&running));

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1000.0, 680.0])
        .with_min_inner_size([920.0, 620.0])
        .with_title("CardioStick");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    let app_running = Arc::clone(&running);
    let result = eframe::run_native(
        "CardioStick",
        options,
        Box::new(move |_cc| {
            Box::new(gui::BoardApp::new(rx, tx_cmd, app_running, PathBuf::from("snapshots")))
        }),
    );

    running.store(false, Ordering::Relaxed);
    if engine.join().is_err() {
        warn!("engine thread panicked");
    }
    if acquisition.join().is_err() {
        warn!("acquisition thread panicked");
    }
    result.map_err(|e| anyhow!("window closed with an error: {e}"))
}
