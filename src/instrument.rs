// src/instrument.rs
use std::sync::Arc;
use log::{error, info, warn};
use crate::acquisition::SharedSample;
use crate::catalog::FileCatalog;
use crate::config::InstrumentConfig;
use crate::detector::PeakDetector;
use crate::drivers::{DeviceError, Display, Storage};
use crate::input::{ButtonPanel, LongPressTracker, PressKind};
use crate::recorder::{load_recording, save_recording};
use crate::renderer::replay;
use crate::screens::{self, Choice, MENU_OPTIONS};
use crate::session::{MeasurementSession, SessionStatus};
use crate::types::{ButtonLevels, MenuState};

/// Where a timed notice hands control back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterNotice {
    MainMenu,
    Browsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    MainMenu { selection: usize },
    Measuring,
    SaveConfirm { choice: Choice },
    /// `viewing` is set while a replayed recording is on screen.
    Browsing { viewing: bool },
    DeleteConfirm { choice: Choice },
    Credits { until_ms: u64 },
    Notice { until_ms: u64, then: AfterNotice },
}

/// The board's main context: button handling, screens, capture, storage.
///
/// Nothing here blocks. The owner calls [`Instrument::tick`] with the current
/// time and button levels; timed screens are deadlines checked on each tick.
pub struct Instrument<D: Display> {
    config: InstrumentConfig,
    display: D,
    storage: Option<Box<dyn Storage>>,
    shared: Arc<SharedSample>,
    detector: PeakDetector,
    session: MeasurementSession,
    catalog: FileCatalog,
    buttons: ButtonPanel,
    long_press: LongPressTracker,
    screen: Screen,
    messages: Vec<String>,
}

impl<D: Display> Instrument<D> {
    pub fn new(
        config: InstrumentConfig,
        display: D,
        storage: Option<Box<dyn Storage>>,
        shared: Arc<SharedSample>,
    ) -> Self {
        let mut instrument = Self {
            detector: PeakDetector::new(config.detector.clone()),
            session: MeasurementSession::new(config.session.clone(), config.display.clone()),
            catalog: FileCatalog::new(&config.catalog),
            buttons: ButtonPanel::new(&config.input),
            long_press: LongPressTracker::new(config.input.long_press_ms),
            screen: Screen::MainMenu { selection: 0 },
            messages: Vec::new(),
            config,
            display,
            storage,
            shared,
        };
        if instrument.storage.is_none() {
            instrument.status("Storage not found; saving and browsing are disabled");
        }
        instrument.go_main_menu();
        instrument
    }

    pub fn tick(&mut self, now_ms: u64, levels: ButtonLevels) {
        let events = self.buttons.poll(levels, now_ms);
        match self.screen {
            Screen::MainMenu { selection } => {
                let count = MENU_OPTIONS.len();
                let mut selection = selection;
                if events.previous {
                    selection = (selection + count - 1) % count;
                }
                if events.next {
                    selection = (selection + 1) % count;
                }
                if selection != self.selection() {
                    self.screen = Screen::MainMenu { selection };
                    screens::main_menu(&mut self.display, selection);
                }
                if events.select {
                    self.activate(selection, now_ms);
                }
            }
            Screen::Measuring => {
                if events.select {
                    self.session.cancel();
                    self.status("Measurement cancelled");
                    self.go_main_menu();
                    return;
                }
                let status =
                    self.session
                        .poll(&mut self.display, &mut self.detector, &self.shared, now_ms);
                if status == SessionStatus::Complete {
                    self.status(&format!(
                        "Measurement complete ({:.0} BPM)",
                        self.detector.average_bpm()
                    ));
                    self.screen = Screen::SaveConfirm { choice: Choice::Yes };
                    screens::save_prompt(&mut self.display, Choice::Yes);
                }
            }
            Screen::SaveConfirm { choice } => {
                if events.previous || events.next {
                    let choice = choice.toggled();
                    self.screen = Screen::SaveConfirm { choice };
                    screens::save_prompt(&mut self.display, choice);
                } else if events.select {
                    self.commit_save(choice, now_ms);
                }
            }
            Screen::Browsing { viewing } => {
                if events.previous || events.next {
                    if events.previous {
                        self.catalog.previous();
                    }
                    if events.next {
                        self.catalog.next();
                    }
                    self.long_press.cancel();
                    self.show_browser();
                    return;
                }
                if events.select {
                    self.long_press.press(now_ms);
                }
                match self.long_press.poll(levels.select, now_ms) {
                    Some(PressKind::Long) => {
                        if self.catalog.selected_file().is_some() {
                            self.long_press.cancel();
                            self.screen = Screen::DeleteConfirm { choice: Choice::Yes };
                            screens::delete_prompt(&mut self.display, Choice::Yes);
                        }
                    }
                    Some(PressKind::Short) if viewing => self.show_browser(),
                    Some(PressKind::Short) if self.catalog.is_return_selected() => {
                        self.go_main_menu()
                    }
                    Some(PressKind::Short) => self.replay_selected(now_ms),
                    None => {}
                }
            }
            Screen::DeleteConfirm { choice } => {
                if events.previous || events.next {
                    let choice = choice.toggled();
                    self.screen = Screen::DeleteConfirm { choice };
                    screens::delete_prompt(&mut self.display, choice);
                } else if events.select {
                    self.commit_delete(choice, now_ms);
                }
            }
            Screen::Credits { until_ms } => {
                if now_ms >= until_ms {
                    self.go_main_menu();
                }
            }
            Screen::Notice { until_ms, then } => {
                if now_ms >= until_ms {
                    match then {
                        AfterNotice::MainMenu => self.go_main_menu(),
                        AfterNotice::Browsing => self.show_browser(),
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Credits report as `MainMenu`, delete confirmation as `Browsing`, and a
    /// notice as the state it returns to.
    pub fn menu_state(&self) -> MenuState {
        match self.screen {
            Screen::MainMenu { .. } | Screen::Credits { .. } => MenuState::MainMenu,
            Screen::Measuring => MenuState::Measuring,
            Screen::SaveConfirm { .. } => MenuState::SaveConfirm,
            Screen::Browsing { .. } | Screen::DeleteConfirm { .. } => MenuState::Browsing,
            Screen::Notice { then, .. } => match then {
                AfterNotice::MainMenu => MenuState::MainMenu,
                AfterNotice::Browsing => MenuState::Browsing,
            },
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    #[cfg(test)]
    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    pub fn average_bpm(&self) -> f64 {
        self.detector.average_bpm()
    }

    pub fn storage_available(&self) -> bool {
        self.storage.is_some()
    }

    /// Status lines produced since the last call.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    fn status(&mut self, text: &str) {
        info!("{text}");
        self.messages.push(text.to_owned());
    }

    fn selection(&self) -> usize {
        match self.screen {
            Screen::MainMenu { selection } => selection,
            _ => 0,
        }
    }

    fn activate(&mut self, selection: usize, now_ms: u64) {
        match selection {
            0 => {
                self.session.start(&mut self.display, &mut self.detector, now_ms);
                self.screen = Screen::Measuring;
                self.status("Measurement started");
            }
            1 => match self.enumerate() {
                Ok(count) => {
                    self.status(&format!("{count} recordings found"));
                    self.show_browser();
                }
                Err(err) => {
                    warn!("cannot open the browser: {err}");
                    self.show_notice(&err, now_ms, AfterNotice::MainMenu);
                }
            },
            _ => {
                screens::credits(&mut self.display);
                self.screen = Screen::Credits {
                    until_ms: now_ms + self.config.timing.credits_ms,
                };
            }
        }
    }

    fn enumerate(&mut self) -> Result<usize, DeviceError> {
        let storage = self.storage.as_deref().ok_or(DeviceError::StorageUnavailable)?;
        self.catalog.enumerate(storage)
    }

    fn commit_save(&mut self, choice: Choice, now_ms: u64) {
        if choice == Choice::No {
            self.status("Measurement discarded");
            self.go_main_menu();
            return;
        }
        let Some(storage) = self.storage.as_deref_mut() else {
            self.show_notice(&DeviceError::StorageUnavailable, now_ms, AfterNotice::MainMenu);
            return;
        };
        screens::notice(&mut self.display, "Saving...", &[]);
        let detail = match save_recording(storage, self.session.buffer(), now_ms) {
            Ok(name) => {
                let line = format!("Saved to {name}");
                self.status(&line);
                line
            }
            Err(err) => {
                error!("saving the measurement failed: {err}");
                self.messages.push(format!("Save failed: {err}"));
                "Error saving data".to_owned()
            }
        };
        screens::notice(&mut self.display, "Saving...", &[detail.as_str()]);
        self.screen = Screen::Notice {
            until_ms: now_ms + self.config.timing.notice_ms,
            then: AfterNotice::MainMenu,
        };
    }

    fn replay_selected(&mut self, now_ms: u64) {
        let Some(name) = self.catalog.selected_file().map(str::to_owned) else {
            return;
        };
        let loaded = match self.storage.as_deref() {
            Some(storage) => load_recording(storage, &name, self.display.width().max(0) as usize),
            None => Err(DeviceError::StorageUnavailable),
        };
        match loaded {
            Ok(samples) => {
                let plotted = replay(&mut self.display, &self.config.display, &samples);
                self.status(&format!("Plotted {plotted} samples from {name}"));
                self.screen = Screen::Browsing { viewing: true };
            }
            Err(err) => {
                warn!("replay of {name} failed: {err}");
                self.show_notice(&err, now_ms, AfterNotice::Browsing);
            }
        }
    }

    fn commit_delete(&mut self, choice: Choice, now_ms: u64) {
        let name = self.catalog.selected_file().map(str::to_owned);
        let (Choice::Yes, Some(name)) = (choice, name) else {
            self.show_browser();
            return;
        };
        let Some(storage) = self.storage.as_deref_mut() else {
            self.show_notice(&DeviceError::StorageUnavailable, now_ms, AfterNotice::MainMenu);
            return;
        };
        let removed = storage
            .remove(&name)
            .and_then(|_| self.catalog.refresh_after_delete(&*storage));
        match removed {
            Ok(_) => {
                self.status(&format!("Deleted {name}"));
                self.show_browser();
            }
            Err(err) => {
                error!("deleting {name} failed: {err}");
                self.show_notice(&err, now_ms, AfterNotice::Browsing);
            }
        }
    }

    fn show_browser(&mut self) {
        self.screen = Screen::Browsing { viewing: false };
        screens::browser(&mut self.display, &self.catalog);
    }

    fn show_notice(&mut self, err: &DeviceError, now_ms: u64, then: AfterNotice) {
        let (title, detail) = match err {
            DeviceError::StorageUnavailable => ("Storage unavailable", "Insert a card and restart".to_owned()),
            DeviceError::FileOpen { name, .. } => ("Error opening file", name.clone()),
            other => ("Storage error", other.to_string()),
        };
        self.messages.push(format!("{title}: {detail}"));
        screens::notice(&mut self.display, title, &[detail.as_str()]);
        self.screen = Screen::Notice {
            until_ms: now_ms + self.config.timing.notice_ms,
            then,
        };
    }

    /// Back to the main menu with selection and browser state reset.
    fn go_main_menu(&mut self) {
        self.long_press.cancel();
        if let Err(err) = self.enumerate() {
            if self.storage.is_some() {
                warn!("re-enumeration failed: {err}");
            }
            self.catalog.clear();
        }
        self.screen = Screen::MainMenu { selection: 0 };
        screens::main_menu(&mut self.display, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::drivers::{FrameBuffer, MemStorage};
    use crate::types::{Button, FilteredSample};

    struct Bench {
        inst: Instrument<FrameBuffer>,
        shared: Arc<SharedSample>,
        now: u64,
    }

    impl Bench {
        fn new(storage: Option<MemStorage>, budget: usize) -> Self {
            let config = InstrumentConfig {
                session: SessionConfig {
                    sample_budget: budget,
                    pace_ms: 5,
                },
                ..InstrumentConfig::default()
            };
            let shared = Arc::new(SharedSample::new());
            let storage = storage.map(|s| Box::new(s) as Box<dyn Storage>);
            let inst = Instrument::new(config, FrameBuffer::new(320, 240), storage, Arc::clone(&shared));
            Self {
                inst,
                shared,
                now: 1000,
            }
        }

        fn idle(&mut self, ms: u64) {
            let end = self.now + ms;
            while self.now < end {
                self.now += 5;
                self.inst.tick(self.now, ButtonLevels::default());
            }
        }

        fn press(&mut self, button: Button) {
            self.now += 300;
            self.inst.tick(self.now, ButtonLevels::default().with(button, true));
            self.now += 50;
            self.inst.tick(self.now, ButtonLevels::default());
        }

        fn hold(&mut self, button: Button, ms: u64) {
            self.now += 300;
            let down = ButtonLevels::default().with(button, true);
            let end = self.now + ms;
            while self.now <= end {
                self.inst.tick(self.now, down);
                self.now += 50;
            }
            self.inst.tick(self.now, ButtonLevels::default());
        }

        fn screen_has(&self, text: &str) -> bool {
            self.inst.display().contains_text(text)
        }
    }

    fn two_files() -> MemStorage {
        MemStorage::new()
            .with_file("ECG_1.txt", "0.1,0.2,0.1\n0.12,0.34\n0.2,0.3,0.1\n")
            .with_file("ECG_2.txt", "0.1,0.2,0.1\n")
    }

    #[test]
    fn boots_into_main_menu() {
        let bench = Bench::new(Some(MemStorage::new()), 10);
        assert_eq!(bench.inst.menu_state(), MenuState::MainMenu);
        assert!(bench.screen_has("New measurement"));
        assert!(bench.inst.storage_available());
    }

    #[test]
    fn menu_selection_wraps() {
        let mut bench = Bench::new(Some(MemStorage::new()), 10);
        bench.press(Button::Previous);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 2 });
        bench.press(Button::Next);
        bench.press(Button::Next);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 1 });
    }

    #[test]
    fn capture_then_save_writes_one_file() {
        let storage = MemStorage::new();
        let mut bench = Bench::new(Some(storage.clone()), 20);
        bench.shared.publish(FilteredSample::new(0.5, 0.25, -0.25));
        bench.press(Button::Select);
        assert_eq!(bench.inst.menu_state(), MenuState::Measuring);
        bench.idle(200);
        assert_eq!(bench.inst.menu_state(), MenuState::SaveConfirm);
        assert!(bench.screen_has("Save measurement?"));
        bench.press(Button::Select);
        let files = storage.file_names();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("ECG_") && files[0].ends_with(".txt"));
        let text = storage.contents(&files[0]).unwrap();
        assert_eq!(text.lines().count(), 20);
        assert_eq!(text.lines().next(), Some("0.5,0.25,-0.25"));
        assert!(bench.screen_has("Saved to ECG_"));
        bench.idle(2100);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 0 });
        assert_eq!(bench.inst.catalog().len(), 1);
    }

    #[test]
    fn discard_writes_nothing() {
        let storage = MemStorage::new();
        let mut bench = Bench::new(Some(storage.clone()), 5);
        bench.press(Button::Select);
        bench.idle(100);
        bench.press(Button::Next);
        assert_eq!(bench.inst.screen(), Screen::SaveConfirm { choice: Choice::No });
        bench.press(Button::Select);
        assert_eq!(bench.inst.menu_state(), MenuState::MainMenu);
        assert!(storage.file_names().is_empty());
    }

    #[test]
    fn cancel_during_capture_writes_nothing() {
        let storage = MemStorage::new();
        let mut bench = Bench::new(Some(storage.clone()), 1500);
        bench.press(Button::Select);
        bench.idle(100);
        bench.press(Button::Select);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 0 });
        assert!(storage.file_names().is_empty());
    }

    #[test]
    fn credits_return_after_timeout() {
        let mut bench = Bench::new(Some(MemStorage::new()), 10);
        bench.press(Button::Previous);
        bench.press(Button::Select);
        assert!(matches!(bench.inst.screen(), Screen::Credits { .. }));
        assert!(bench.screen_has("Professors:"));
        bench.idle(6000);
        assert!(matches!(bench.inst.screen(), Screen::Credits { .. }));
        bench.idle(1100);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 0 });
    }

    #[test]
    fn browse_replay_and_return() {
        let mut bench = Bench::new(Some(two_files()), 10);
        bench.press(Button::Next);
        bench.press(Button::Select);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: false });
        assert!(bench.screen_has("ECG_2.txt"));
        bench.press(Button::Select);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: true });
        assert!(bench.screen_has("Lead III"));
        bench.press(Button::Select);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: false });
        bench.press(Button::Previous);
        assert!(bench.inst.catalog().is_return_selected());
        bench.press(Button::Select);
        assert_eq!(bench.inst.menu_state(), MenuState::MainMenu);
    }

    #[test]
    fn long_press_deletes_after_confirmation() {
        let storage = two_files();
        let mut bench = Bench::new(Some(storage.clone()), 10);
        bench.press(Button::Next);
        bench.press(Button::Select);
        bench.hold(Button::Select, 4100);
        assert_eq!(bench.inst.screen(), Screen::DeleteConfirm { choice: Choice::Yes });
        assert!(bench.screen_has("Delete file?"));
        bench.press(Button::Select);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: false });
        assert_eq!(storage.file_names(), vec!["ECG_2.txt"]);
        assert_eq!(bench.inst.catalog().len(), 1);
    }

    #[test]
    fn deleting_only_entry_leaves_return_row() {
        let storage = MemStorage::new().with_file("ECG_7.txt", "1,2,3\n");
        let mut bench = Bench::new(Some(storage.clone()), 10);
        bench.press(Button::Next);
        bench.press(Button::Select);
        bench.hold(Button::Select, 4100);
        bench.press(Button::Select);
        let catalog = bench.inst.catalog();
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.selected_index(), 0);
        assert_eq!(catalog.display_offset(), 0);
        assert!(bench.screen_has(screens::RETURN_ROW_LABEL));
    }

    #[test]
    fn declining_delete_keeps_file() {
        let storage = two_files();
        let mut bench = Bench::new(Some(storage.clone()), 10);
        bench.press(Button::Next);
        bench.press(Button::Select);
        bench.hold(Button::Select, 4100);
        bench.press(Button::Next);
        bench.press(Button::Select);
        assert_eq!(storage.file_names().len(), 2);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: false });
    }

    #[test]
    fn missing_storage_gates_browsing_and_saving() {
        let mut bench = Bench::new(None, 5);
        assert!(!bench.inst.storage_available());
        bench.press(Button::Next);
        bench.press(Button::Select);
        assert!(bench.screen_has("Storage unavailable"));
        assert_eq!(bench.inst.menu_state(), MenuState::MainMenu);
        bench.idle(2100);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 0 });

        bench.press(Button::Select);
        bench.idle(100);
        bench.press(Button::Select);
        assert!(bench.screen_has("Storage unavailable"));
        bench.idle(2100);
        assert_eq!(bench.inst.screen(), Screen::MainMenu { selection: 0 });
    }

    #[test]
    fn replay_of_vanished_file_shows_error() {
        let storage = two_files();
        let mut bench = Bench::new(Some(storage.clone()), 10);
        bench.press(Button::Next);
        bench.press(Button::Select);
        storage.clone().remove("ECG_1.txt").unwrap();
        bench.press(Button::Select);
        assert!(bench.screen_has("Error opening file"));
        assert_eq!(bench.inst.menu_state(), MenuState::Browsing);
        bench.idle(2100);
        assert_eq!(bench.inst.screen(), Screen::Browsing { viewing: false });
    }
}
