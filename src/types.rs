// src/types.rs
use crate::drivers::FrameBuffer;

/// Latest filtered value of each lead, in volts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilteredSample {
    pub lead1: f64,
    pub lead2: f64,
    pub lead3: f64,
}

impl FilteredSample {
    pub fn new(lead1: f64, lead2: f64, lead3: f64) -> Self {
        Self { lead1, lead2, lead3 }
    }

    pub fn get(&self, lead: Lead) -> f64 {
        match lead {
            Lead::I => self.lead1,
            Lead::II => self.lead2,
            Lead::III => self.lead3,
        }
    }
}

// The two measured leads plus the derived one
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Lead {
    I,
    II,
    III,
}

impl Lead {
    pub const ALL: [Lead; 3] = [Lead::I, Lead::II, Lead::III];

    pub fn index(self) -> usize {
        match self {
            Lead::I => 0,
            Lead::II => 1,
            Lead::III => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lead::I => "Lead I",
            Lead::II => "Lead II",
            Lead::III => "Lead III",
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Button {
    Previous,
    Next,
    Select,
}

/// Physical level of each button for one polling tick (`true` = held down).
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct ButtonLevels {
    pub previous: bool,
    pub next: bool,
    pub select: bool,
}

impl ButtonLevels {
    pub fn is_down(&self, button: Button) -> bool {
        match button {
            Button::Previous => self.previous,
            Button::Next => self.next,
            Button::Select => self.select,
        }
    }

    pub fn with(mut self, button: Button, down: bool) -> Self {
        match button {
            Button::Previous => self.previous = down,
            Button::Next => self.next = down,
            Button::Select => self.select = down,
        }
        self
    }
}

/// Coarse UI state reported to the window. Transient screens report the
/// state they belong to.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MenuState {
    MainMenu,
    Measuring,
    SaveConfirm,
    Browsing,
}

// Window -> engine
#[derive(Clone, Debug)]
pub enum DeviceCommand {
    Buttons(ButtonLevels),
    Shutdown,
}

// Engine -> window
#[derive(Clone, Debug)]
pub enum DeviceMessage {
    Log(String),
    Frame(FrameBuffer),
    Bpm(f64),
    State(MenuState),
    StorageStatus(bool),
}
