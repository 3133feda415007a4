// src/input.rs
use crate::config::InputConfig;
use crate::types::ButtonLevels;

/// Edge-triggered software debounce for one button.
///
/// A press is accepted on a rising edge only if more than `debounce_ms` passed
/// since the last accepted press of the same button.
#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_ms: u64,
    was_down: bool,
    last_accepted: Option<u64>,
}

impl Debouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            was_down: false,
            last_accepted: None,
        }
    }

    /// Feeds the current level; `true` when this tick carries an accepted press.
    pub fn poll(&mut self, down: bool, now_ms: u64) -> bool {
        let rising = down && !self.was_down;
        self.was_down = down;
        if !rising {
            return false;
        }
        let settled = self
            .last_accepted
            .map_or(true, |t| now_ms.saturating_sub(t) > self.debounce_ms);
        if settled {
            self.last_accepted = Some(now_ms);
        }
        settled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// Tells a tap from a sustained hold.
///
/// `Long` fires once while the button is still held; releasing afterwards
/// reports nothing. Releasing earlier reports `Short`.
#[derive(Debug, Clone)]
pub struct LongPressTracker {
    long_press_ms: u64,
    pressed_at: Option<u64>,
    fired: bool,
}

impl LongPressTracker {
    pub fn new(long_press_ms: u64) -> Self {
        Self {
            long_press_ms,
            pressed_at: None,
            fired: false,
        }
    }

    /// Starts timing; call on an accepted press.
    pub fn press(&mut self, now_ms: u64) {
        self.pressed_at = Some(now_ms);
        self.fired = false;
    }

    pub fn cancel(&mut self) {
        self.pressed_at = None;
        self.fired = false;
    }

    #[cfg(test)]
    pub fn is_tracking(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn poll(&mut self, down: bool, now_ms: u64) -> Option<PressKind> {
        let started = self.pressed_at?;
        if down {
            if !self.fired && now_ms.saturating_sub(started) >= self.long_press_ms {
                self.fired = true;
                return Some(PressKind::Long);
            }
            return None;
        }
        let fired = self.fired;
        self.cancel();
        (!fired).then_some(PressKind::Short)
    }
}

/// Accepted presses for one polling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEvents {
    pub previous: bool,
    pub next: bool,
    pub select: bool,
}

/// Debouncers for the three board buttons.
#[derive(Debug, Clone)]
pub struct ButtonPanel {
    previous: Debouncer,
    next: Debouncer,
    select: Debouncer,
}

impl ButtonPanel {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            previous: Debouncer::new(config.debounce_ms),
            next: Debouncer::new(config.debounce_ms),
            select: Debouncer::new(config.debounce_ms),
        }
    }

    pub fn poll(&mut self, levels: ButtonLevels, now_ms: u64) -> ButtonEvents {
        ButtonEvents {
            previous: self.previous.poll(levels.previous, now_ms),
            next: self.next.poll(levels.next, now_ms),
            select: self.select.poll(levels.select, now_ms),
        }
    }
}
