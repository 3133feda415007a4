// src/screens.rs
// Static screens. Every function repaints the whole display.
use crate::catalog::FileCatalog;
use crate::drivers::{Color, Display, TextStyle};

pub const MENU_OPTIONS: [&str; 3] = ["New measurement", "Old measurements", "Credits"];
pub const RETURN_ROW_LABEL: &str = "Back to main menu";

const TITLE: TextStyle = TextStyle {
    color: Color::WHITE,
    size: 2,
};
const LIST_TOP: i32 = 60;

/// Binary answer of a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
}

impl Choice {
    pub fn toggled(self) -> Self {
        match self {
            Choice::Yes => Choice::No,
            Choice::No => Choice::Yes,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Choice::Yes => "Yes",
            Choice::No => "No",
        }
    }
}

fn highlight(selected: bool, size: u8) -> TextStyle {
    let color = if selected { Color::YELLOW } else { Color::WHITE };
    TextStyle::new(color, size)
}

fn clear_with_title<D: Display + ?Sized>(display: &mut D, title: &str) {
    display.fill_screen(Color::BLACK);
    display.draw_text(10, 10, title, TITLE);
}

pub fn main_menu<D: Display + ?Sized>(display: &mut D, selection: usize) {
    clear_with_title(display, "Instrumentation Project");
    for (i, option) in MENU_OPTIONS.iter().enumerate() {
        display.draw_text(10, LIST_TOP + i as i32 * 30, option, highlight(i == selection, 2));
    }
}

fn prompt<D: Display + ?Sized>(display: &mut D, question: &str, choice: Choice) {
    clear_with_title(display, question);
    for (i, option) in [Choice::Yes, Choice::No].into_iter().enumerate() {
        display.draw_text(10, LIST_TOP + i as i32 * 30, option.label(), highlight(option == choice, 2));
    }
}

pub fn save_prompt<D: Display + ?Sized>(display: &mut D, choice: Choice) {
    prompt(display, "Save measurement?", choice);
}

pub fn delete_prompt<D: Display + ?Sized>(display: &mut D, choice: Choice) {
    prompt(display, "Delete file?", choice);
}

/// Title line plus optional detail lines underneath, e.g. save progress or errors.
pub fn notice<D: Display + ?Sized>(display: &mut D, title: &str, details: &[&str]) {
    clear_with_title(display, title);
    for (i, line) in details.iter().enumerate() {
        display.draw_text(10, 50 + i as i32 * 20, line, TextStyle::new(Color::WHITE, 1));
    }
}

pub fn credits<D: Display + ?Sized>(display: &mut D) {
    display.fill_screen(Color::BLACK);
    let heading = TextStyle::new(Color::YELLOW, 1);
    let name = TextStyle::new(Color::WHITE, 1);
    let lines: [(&str, TextStyle); 11] = [
        ("Team members:", heading),
        ("Andrea Razuri", name),
        ("Nadira Oviedo", name),
        ("Alvaro Cigaran", name),
        ("Bruno Tello", name),
        ("Fabian Nana", name),
        ("Adrian Gutierrez (Investor)", name),
        ("Professors:", heading),
        ("Yesenia Cieza, Mag.", name),
        ("Domingo Flores, Mag.", name),
        ("Julissa Venancio, Ing.", name),
    ];
    for (i, (text, style)) in lines.iter().enumerate() {
        display.draw_text(10, 10 + i as i32 * 20, text, *style);
    }
}

/// Browser list: the visible page, the return row when it fits, and the scroll bar.
pub fn browser<D: Display + ?Sized>(display: &mut D, catalog: &FileCatalog) {
    clear_with_title(display, "Old measurements");
    let selected = catalog.selected_index();
    let offset = catalog.display_offset();
    for (i, name) in catalog.visible() {
        let y = LIST_TOP + (i - offset) as i32 * 20;
        display.draw_text(10, y, name, highlight(i == selected, 1));
    }
    if let Some(row) = catalog.return_row() {
        let y = LIST_TOP + row as i32 * 20;
        display.draw_text(10, y, RETURN_ROW_LABEL, highlight(catalog.is_return_selected(), 1));
    }
    let track = display.height() - 80;
    let (top, height) = catalog.scroll_bar(track);
    display.fill_rect(display.width() - 10, LIST_TOP + top, 5, height, Color::WHITE);
}
