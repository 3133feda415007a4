// src/catalog.rs
use log::{debug, info};
use crate::config::CatalogConfig;
use crate::drivers::{DeviceError, Storage};

/// Stored recordings plus the browser's selection and scroll window.
///
/// `selected` ranges over `0..=len()`; the value `len()` is the synthetic
/// "return to main menu" row. `offset` always stays within
/// `0..=len().saturating_sub(page_size)`.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    files: Vec<String>,
    selected: usize,
    offset: usize,
    page_size: usize,
    max_files: usize,
    extension: String,
}

impl FileCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            files: Vec::new(),
            selected: 0,
            offset: 0,
            page_size: config.page_size.max(1),
            max_files: config.max_files.max(1),
            extension: config.extension.to_ascii_lowercase(),
        }
    }

    /// Rebuilds the list from the storage root in enumeration order and resets the cursor.
    pub fn enumerate(&mut self, storage: &dyn Storage) -> Result<usize, DeviceError> {
        self.files.clear();
        self.selected = 0;
        self.offset = 0;
        for entry in storage.entries()? {
            if entry.is_dir || !entry.name.to_ascii_lowercase().ends_with(&self.extension) {
                continue;
            }
            if self.files.len() >= self.max_files {
                info!("catalog full at {} files, ignoring the rest", self.max_files);
                break;
            }
            debug!("found recording {}", entry.name);
            self.files.push(entry.name);
        }
        Ok(self.files.len())
    }

    /// Re-enumerates after a delete, keeping the cursor near where it was.
    pub fn refresh_after_delete(&mut self, storage: &dyn Storage) -> Result<usize, DeviceError> {
        let previous = self.selected;
        let total = self.enumerate(storage)?;
        self.selected = previous.min(total.saturating_sub(1));
        self.keep_selection_visible();
        Ok(total)
    }

    /// Empties the list; used when storage is gone.
    pub fn clear(&mut self) {
        self.files.clear();
        self.selected = 0;
        self.offset = 0;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[cfg(test)]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn display_offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_return_selected(&self) -> bool {
        self.selected == self.files.len()
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.files.get(self.selected).map(String::as_str)
    }

    pub fn next(&mut self) {
        self.selected = if self.selected >= self.files.len() {
            0
        } else {
            self.selected + 1
        };
        self.keep_selection_visible();
    }

    pub fn previous(&mut self) {
        self.selected = if self.selected == 0 {
            self.files.len()
        } else {
            self.selected - 1
        };
        self.keep_selection_visible();
    }

    /// Real entries on the current page as `(catalog index, name)`.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let end = (self.offset + self.page_size).min(self.files.len());
        (self.offset..end).map(move |i| (i, self.files[i].as_str()))
    }

    /// Row of the synthetic entry on the current page, if it fits.
    pub fn return_row(&self) -> Option<usize> {
        let row = self.files.len().checked_sub(self.offset)?;
        (row <= self.page_size).then_some(row)
    }

    /// Scroll bar `(top, height)` in pixels for a track of `track` pixels.
    pub fn scroll_bar(&self, track: i32) -> (i32, i32) {
        let rows = (self.files.len() + 1) as i32;
        let height = (track * self.page_size as i32 / rows).min(track);
        let top = track * self.offset as i32 / rows;
        (top, height)
    }

    fn max_offset(&self) -> usize {
        self.files.len().saturating_sub(self.page_size)
    }

    fn keep_selection_visible(&mut self) {
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.page_size {
            self.offset = (self.selected + 1 - self.page_size).min(self.max_offset());
        }
        self.offset = self.offset.min(self.max_offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemStorage;

    fn config(page_size: usize, max_files: usize) -> CatalogConfig {
        CatalogConfig {
            page_size,
            max_files,
            ..CatalogConfig::default()
        }
    }

    fn storage_with(n: usize) -> MemStorage {
        (0..n).fold(MemStorage::new(), |s, i| s.with_file(&format!("ECG_{i}.txt"), "1,2,3\n"))
    }

    fn assert_invariants(cat: &FileCatalog) {
        assert!(cat.selected_index() <= cat.len());
        assert!(cat.display_offset() <= cat.len().saturating_sub(cat.page_size()));
    }

    #[test]
    fn enumeration_filters_and_keeps_order() {
        let storage = MemStorage::new()
            .with_file("ECG_9.txt", "")
            .with_dir("System Volume Information")
            .with_file("notes.md", "")
            .with_file("ECG_2.TXT", "")
            .with_file("ECG_5.txt", "");
        let mut cat = FileCatalog::new(&CatalogConfig::default());
        assert_eq!(cat.enumerate(&storage).unwrap(), 3);
        assert_eq!(cat.files(), &["ECG_9.txt", "ECG_2.TXT", "ECG_5.txt"]);
    }

    #[test]
    fn enumeration_is_capped() {
        let mut cat = FileCatalog::new(&config(8, 5));
        assert_eq!(cat.enumerate(&storage_with(12)).unwrap(), 5);
        assert_eq!(cat.files().last().map(String::as_str), Some("ECG_4.txt"));
    }

    #[test]
    fn cursor_wraps_through_return_row() {
        let mut cat = FileCatalog::new(&config(8, 50));
        cat.enumerate(&storage_with(3)).unwrap();
        cat.previous();
        assert_eq!(cat.selected_index(), 3);
        assert!(cat.is_return_selected());
        assert_eq!(cat.selected_file(), None);
        cat.next();
        assert_eq!(cat.selected_index(), 0);
        cat.next();
        cat.next();
        cat.next();
        assert!(cat.is_return_selected());
    }

    #[test]
    fn window_follows_selection() {
        let mut cat = FileCatalog::new(&config(8, 50));
        cat.enumerate(&storage_with(20)).unwrap();
        for _ in 0..9 {
            cat.next();
        }
        // selection 9 is the last visible row
        assert_eq!(cat.selected_index(), 9);
        assert_eq!(cat.display_offset(), 2);
        cat.previous();
        cat.previous();
        cat.previous();
        assert_eq!(cat.display_offset(), 2);
        for _ in 0..5 {
            cat.previous();
        }
        assert_eq!(cat.selected_index(), 1);
        assert_eq!(cat.display_offset(), 1);
        let rows: Vec<_> = cat.visible().map(|(i, _)| i).collect();
        assert_eq!(rows, (1..9).collect::<Vec<_>>());
    }

    #[test]
    fn return_row_is_reachable_on_last_page() {
        let mut cat = FileCatalog::new(&config(8, 50));
        cat.enumerate(&storage_with(20)).unwrap();
        cat.previous();
        assert!(cat.is_return_selected());
        assert_eq!(cat.display_offset(), 12);
        assert_eq!(cat.return_row(), Some(8));
        cat.next();
        assert_eq!(cat.display_offset(), 0);
        assert_eq!(cat.return_row(), None);
    }

    #[test]
    fn invariants_hold_under_any_walk() {
        for total in [0, 1, 7, 8, 9, 30] {
            let mut cat = FileCatalog::new(&config(8, 50));
            cat.enumerate(&storage_with(total)).unwrap();
            let mut state = 17u32;
            for _ in 0..200 {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                if state >> 16 & 1 == 0 {
                    cat.next();
                } else {
                    cat.previous();
                }
                assert_invariants(&cat);
                let page = cat.visible().count() + usize::from(cat.return_row().is_some());
                assert!(cat.visible().count() <= 8);
                assert!(page >= 1);
            }
        }
    }

    #[test]
    fn deleting_only_entry_resets_cursor() {
        let mut storage = storage_with(1);
        let mut cat = FileCatalog::new(&CatalogConfig::default());
        cat.enumerate(&storage).unwrap();
        assert_eq!(cat.selected_file(), Some("ECG_0.txt"));
        storage.remove("ECG_0.txt").unwrap();
        assert_eq!(cat.refresh_after_delete(&storage).unwrap(), 0);
        assert_eq!(cat.selected_index(), 0);
        assert_eq!(cat.display_offset(), 0);
        assert!(cat.is_return_selected());
    }

    #[test]
    fn deleting_last_entry_selects_new_last() {
        let mut storage = storage_with(12);
        let mut cat = FileCatalog::new(&config(8, 50));
        cat.enumerate(&storage).unwrap();
        cat.previous();
        cat.previous();
        assert_eq!(cat.selected_file(), Some("ECG_11.txt"));
        storage.remove("ECG_11.txt").unwrap();
        cat.refresh_after_delete(&storage).unwrap();
        assert_eq!(cat.selected_file(), Some("ECG_10.txt"));
        assert_invariants(&cat);
    }

    #[test]
    fn scroll_bar_is_capped_to_track() {
        let mut cat = FileCatalog::new(&config(8, 50));
        cat.enumerate(&storage_with(3)).unwrap();
        assert_eq!(cat.scroll_bar(160), (0, 160));
        cat.enumerate(&storage_with(15)).unwrap();
        assert_eq!(cat.scroll_bar(160), (0, 80));
        cat.previous();
        assert_eq!(cat.scroll_bar(160), (70, 80));
    }
}
