// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

/// Sheet names from the last successful load plus the checked subset.
///
/// Checks are stored as indices into `sheets`, so the checked set can never
/// name a sheet that the engine did not report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetSelection {
    sheets: Vec<String>,
    checked: BTreeSet<usize>,
}

impl SheetSelection {
    pub fn new(sheets: Vec<String>) -> Self {
        Self {
            sheets,
            checked: BTreeSet::new(),
        }
    }

    /// Replaces the sheet list and clears every check.
    pub fn replace(&mut self, sheets: Vec<String>) {
        self.sheets = sheets;
        self.checked.clear();
    }

    pub fn sheets(&self) -> &[String] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.checked.contains(&index)
    }

    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    /// Returns false when `index` is out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.sheets.len() {
            return false;
        }
        if !self.checked.remove(&index) {
            self.checked.insert(index);
        }
        true
    }

    pub fn check_all(&mut self) {
        self.checked = (0..self.sheets.len()).collect();
    }

    pub fn clear_checks(&mut self) {
        self.checked.clear();
    }

    /// Checked sheet names in engine order.
    pub fn checked_sheets(&self) -> Vec<String> {
        self.checked
            .iter()
            .filter_map(|index| self.sheets.get(*index).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SheetSelection;

    fn months() -> SheetSelection {
        SheetSelection::new(vec!["Jan".to_owned(), "Feb".to_owned(), "Mar".to_owned()])
    }

    #[test]
    fn checked_sheets_follow_engine_order_not_click_order() {
        let mut selection = months();
        selection.toggle(2);
        selection.toggle(0);
        assert_eq!(
            selection.checked_sheets(),
            vec!["Jan".to_owned(), "Mar".to_owned()]
        );
    }

    #[test]
    fn toggle_twice_unchecks() {
        let mut selection = months();
        assert!(selection.toggle(1));
        assert!(selection.is_checked(1));
        assert!(selection.toggle(1));
        assert!(!selection.is_checked(1));
        assert!(selection.checked_sheets().is_empty());
    }

    #[test]
    fn out_of_range_toggle_is_ignored() {
        let mut selection = months();
        assert!(!selection.toggle(3));
        assert_eq!(selection.checked_count(), 0);
    }

    #[test]
    fn replace_clears_checks_even_for_identical_names() {
        let mut selection = months();
        selection.check_all();
        assert_eq!(selection.checked_count(), 3);

        selection.replace(vec!["Jan".to_owned(), "Feb".to_owned(), "Mar".to_owned()]);
        assert_eq!(selection.checked_count(), 0);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn checked_set_stays_within_loaded_sheets() {
        let mut selection = months();
        selection.check_all();
        selection.replace(vec!["Only".to_owned()]);
        selection.toggle(0);
        selection.toggle(2);

        let checked = selection.checked_sheets();
        assert!(
            checked
                .iter()
                .all(|name| selection.sheets().contains(name))
        );
        assert_eq!(checked, vec!["Only".to_owned()]);
    }
}
