//! Tracks which expenses are marked for a bulk action.

use std::collections::HashSet;

use crate::record::RecordId;

/// The state of the "select all" checkbox for the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleSelection {
    /// No visible record is selected.
    None,
    /// Some, but not all, visible records are selected.
    Partial,
    /// Every visible record is selected.
    All,
}

/// The set of record IDs marked for a bulk action.
///
/// "Select all" only ever covers the records on the visible page, never the
/// whole filtered collection, to match the paginated bulk action controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: HashSet<RecordId>,
    visible: Vec<RecordId>,
}

impl SelectionTracker {
    /// Add `id` to the selection if `included`, otherwise remove it.
    pub fn toggle(&mut self, id: &RecordId, included: bool) {
        if included {
            self.selected.insert(id.clone());
        } else {
            self.selected.remove(id);
        }
    }

    /// Select every id in `ids`, which should be the ids on the visible page.
    pub fn select_all_visible(&mut self, ids: &[RecordId]) {
        self.selected.extend(ids.iter().cloned());
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the ids on the visible page, keeping the selection as is.
    pub fn set_visible(&mut self, ids: Vec<RecordId>) {
        self.visible = ids;
    }

    /// The ids on the visible page.
    pub fn visible(&self) -> &[RecordId] {
        &self.visible
    }

    /// Whether `id` is selected.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    /// The number of selected ids, including any not on the visible page.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The selected ids in a stable order.
    pub fn selected_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// True iff there is at least one visible id and all of them are selected.
    pub fn is_all_visible_selected(&self) -> bool {
        !self.visible.is_empty() && self.visible.iter().all(|id| self.selected.contains(id))
    }

    /// True iff some, but not all, visible ids are selected.
    pub fn is_partially_visible_selected(&self) -> bool {
        let selected_count = self
            .visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .count();

        selected_count > 0 && selected_count < self.visible.len()
    }

    /// The checkbox state for the visible page.
    pub fn visible_selection(&self) -> VisibleSelection {
        if self.is_all_visible_selected() {
            VisibleSelection::All
        } else if self.is_partially_visible_selected() {
            VisibleSelection::Partial
        } else {
            VisibleSelection::None
        }
    }
}
