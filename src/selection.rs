//! Selection of entity ids, scoped to the currently visible page.
use crate::model::EntityId;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("entity {0} is not on the visible page")]
    NotVisible(EntityId),
}

/// Selected ids plus the visible page they must belong to.
///
/// The selection is always a subset of the visible ids: every operation that
/// changes the page prunes it.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    visible: Vec<EntityId>,
    selected: HashSet<EntityId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page change: drop selected ids that are no longer visible. Newly
    /// visible ids are never selected implicitly.
    pub fn set_visible(&mut self, visible: impl IntoIterator<Item = EntityId>) {
        self.visible = dedup(visible);
        let keep: HashSet<&EntityId> = self.visible.iter().collect();
        self.selected.retain(|id| keep.contains(id));
    }

    pub fn toggle(&mut self, id: &EntityId) -> Result<bool, SelectionError> {
        if !self.visible.contains(id) {
            return Err(SelectionError::NotVisible(id.clone()));
        }
        if self.selected.remove(id) {
            Ok(false)
        } else {
            self.selected.insert(id.clone());
            Ok(true)
        }
    }

    /// Replace the selection with exactly `visible`, which also becomes the
    /// visible page.
    pub fn select_all_visible(&mut self, visible: impl IntoIterator<Item = EntityId>) {
        self.visible = dedup(visible);
        self.selected = self.visible.iter().cloned().collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// True iff `visible` is non-empty and every id in it is selected.
    pub fn is_fully_selected<'a>(&self, visible: impl IntoIterator<Item = &'a EntityId>) -> bool {
        let mut any = false;
        for id in visible {
            any = true;
            if !self.selected.contains(id) {
                return false;
            }
        }
        any
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn visible(&self) -> &[EntityId] {
        &self.visible
    }

    /// Selected ids in page order, the order bulk requests are issued in.
    pub fn selected_in_view_order(&self) -> Vec<EntityId> {
        self.visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub(crate) fn deselect<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        for id in ids {
            self.selected.remove(id);
        }
    }
}

fn dedup(ids: impl IntoIterator<Item = EntityId>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
