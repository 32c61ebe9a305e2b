//! FILENAME: column-engine/src/transition.rs
//! Column Customization Transitions - open / cancel / confirm / reset.
//!
//! The customization panel edits a `draft`. `origin` is what the draft looked
//! like when the panel opened, `current` is what the grid renders. Every
//! transition rebuilds its snapshot against the current column set and hands
//! back independent copies for the caller to store.

use crate::drag::{apply_drag_move, DragPosition};
use crate::snapshot::{create_column_custom_snapshot, ColumnCustomSnapshot};
use engine::{log_debug, ColumnDefinition, FixedSide};

/// Outcome of a transition. `None` leaves the caller's copy unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCustomTransition {
    pub draft: ColumnCustomSnapshot,
    pub origin: Option<ColumnCustomSnapshot>,
    pub current: Option<ColumnCustomSnapshot>,
    pub panel_open: bool,
}

/// Opens the panel seeded from `current` (or column defaults).
pub fn open(columns: &[ColumnDefinition], current: Option<&ColumnCustomSnapshot>) -> ColumnCustomTransition {
    let snapshot = create_column_custom_snapshot(columns, current, true);
    log_debug!("COLUMNS", "open: {} columns", snapshot.order.len());
    ColumnCustomTransition {
        draft: snapshot.clone(),
        origin: Some(snapshot),
        current: None,
        panel_open: true,
    }
}

/// Discards the draft. Restores from `origin` when it holds anything,
/// otherwise from `current`.
pub fn cancel(
    columns: &[ColumnDefinition],
    current: Option<&ColumnCustomSnapshot>,
    origin: Option<&ColumnCustomSnapshot>,
) -> ColumnCustomTransition {
    let source = match origin {
        Some(origin) if origin.has_any() => Some(origin),
        _ => current,
    };
    log_debug!("COLUMNS", "cancel");
    ColumnCustomTransition {
        draft: create_column_custom_snapshot(columns, source, true),
        origin: None,
        current: None,
        panel_open: false,
    }
}

/// Commits the draft: it becomes both `current` and `origin`.
pub fn confirm(columns: &[ColumnDefinition], draft: &ColumnCustomSnapshot) -> ColumnCustomTransition {
    let snapshot = create_column_custom_snapshot(columns, Some(draft), true);
    log_debug!("COLUMNS", "confirm: order {:?}", snapshot.order);
    ColumnCustomTransition {
        draft: snapshot.clone(),
        origin: Some(snapshot.clone()),
        current: Some(snapshot),
        panel_open: false,
    }
}

/// Drops every customization in favor of the columns' own declarations.
pub fn reset(columns: &[ColumnDefinition]) -> ColumnCustomTransition {
    let snapshot = create_column_custom_snapshot(columns, None, true);
    log_debug!("COLUMNS", "reset");
    ColumnCustomTransition {
        draft: snapshot.clone(),
        origin: Some(snapshot.clone()),
        current: Some(snapshot),
        panel_open: false,
    }
}

pub fn has_unsaved_changes(draft: &ColumnCustomSnapshot, origin: &ColumnCustomSnapshot) -> bool {
    draft != origin
}

pub fn has_any_snapshot(snapshot: Option<&ColumnCustomSnapshot>) -> bool {
    snapshot.is_some_and(ColumnCustomSnapshot::has_any)
}

// ============================================================================
// SESSION
// ============================================================================

/// Owns the origin/draft/current triple and applies transitions and edits.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCustomSession {
    pub origin: ColumnCustomSnapshot,
    pub draft: ColumnCustomSnapshot,
    pub current: ColumnCustomSnapshot,
    pub panel_open: bool,
}

impl ColumnCustomSession {
    /// Starts from a persisted snapshot, or from column declarations.
    pub fn new(columns: &[ColumnDefinition], persisted: Option<&ColumnCustomSnapshot>) -> Self {
        let current = create_column_custom_snapshot(columns, persisted, true);
        ColumnCustomSession {
            origin: current.clone(),
            draft: current.clone(),
            current,
            panel_open: false,
        }
    }

    pub fn apply(&mut self, transition: ColumnCustomTransition) {
        self.draft = transition.draft;
        if let Some(origin) = transition.origin {
            self.origin = origin;
        }
        if let Some(current) = transition.current {
            self.current = current;
        }
        self.panel_open = transition.panel_open;
    }

    pub fn open(&mut self, columns: &[ColumnDefinition]) {
        let transition = open(columns, Some(&self.current));
        self.apply(transition);
    }

    pub fn cancel(&mut self, columns: &[ColumnDefinition]) {
        let transition = cancel(columns, Some(&self.current), Some(&self.origin));
        self.apply(transition);
    }

    /// Commits the draft and returns the new `current` for persisting.
    pub fn confirm(&mut self, columns: &[ColumnDefinition]) -> &ColumnCustomSnapshot {
        let transition = confirm(columns, &self.draft);
        self.apply(transition);
        &self.current
    }

    pub fn reset(&mut self, columns: &[ColumnDefinition]) -> &ColumnCustomSnapshot {
        let transition = reset(columns);
        self.apply(transition);
        &self.current
    }

    pub fn has_unsaved_changes(&self) -> bool {
        has_unsaved_changes(&self.draft, &self.origin)
    }

    // ------------------------------------------------------------------------
    // Draft edits. Unknown keys are ignored and report false.
    // ------------------------------------------------------------------------

    pub fn set_visible(&mut self, key: &str, visible: bool) -> bool {
        set_flag(&mut self.draft.visible, key, visible)
    }

    pub fn toggle_visible(&mut self, key: &str) -> bool {
        let visible = self.draft.is_visible(key);
        self.set_visible(key, !visible)
    }

    pub fn set_sortable(&mut self, key: &str, sortable: bool) -> bool {
        set_flag(&mut self.draft.sortable, key, sortable)
    }

    pub fn set_filterable(&mut self, key: &str, filterable: bool) -> bool {
        set_flag(&mut self.draft.filterable, key, filterable)
    }

    pub fn set_fixed(&mut self, key: &str, side: FixedSide) -> bool {
        match self.draft.fixed.get_mut(key) {
            Some(slot) => {
                *slot = side;
                true
            }
            None => false,
        }
    }

    /// Moves `drag_key` above or below `over_key` in the draft order.
    pub fn move_column(
        &mut self,
        columns: &[ColumnDefinition],
        drag_key: &str,
        over_key: &str,
        position: DragPosition,
    ) -> bool {
        let next = apply_drag_move(columns, &self.draft.order, drag_key, over_key, position);
        let moved = next != self.draft.order;
        self.draft.order = next;
        moved
    }
}

fn set_flag(map: &mut std::collections::BTreeMap<String, bool>, key: &str, value: bool) -> bool {
    match map.get_mut(key) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}
